use std::collections::HashSet;

/// Derive the base slug for a rule name. Falls back to "rule" for names
/// that slugify to nothing (all punctuation).
pub fn base_slug(name: &str) -> String {
    let slug = slug::slugify(name);
    if slug.is_empty() {
        "rule".to_string()
    } else {
        slug
    }
}

/// The candidate sequence for a base slug: `base`, `base-2`, `base-3`, ...
pub fn candidates(base: &str) -> impl Iterator<Item = String> + '_ {
    let first = std::iter::once(base.to_string());
    let numbered = (2u64..).map(move |n| format!("{base}-{n}"));
    first.chain(numbered)
}

/// Pick the first candidate not present in `taken`, and record it there.
/// Used by bulk import, where the full slug set is known up front.
pub fn make_unique(slug: &str, taken: &mut HashSet<String>) -> String {
    for candidate in candidates(slug) {
        if !taken.contains(&candidate) {
            taken.insert(candidate.clone());
            return candidate;
        }
    }
    unreachable!("candidate sequence is infinite")
}
