use strsim::jaro_winkler;

use super::types::Rule;

/// Default fuzziness tolerance. Scores run 0.0 (exact) to 1.0 (no match);
/// items scoring above the threshold are dropped.
pub const DEFAULT_THRESHOLD: f64 = 0.4;

const FIELD_WEIGHTS: &[(Field, f64)] = &[
    (Field::Name, 0.30),
    (Field::Description, 0.20),
    (Field::Tags, 0.20),
    (Field::Categories, 0.15),
    (Field::Author, 0.10),
    (Field::Content, 0.05),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Name,
    Description,
    Tags,
    Categories,
    Author,
    Content,
}

struct IndexEntry {
    id: String,
    // One lowercased text list per weighted field, in FIELD_WEIGHTS order.
    fields: Vec<Vec<String>>,
}

/// A ranked match: rule id plus its distance score (lower is better).
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub id: String,
    pub score: f64,
}

/// Weighted multi-field fuzzy matcher over a materialized rule set. Built
/// once per snapshot; treat the backing array as immutable per instance and
/// rebuild when it changes.
pub struct FuzzyIndex {
    entries: Vec<IndexEntry>,
    threshold: f64,
}

impl FuzzyIndex {
    pub fn build(rules: &[Rule], threshold: f64) -> Self {
        let entries = rules
            .iter()
            .map(|rule| IndexEntry {
                id: rule.id.clone(),
                fields: FIELD_WEIGHTS
                    .iter()
                    .map(|(field, _)| field_texts(rule, *field))
                    .collect(),
            })
            .collect();
        Self { entries, threshold }
    }

    /// Rank the whole index against `query`: ascending score, ties broken
    /// by id. Entries scoring above the threshold are omitted.
    pub fn search(&self, query: &str) -> Vec<SearchHit> {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return Vec::new();
        }

        let mut hits: Vec<SearchHit> = self
            .entries
            .iter()
            .filter_map(|entry| {
                let score = entry_score(entry, &query)?;
                (score <= self.threshold).then(|| SearchHit {
                    id: entry.id.clone(),
                    score,
                })
            })
            .collect();

        hits.sort_by(|a, b| {
            a.score
                .partial_cmp(&b.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        hits
    }
}

fn field_texts(rule: &Rule, field: Field) -> Vec<String> {
    match field {
        Field::Name => vec![rule.name.to_lowercase()],
        Field::Description => vec![rule.description.to_lowercase()],
        Field::Tags => rule.tags.iter().map(|t| t.to_lowercase()).collect(),
        Field::Categories => rule.categories.iter().map(|c| c.to_lowercase()).collect(),
        Field::Author => vec![rule.author.to_lowercase()],
        Field::Content => vec![rule.content.to_lowercase()],
    }
}

/// Combined score over the fields that matched at all; `None` when no field
/// produced a match.
fn entry_score(entry: &IndexEntry, query: &str) -> Option<f64> {
    let mut weighted = 0.0;
    let mut weight_sum = 0.0;

    for ((_, weight), texts) in FIELD_WEIGHTS.iter().zip(&entry.fields) {
        let distance = texts
            .iter()
            .map(|text| text_distance(text, query))
            .fold(f64::INFINITY, f64::min);
        if distance < 1.0 {
            weighted += weight * distance;
            weight_sum += weight;
        }
    }

    (weight_sum > 0.0).then(|| weighted / weight_sum)
}

/// Distance of one text value from the query: 0.0 for an exact value,
/// near-zero for a substring hit, otherwise the best Jaro-Winkler distance
/// over whitespace tokens. 1.0 means no resemblance worth keeping.
fn text_distance(text: &str, query: &str) -> f64 {
    if text.is_empty() {
        return 1.0;
    }
    if text == query {
        return 0.0;
    }
    if text.contains(query) {
        return 0.1;
    }

    let best = text
        .split_whitespace()
        .map(|token| 1.0 - jaro_winkler(token, query))
        .fold(f64::INFINITY, f64::min);
    if !best.is_finite() {
        return 1.0;
    }
    // Anything below 0.7 similarity is noise at catalog scale.
    if best > 0.3 { 1.0 } else { best }
}
