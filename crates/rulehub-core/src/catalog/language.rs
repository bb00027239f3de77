/// One keyword table entry: normalized tags matching any of `tags` map to
/// `canonical`, and content containing any of `content_hints` (substring,
/// lowercased) does too.
#[derive(Debug, Clone)]
pub struct LanguageEntry {
    pub canonical: &'static str,
    pub tags: &'static [&'static str],
    pub content_hints: &'static [&'static str],
}

/// Maps technology keywords found in tags and rule content to canonical
/// language/framework names.
#[derive(Debug, Clone)]
pub struct LanguageMap {
    entries: Vec<LanguageEntry>,
}

static DEFAULT_ENTRIES: &[LanguageEntry] = &[
    LanguageEntry {
        canonical: "TypeScript",
        tags: &["typescript", "ts"],
        content_hints: &["typescript", ".ts"],
    },
    LanguageEntry {
        canonical: "JavaScript",
        tags: &["javascript", "js"],
        content_hints: &["javascript", ".js"],
    },
    LanguageEntry {
        canonical: "Python",
        tags: &["python", "py"],
        content_hints: &["python", ".py"],
    },
    LanguageEntry {
        canonical: "React",
        tags: &["react", "reactjs"],
        content_hints: &["react"],
    },
    LanguageEntry {
        canonical: "Vue",
        tags: &["vue", "vuejs"],
        content_hints: &["vue"],
    },
    LanguageEntry {
        canonical: "Angular",
        tags: &["angular"],
        content_hints: &["angular"],
    },
    LanguageEntry {
        canonical: "Node.js",
        tags: &["node", "nodejs"],
        content_hints: &[],
    },
    LanguageEntry {
        canonical: "Java",
        tags: &["java"],
        content_hints: &[],
    },
    LanguageEntry {
        canonical: "Go",
        tags: &["go", "golang"],
        content_hints: &[],
    },
    LanguageEntry {
        canonical: "Rust",
        tags: &["rust"],
        content_hints: &[],
    },
    LanguageEntry {
        canonical: "PHP",
        tags: &["php"],
        content_hints: &[],
    },
    LanguageEntry {
        canonical: "C++",
        tags: &["c++", "cpp"],
        content_hints: &[],
    },
    LanguageEntry {
        canonical: "C#",
        tags: &["c#", "csharp"],
        content_hints: &[],
    },
    LanguageEntry {
        canonical: "Swift",
        tags: &["swift"],
        content_hints: &[],
    },
    LanguageEntry {
        canonical: "Kotlin",
        tags: &["kotlin"],
        content_hints: &[],
    },
];

impl Default for LanguageMap {
    fn default() -> Self {
        Self {
            entries: DEFAULT_ENTRIES.to_vec(),
        }
    }
}

impl LanguageMap {
    pub fn new(entries: Vec<LanguageEntry>) -> Self {
        Self { entries }
    }

    /// Union of every canonical name matched by the tags or content, in
    /// table order. Falls back to `["General"]` when nothing matches.
    pub fn infer(&self, tags: &[String], content: &str) -> Vec<String> {
        let content_lower = content.to_lowercase();
        let mut matched: Vec<String> = Vec::new();

        for entry in &self.entries {
            let tag_hit = tags.iter().any(|tag| {
                let tag = tag.trim().to_lowercase();
                entry.tags.iter().any(|keyword| tag == *keyword)
            });
            let content_hit = entry
                .content_hints
                .iter()
                .any(|hint| content_lower.contains(hint));

            if (tag_hit || content_hit) && !matched.iter().any(|m| m == entry.canonical) {
                matched.push(entry.canonical.to_string());
            }
        }

        if matched.is_empty() {
            vec!["General".to_string()]
        } else {
            matched
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn infers_from_tags() {
        let map = LanguageMap::default();
        let inferred = map.infer(&tags(&["typescript", "react"]), "no hints here");
        assert_eq!(inferred, vec!["TypeScript", "React"]);
    }

    #[test]
    fn infers_from_content_hints() {
        let map = LanguageMap::default();
        let inferred = map.infer(&[], "Always use strict mode in your .ts files");
        assert_eq!(inferred, vec!["TypeScript"]);
    }

    #[test]
    fn tag_matching_requires_the_whole_tag() {
        let map = LanguageMap::default();
        // "javascript" must not also produce Java, and "django" must not
        // produce Go.
        let inferred = map.infer(&tags(&["javascript", "django"]), "plain text");
        assert_eq!(inferred, vec!["JavaScript"]);
    }

    #[test]
    fn unmatched_input_falls_back_to_general() {
        let map = LanguageMap::default();
        let inferred = map.infer(&tags(&["productivity"]), "write better commit messages");
        assert_eq!(inferred, vec!["General"]);
    }

    #[test]
    fn duplicates_collapse() {
        let map = LanguageMap::default();
        let inferred = map.infer(&tags(&["ts", "typescript"]), "typescript everywhere");
        assert_eq!(inferred, vec!["TypeScript"]);
    }
}
