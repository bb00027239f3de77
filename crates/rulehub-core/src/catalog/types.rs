use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stored IDE configuration snippet with its catalog metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub id: String,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: String,
    pub content: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub source_repo: String,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub downloads: i64,
    #[serde(default)]
    pub favorites: i64,
    #[serde(default)]
    pub file_size: i64,
    #[serde(default)]
    pub language_support: Vec<String>,
}

/// Singleton record of catalog-wide aggregate counters. Display-only: the
/// rule table itself stays the source of truth for counts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogMeta {
    pub version: String,
    pub total_rules: i64,
    pub last_updated: DateTime<Utc>,
    #[serde(default)]
    pub sources: Vec<String>,
}

/// One page of query results. `total_matched` counts the post-filter,
/// pre-pagination set so clients can render "X of Y".
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RulePage {
    pub rules: Vec<Rule>,
    pub total_matched: i64,
    pub returned: i64,
    pub offset: i64,
    pub limit: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryCount {
    pub category: String,
    pub count: i64,
}

impl CategoryCount {
    /// Rank raw counts: highest first, ties alphabetical, top ten kept.
    pub fn rank(counts: std::collections::HashMap<String, i64>) -> Vec<CategoryCount> {
        let mut ranked: Vec<CategoryCount> = counts
            .into_iter()
            .map(|(category, count)| CategoryCount { category, count })
            .collect();
        ranked.sort_by(|a, b| {
            b.count
                .cmp(&a.count)
                .then_with(|| a.category.cmp(&b.category))
        });
        ranked.truncate(10);
        ranked
    }
}

/// Aggregates computed by scanning the full table. Fine at catalog scale.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsOverview {
    pub total_rules: i64,
    pub total_authors: i64,
    pub average_rating: f64,
    pub top_categories: Vec<CategoryCount>,
}
