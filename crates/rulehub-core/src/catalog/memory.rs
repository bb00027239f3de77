use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::constants::CATALOG_VERSION;

use super::query::{RuleQuery, SortField, SortOrder};
use super::repository::{CatalogError, CatalogRepository};
use super::search::FuzzyIndex;
use super::types::{CatalogMeta, CategoryCount, Rule, RulePage, StatsOverview};

/// On-disk shape of the static catalog: the meta record plus the full rule
/// array, as one JSON document.
#[derive(Debug, Serialize, Deserialize)]
struct Snapshot {
    #[serde(default)]
    meta: Option<CatalogMeta>,
    #[serde(default)]
    rules: Vec<Rule>,
}

struct MemoryState {
    meta: Option<CatalogMeta>,
    rules: Vec<Rule>,
    index: FuzzyIndex,
}

/// Catalog backend over a fully materialized JSON snapshot. Serves the same
/// contract as the SQL backend; free-text search goes through the fuzzy
/// index instead of SQL LIKE. Mutations rewrite the snapshot file.
pub struct MemoryCatalog {
    path: PathBuf,
    threshold: f64,
    state: RwLock<MemoryState>,
}

impl MemoryCatalog {
    pub async fn load(path: &Path, threshold: f64) -> Result<Self, CatalogError> {
        let bytes = tokio::fs::read(path).await?;
        let snapshot: Snapshot = serde_json::from_slice(&bytes)?;
        let index = FuzzyIndex::build(&snapshot.rules, threshold);
        Ok(Self {
            path: path.to_path_buf(),
            threshold,
            state: RwLock::new(MemoryState {
                meta: snapshot.meta,
                rules: snapshot.rules,
                index,
            }),
        })
    }

    fn serialize_state(&self) -> Result<Vec<u8>, CatalogError> {
        let state = self.state.read().expect("state lock poisoned");
        let snapshot = Snapshot {
            meta: state.meta.clone(),
            rules: state.rules.clone(),
        };
        Ok(serde_json::to_vec_pretty(&snapshot)?)
    }

    async fn persist(&self) -> Result<(), CatalogError> {
        let bytes = self.serialize_state()?;
        tokio::fs::write(&self.path, bytes).await?;
        Ok(())
    }
}

fn compare(a: &Rule, b: &Rule, sort: SortField, order: SortOrder) -> Ordering {
    let primary = match sort {
        SortField::Name => a.name.cmp(&b.name),
        SortField::Rating => a.rating.partial_cmp(&b.rating).unwrap_or(Ordering::Equal),
        SortField::Downloads => a.downloads.cmp(&b.downloads),
        SortField::CreatedAt => a.created_at.cmp(&b.created_at),
    };
    let primary = match order {
        SortOrder::Asc => primary,
        SortOrder::Desc => primary.reverse(),
    };
    primary.then_with(|| a.id.cmp(&b.id))
}

#[async_trait]
impl CatalogRepository for MemoryCatalog {
    async fn list(&self, query: &RuleQuery) -> Result<RulePage, CatalogError> {
        let state = self.state.read().expect("state lock poisoned");

        let search_hits: Option<HashSet<String>> = match query.search.as_deref().map(str::trim) {
            Some(search) if !search.is_empty() => Some(
                state
                    .index
                    .search(search)
                    .into_iter()
                    .map(|hit| hit.id)
                    .collect(),
            ),
            _ => None,
        };

        let mut matched: Vec<Rule> = state
            .rules
            .iter()
            .filter(|rule| {
                if let Some(hits) = &search_hits {
                    if !hits.contains(&rule.id) {
                        return false;
                    }
                }
                if let Some(category) = &query.category {
                    if !rule.categories.iter().any(|c| c == category) {
                        return false;
                    }
                }
                if let Some(author) = &query.author {
                    if !rule
                        .author
                        .to_lowercase()
                        .contains(&author.to_lowercase())
                    {
                        return false;
                    }
                }
                if let Some(min_rating) = query.min_rating {
                    if rule.rating < min_rating {
                        return false;
                    }
                }
                true
            })
            .cloned()
            .collect();

        matched.sort_by(|a, b| compare(a, b, query.sort, query.order));

        let total_matched = matched.len() as i64;
        let start = (query.offset.max(0) as usize).min(matched.len());
        let end = (start + query.limit.max(0) as usize).min(matched.len());
        let rules = matched[start..end].to_vec();

        Ok(RulePage {
            returned: rules.len() as i64,
            rules,
            total_matched,
            offset: query.offset,
            limit: query.limit,
        })
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Rule>, CatalogError> {
        let state = self.state.read().expect("state lock poisoned");
        Ok(state.rules.iter().find(|rule| rule.id == id).cloned())
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Rule>, CatalogError> {
        let state = self.state.read().expect("state lock poisoned");
        Ok(state.rules.iter().find(|rule| rule.slug == slug).cloned())
    }

    async fn slug_exists(&self, slug: &str) -> Result<bool, CatalogError> {
        let state = self.state.read().expect("state lock poisoned");
        Ok(state.rules.iter().any(|rule| rule.slug == slug))
    }

    async fn insert(&self, rule: &Rule) -> Result<(), CatalogError> {
        {
            let mut state = self.state.write().expect("state lock poisoned");
            if state.rules.iter().any(|existing| existing.slug == rule.slug) {
                return Err(CatalogError::SlugTaken(rule.slug.clone()));
            }
            state.rules.push(rule.clone());
            state.index = FuzzyIndex::build(&state.rules, self.threshold);
        }
        self.persist().await
    }

    async fn increment_downloads(&self, id: &str) -> Result<(), CatalogError> {
        {
            let mut state = self.state.write().expect("state lock poisoned");
            let rule = state
                .rules
                .iter_mut()
                .find(|rule| rule.id == id)
                .ok_or_else(|| CatalogError::NotFound(id.to_string()))?;
            rule.downloads += 1;
        }
        self.persist().await
    }

    async fn meta(&self) -> Result<Option<CatalogMeta>, CatalogError> {
        let state = self.state.read().expect("state lock poisoned");
        Ok(state.meta.clone())
    }

    async fn bump_meta(&self, delta: i64, new_source: Option<&str>) -> Result<(), CatalogError> {
        {
            let mut state = self.state.write().expect("state lock poisoned");
            let meta = state.meta.get_or_insert_with(|| CatalogMeta {
                version: CATALOG_VERSION.to_string(),
                total_rules: 0,
                last_updated: Utc::now(),
                sources: Vec::new(),
            });
            meta.total_rules += delta;
            meta.last_updated = Utc::now();
            if let Some(source) = new_source {
                if !meta.sources.iter().any(|s| s == source) {
                    meta.sources.push(source.to_string());
                }
            }
        }
        self.persist().await
    }

    async fn put_meta(&self, meta: &CatalogMeta) -> Result<(), CatalogError> {
        {
            let mut state = self.state.write().expect("state lock poisoned");
            state.meta = Some(meta.clone());
        }
        self.persist().await
    }

    async fn search_ranked(&self, query: &str, limit: i64) -> Result<Vec<Rule>, CatalogError> {
        let state = self.state.read().expect("state lock poisoned");
        let by_id: HashMap<&str, &Rule> = state
            .rules
            .iter()
            .map(|rule| (rule.id.as_str(), rule))
            .collect();

        let mut results = Vec::new();
        for hit in state.index.search(query) {
            if let Some(rule) = by_id.get(hit.id.as_str()) {
                results.push((*rule).clone());
            }
            if results.len() as i64 >= limit {
                break;
            }
        }
        Ok(results)
    }

    async fn stats(&self) -> Result<StatsOverview, CatalogError> {
        let state = self.state.read().expect("state lock poisoned");

        let total_rules = state.rules.len() as i64;
        let authors: HashSet<&str> = state
            .rules
            .iter()
            .map(|rule| rule.author.as_str())
            .filter(|author| !author.is_empty())
            .collect();
        let average_rating = if state.rules.is_empty() {
            0.0
        } else {
            state.rules.iter().map(|rule| rule.rating).sum::<f64>() / state.rules.len() as f64
        };

        let mut counts: HashMap<String, i64> = HashMap::new();
        for rule in &state.rules {
            for category in &rule.categories {
                *counts.entry(category.clone()).or_insert(0) += 1;
            }
        }

        Ok(StatsOverview {
            total_rules,
            total_authors: authors.len() as i64,
            average_rating,
            top_categories: CategoryCount::rank(counts),
        })
    }

    async fn list_categories(&self) -> Result<Vec<String>, CatalogError> {
        let state = self.state.read().expect("state lock poisoned");
        let mut all: Vec<String> = Vec::new();
        for rule in &state.rules {
            for category in &rule.categories {
                if !all.contains(category) {
                    all.push(category.clone());
                }
            }
        }
        all.sort();
        Ok(all)
    }

    async fn list_authors(&self) -> Result<Vec<String>, CatalogError> {
        let state = self.state.read().expect("state lock poisoned");
        let mut authors: Vec<String> = state
            .rules
            .iter()
            .map(|rule| rule.author.clone())
            .filter(|author| !author.is_empty())
            .collect();
        authors.sort();
        authors.dedup();
        Ok(authors)
    }

    async fn popular(&self, limit: i64) -> Result<Vec<Rule>, CatalogError> {
        let state = self.state.read().expect("state lock poisoned");
        let mut rated: Vec<Rule> = state
            .rules
            .iter()
            .filter(|rule| rule.rating > 0.0)
            .cloned()
            .collect();
        rated.sort_by(|a, b| {
            b.rating
                .partial_cmp(&a.rating)
                .unwrap_or(Ordering::Equal)
                .then_with(|| b.downloads.cmp(&a.downloads))
                .then_with(|| a.id.cmp(&b.id))
        });
        rated.truncate(limit.max(0) as usize);
        Ok(rated)
    }

    async fn recent(&self, limit: i64) -> Result<Vec<Rule>, CatalogError> {
        let state = self.state.read().expect("state lock poisoned");
        let mut rules: Vec<Rule> = state.rules.clone();
        rules.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        rules.truncate(limit.max(0) as usize);
        Ok(rules)
    }

    async fn health_check(&self) -> Result<(), CatalogError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::search::DEFAULT_THRESHOLD;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn rule(id: &str, name: &str, slug: &str, rating: f64, created_offset: i64) -> Rule {
        Rule {
            id: id.to_string(),
            name: name.to_string(),
            slug: slug.to_string(),
            description: "A rule seeded into the snapshot fixture".to_string(),
            content: "Prefer composition over inheritance.".to_string(),
            author: "alice".to_string(),
            source_repo: "seed".to_string(),
            categories: vec!["Frontend".to_string()],
            tags: vec!["react".to_string()],
            created_at: Utc.timestamp_opt(1_700_000_000 + created_offset, 0).unwrap(),
            updated_at: Utc.timestamp_opt(1_700_000_000 + created_offset, 0).unwrap(),
            rating,
            downloads: 0,
            favorites: 0,
            file_size: 36,
            language_support: vec!["React".to_string()],
        }
    }

    async fn setup(rules: Vec<Rule>) -> (MemoryCatalog, TempDir) {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("catalog.json");
        let snapshot = Snapshot { meta: None, rules };
        std::fs::write(&path, serde_json::to_vec_pretty(&snapshot).expect("serialize"))
            .expect("write snapshot");
        let catalog = MemoryCatalog::load(&path, DEFAULT_THRESHOLD)
            .await
            .expect("load snapshot");
        (catalog, dir)
    }

    #[tokio::test]
    async fn list_matches_sql_semantics() {
        let (catalog, _dir) = setup(vec![
            rule("1", "five", "five", 5.0, 0),
            rule("2", "three", "three", 3.0, 1),
            rule("3", "four", "four", 4.0, 2),
        ])
        .await;

        let page = catalog.list(&RuleQuery::default()).await.expect("list");
        let ratings: Vec<f64> = page.rules.iter().map(|r| r.rating).collect();
        assert_eq!(ratings, vec![5.0, 4.0, 3.0]);

        let floored = catalog
            .list(&RuleQuery {
                min_rating: Some(4.0),
                ..RuleQuery::default()
            })
            .await
            .expect("floored");
        assert_eq!(floored.total_matched, 2);
    }

    #[tokio::test]
    async fn pagination_slices_the_sorted_set() {
        let rules = (1..=5)
            .map(|n| rule(&n.to_string(), &format!("r{n}"), &format!("r{n}"), 6.0 - n as f64, n))
            .collect();
        let (catalog, _dir) = setup(rules).await;

        let page = catalog
            .list(&RuleQuery {
                limit: 2,
                offset: 1,
                ..RuleQuery::default()
            })
            .await
            .expect("page");
        let ids: Vec<&str> = page.rules.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["2", "3"]);
        assert_eq!(page.total_matched, 5);
    }

    #[tokio::test]
    async fn fuzzy_search_tolerates_typos() {
        let (catalog, _dir) = setup(vec![
            rule("1", "TypeScript Strict Mode", "ts-strict", 4.0, 0),
            rule("2", "Docker Compose", "docker-compose", 4.0, 1),
        ])
        .await;

        let page = catalog
            .list(&RuleQuery {
                search: Some("typscript".into()),
                ..RuleQuery::default()
            })
            .await
            .expect("search");
        assert_eq!(page.total_matched, 1);
        assert_eq!(page.rules[0].slug, "ts-strict");
    }

    #[tokio::test]
    async fn search_ranked_orders_by_score() {
        let (catalog, _dir) = setup(vec![
            rule("1", "Hooks Guide", "hooks-guide", 1.0, 0),
            rule("2", "Style Guide", "style-guide", 5.0, 1),
        ])
        .await;

        let results = catalog.search_ranked("hooks guide", 10).await.expect("search");
        assert!(!results.is_empty());
        assert_eq!(results[0].slug, "hooks-guide");
    }

    #[tokio::test]
    async fn mutations_rewrite_the_snapshot() {
        let (catalog, dir) = setup(vec![rule("1", "Seed", "seed", 0.0, 0)]).await;
        let path = dir.path().join("catalog.json");

        catalog.increment_downloads("1").await.expect("increment");
        catalog.insert(&rule("2", "Added", "added", 0.0, 1)).await.expect("insert");
        catalog
            .bump_meta(1, Some("community-submission"))
            .await
            .expect("bump");

        let reloaded = MemoryCatalog::load(&path, DEFAULT_THRESHOLD)
            .await
            .expect("reload");
        let seed = reloaded
            .get_by_id("1")
            .await
            .expect("get")
            .expect("present");
        assert_eq!(seed.downloads, 1);
        assert!(reloaded.slug_exists("added").await.expect("exists"));
        let meta = reloaded.meta().await.expect("meta").expect("present");
        assert_eq!(meta.total_rules, 1);
        assert_eq!(meta.sources, vec!["community-submission"]);
    }

    #[tokio::test]
    async fn duplicate_slug_rejected() {
        let (catalog, _dir) = setup(vec![rule("1", "Seed", "seed", 0.0, 0)]).await;
        let err = catalog
            .insert(&rule("2", "Other", "seed", 0.0, 1))
            .await
            .expect_err("duplicate slug");
        assert!(matches!(err, CatalogError::SlugTaken(_)));
    }

    #[tokio::test]
    async fn newly_inserted_rules_are_searchable() {
        let (catalog, _dir) = setup(vec![rule("1", "Seed", "seed", 0.0, 0)]).await;
        catalog
            .insert(&rule("2", "GraphQL Schema Design", "graphql-schema", 0.0, 1))
            .await
            .expect("insert");

        let page = catalog
            .list(&RuleQuery {
                search: Some("graphql".into()),
                ..RuleQuery::default()
            })
            .await
            .expect("search");
        assert_eq!(page.total_matched, 1, "index rebuilds on insert");
    }
}
