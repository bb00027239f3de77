use async_trait::async_trait;
use thiserror::Error;

use crate::db::DbError;

use super::query::RuleQuery;
use super::types::{CatalogMeta, Rule, RulePage, StatsOverview};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("database error: {0}")]
    Database(#[from] DbError),
    #[error("sql error: {0}")]
    Sql(#[from] libsql::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("datetime parse error: {0}")]
    DateTimeParse(#[from] chrono::ParseError),
    #[error("snapshot io error: {0}")]
    Snapshot(#[from] std::io::Error),
    #[error("rule not found: {0}")]
    NotFound(String),
    #[error("slug already taken: {0}")]
    SlugTaken(String),
}

/// The catalog contract. Two interchangeable backends implement it: the
/// SQL store and the in-memory snapshot store. Deployments pick one.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// Resolve a filter/sort/pagination request into one result page.
    async fn list(&self, query: &RuleQuery) -> Result<RulePage, CatalogError>;

    async fn get_by_id(&self, id: &str) -> Result<Option<Rule>, CatalogError>;

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Rule>, CatalogError>;

    async fn slug_exists(&self, slug: &str) -> Result<bool, CatalogError>;

    /// Insert a fully constructed rule. The backend's slug uniqueness is
    /// the final authority; a clash surfaces as [`CatalogError::SlugTaken`].
    async fn insert(&self, rule: &Rule) -> Result<(), CatalogError>;

    /// Atomic `downloads = downloads + 1`; never read-modify-write.
    async fn increment_downloads(&self, id: &str) -> Result<(), CatalogError>;

    async fn meta(&self) -> Result<Option<CatalogMeta>, CatalogError>;

    /// Bump `total_rules` by `delta`, refresh `last_updated`, and record a
    /// new provenance source if one is given.
    async fn bump_meta(&self, delta: i64, new_source: Option<&str>) -> Result<(), CatalogError>;

    /// Replace the meta row wholesale (bulk import finalization).
    async fn put_meta(&self, meta: &CatalogMeta) -> Result<(), CatalogError>;

    /// Relevance-ranked free-text lookup, best match first.
    async fn search_ranked(&self, query: &str, limit: i64) -> Result<Vec<Rule>, CatalogError>;

    async fn stats(&self) -> Result<StatsOverview, CatalogError>;

    async fn list_categories(&self) -> Result<Vec<String>, CatalogError>;

    async fn list_authors(&self) -> Result<Vec<String>, CatalogError>;

    async fn popular(&self, limit: i64) -> Result<Vec<Rule>, CatalogError>;

    async fn recent(&self, limit: i64) -> Result<Vec<Rule>, CatalogError>;

    async fn health_check(&self) -> Result<(), CatalogError>;
}
