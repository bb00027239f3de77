pub mod auth;
pub mod catalog;
pub mod config;
pub mod constants;
pub mod db;
pub mod migrations;
pub mod telemetry;

pub use auth::{AuthError, AuthUser, GitHubVerifier, SessionVerifier, StaticTokenVerifier};
pub use catalog::import::{ImportReport, import_snapshot};
pub use catalog::language::LanguageMap;
pub use catalog::memory::MemoryCatalog;
pub use catalog::query::{RuleQuery, SortField, SortOrder};
pub use catalog::repository::{CatalogError, CatalogRepository};
pub use catalog::sql::SqlCatalog;
pub use catalog::submit::{AcceptedRule, RuleSubmission, SubmitError, submit_rule};
pub use catalog::types::{CatalogMeta, CategoryCount, Rule, RulePage, StatsOverview};
pub use config::Config;
pub use db::Database;
pub use telemetry::{TelemetryError, TelemetryGuard, init_telemetry};
