use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use libsql::{Row, params};

use crate::constants::CATALOG_VERSION;
use crate::db::Database;

use super::query::RuleQuery;
use super::repository::{CatalogError, CatalogRepository};
use super::types::{CatalogMeta, CategoryCount, Rule, RulePage, StatsOverview};

const RULE_COLUMNS: &str = "id, name, slug, description, content, author, source_repo, categories, tags, created_at, updated_at, rating, downloads, favorites, file_size, language_support";

/// Catalog backend over the libsql store.
#[derive(Clone)]
pub struct SqlCatalog {
    db: Database,
}

impl SqlCatalog {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CatalogRepository for SqlCatalog {
    async fn list(&self, query: &RuleQuery) -> Result<RulePage, CatalogError> {
        let conn = self.db.connection().await?;

        let mut clauses: Vec<String> = Vec::new();
        let mut args: Vec<libsql::Value> = Vec::new();

        if let Some(search) = query.search.as_deref().map(str::trim) {
            if !search.is_empty() {
                let pattern = format!("%{search}%");
                let base = args.len();
                clauses.push(format!(
                    "(name LIKE ?{} OR description LIKE ?{} OR content LIKE ?{})",
                    base + 1,
                    base + 2,
                    base + 3
                ));
                args.push(pattern.clone().into());
                args.push(pattern.clone().into());
                args.push(pattern.into());
            }
        }

        if let Some(category) = query.category.as_deref() {
            // Quoted JSON string matching, so "Front" does not match
            // rows categorized as "Frontend".
            clauses.push(format!("categories LIKE ?{}", args.len() + 1));
            args.push(format!("%\"{category}\"%").into());
        }

        if let Some(author) = query.author.as_deref() {
            clauses.push(format!("author LIKE ?{}", args.len() + 1));
            args.push(format!("%{author}%").into());
        }

        if let Some(min_rating) = query.min_rating {
            clauses.push(format!("rating >= ?{}", args.len() + 1));
            args.push(min_rating.into());
        }

        let where_sql = if clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", clauses.join(" AND "))
        };

        let mut count_rows = conn
            .query(
                &format!("SELECT COUNT(*) FROM cursor_rules{where_sql}"),
                args.clone(),
            )
            .await?;
        let total_matched: i64 = match count_rows.next().await? {
            Some(row) => row.get(0)?,
            None => 0,
        };

        let sql = format!(
            "SELECT {RULE_COLUMNS} FROM cursor_rules{where_sql}
             ORDER BY {} {}, id ASC
             LIMIT ?{} OFFSET ?{}",
            query.sort.as_str(),
            query.order.as_str(),
            args.len() + 1,
            args.len() + 2
        );
        args.push(query.limit.into());
        args.push(query.offset.into());

        let mut rows = conn.query(&sql, args).await?;
        let mut rules = Vec::new();
        while let Some(row) = rows.next().await? {
            rules.push(row_to_rule(row)?);
        }

        Ok(RulePage {
            returned: rules.len() as i64,
            rules,
            total_matched,
            offset: query.offset,
            limit: query.limit,
        })
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Rule>, CatalogError> {
        let conn = self.db.connection().await?;
        let mut rows = conn
            .query(
                &format!("SELECT {RULE_COLUMNS} FROM cursor_rules WHERE id = ?1"),
                params![id],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(row_to_rule(row)?)),
            None => Ok(None),
        }
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Rule>, CatalogError> {
        let conn = self.db.connection().await?;
        let mut rows = conn
            .query(
                &format!("SELECT {RULE_COLUMNS} FROM cursor_rules WHERE slug = ?1"),
                params![slug],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(row_to_rule(row)?)),
            None => Ok(None),
        }
    }

    async fn slug_exists(&self, slug: &str) -> Result<bool, CatalogError> {
        let conn = self.db.connection().await?;
        let mut rows = conn
            .query(
                "SELECT 1 FROM cursor_rules WHERE slug = ?1 LIMIT 1",
                params![slug],
            )
            .await?;
        Ok(rows.next().await?.is_some())
    }

    async fn insert(&self, rule: &Rule) -> Result<(), CatalogError> {
        let categories = serde_json::to_string(&rule.categories)?;
        let tags = serde_json::to_string(&rule.tags)?;
        let language_support = serde_json::to_string(&rule.language_support)?;

        let conn = self.db.connection().await?;
        let result = conn
            .execute(
                "INSERT INTO cursor_rules (
                    id, name, slug, description, content, author, source_repo,
                    categories, tags, created_at, updated_at, rating, downloads,
                    favorites, file_size, language_support
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
                params![
                    rule.id.as_str(),
                    rule.name.as_str(),
                    rule.slug.as_str(),
                    rule.description.as_str(),
                    rule.content.as_str(),
                    rule.author.as_str(),
                    rule.source_repo.as_str(),
                    categories,
                    tags,
                    rfc3339(&rule.created_at),
                    rfc3339(&rule.updated_at),
                    rule.rating,
                    rule.downloads,
                    rule.favorites,
                    rule.file_size,
                    language_support
                ],
            )
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(err) if is_unique_violation(&err) => {
                Err(CatalogError::SlugTaken(rule.slug.clone()))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn increment_downloads(&self, id: &str) -> Result<(), CatalogError> {
        let conn = self.db.connection().await?;
        let affected = conn
            .execute(
                "UPDATE cursor_rules SET downloads = downloads + 1 WHERE id = ?1",
                params![id],
            )
            .await?;
        if affected == 0 {
            return Err(CatalogError::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn meta(&self) -> Result<Option<CatalogMeta>, CatalogError> {
        let conn = self.db.connection().await?;
        let mut rows = conn
            .query(
                "SELECT version, total_rules, last_updated, sources FROM meta WHERE id = 1",
                (),
            )
            .await?;

        match rows.next().await? {
            Some(row) => {
                let version: String = row.get(0)?;
                let total_rules: i64 = row.get(1)?;
                let last_updated: String = row.get(2)?;
                let sources: Option<String> = row.get(3)?;
                Ok(Some(CatalogMeta {
                    version,
                    total_rules,
                    last_updated: DateTime::parse_from_rfc3339(&last_updated)?
                        .with_timezone(&Utc),
                    sources: parse_list(sources),
                }))
            }
            None => Ok(None),
        }
    }

    async fn bump_meta(&self, delta: i64, new_source: Option<&str>) -> Result<(), CatalogError> {
        let now = rfc3339(&Utc::now());
        let conn = self.db.connection().await?;

        let affected = conn
            .execute(
                "UPDATE meta SET total_rules = total_rules + ?1, last_updated = ?2 WHERE id = 1",
                params![delta, now.as_str()],
            )
            .await?;
        if affected == 0 {
            conn.execute(
                "INSERT INTO meta (id, version, total_rules, last_updated, sources) VALUES (1, ?1, ?2, ?3, '[]')",
                params![CATALOG_VERSION, delta.max(0), now.as_str()],
            )
            .await?;
        }

        if let Some(source) = new_source {
            let mut rows = conn
                .query("SELECT sources FROM meta WHERE id = 1", ())
                .await?;
            if let Some(row) = rows.next().await? {
                let raw: Option<String> = row.get(0)?;
                let mut sources = parse_list(raw);
                if !sources.iter().any(|s| s == source) {
                    sources.push(source.to_string());
                    conn.execute(
                        "UPDATE meta SET sources = ?1 WHERE id = 1",
                        params![serde_json::to_string(&sources)?],
                    )
                    .await?;
                }
            }
        }

        Ok(())
    }

    async fn put_meta(&self, meta: &CatalogMeta) -> Result<(), CatalogError> {
        let conn = self.db.connection().await?;
        conn.execute(
            "INSERT OR REPLACE INTO meta (id, version, total_rules, last_updated, sources) VALUES (1, ?1, ?2, ?3, ?4)",
            params![
                meta.version.as_str(),
                meta.total_rules,
                rfc3339(&meta.last_updated),
                serde_json::to_string(&meta.sources)?
            ],
        )
        .await?;
        Ok(())
    }

    async fn search_ranked(&self, query: &str, limit: i64) -> Result<Vec<Rule>, CatalogError> {
        let pattern = format!("%{}%", query.trim());
        let conn = self.db.connection().await?;
        let mut rows = conn
            .query(
                &format!(
                    "SELECT {RULE_COLUMNS} FROM cursor_rules
                     WHERE name LIKE ?1 OR description LIKE ?1 OR content LIKE ?1 OR author LIKE ?1
                     ORDER BY
                       CASE
                         WHEN name LIKE ?1 THEN 1
                         WHEN description LIKE ?1 THEN 2
                         WHEN author LIKE ?1 THEN 3
                         ELSE 4
                       END,
                       rating DESC,
                       id ASC
                     LIMIT ?2"
                ),
                params![pattern, limit],
            )
            .await?;

        let mut rules = Vec::new();
        while let Some(row) = rows.next().await? {
            rules.push(row_to_rule(row)?);
        }
        Ok(rules)
    }

    async fn stats(&self) -> Result<StatsOverview, CatalogError> {
        let conn = self.db.connection().await?;
        let mut rows = conn
            .query(
                "SELECT COUNT(*),
                        COUNT(DISTINCT NULLIF(author, '')),
                        COALESCE(AVG(rating), 0)
                 FROM cursor_rules",
                (),
            )
            .await?;
        let (total_rules, total_authors, average_rating) = match rows.next().await? {
            Some(row) => {
                let total: i64 = row.get(0)?;
                let authors: i64 = row.get(1)?;
                let avg: f64 = row.get(2)?;
                (total, authors, avg)
            }
            None => (0, 0, 0.0),
        };

        let mut counts: HashMap<String, i64> = HashMap::new();
        let mut rows = conn
            .query(
                "SELECT categories FROM cursor_rules WHERE categories IS NOT NULL AND categories != ''",
                (),
            )
            .await?;
        while let Some(row) = rows.next().await? {
            let raw: Option<String> = row.get(0)?;
            for category in parse_list(raw) {
                *counts.entry(category).or_insert(0) += 1;
            }
        }

        Ok(StatsOverview {
            total_rules,
            total_authors,
            average_rating,
            top_categories: CategoryCount::rank(counts),
        })
    }

    async fn list_categories(&self) -> Result<Vec<String>, CatalogError> {
        let conn = self.db.connection().await?;
        let mut rows = conn
            .query(
                "SELECT DISTINCT categories FROM cursor_rules WHERE categories IS NOT NULL AND categories != ''",
                (),
            )
            .await?;

        let mut all: Vec<String> = Vec::new();
        while let Some(row) = rows.next().await? {
            let raw: Option<String> = row.get(0)?;
            for category in parse_list(raw) {
                if !all.contains(&category) {
                    all.push(category);
                }
            }
        }
        all.sort();
        Ok(all)
    }

    async fn list_authors(&self) -> Result<Vec<String>, CatalogError> {
        let conn = self.db.connection().await?;
        let mut rows = conn
            .query(
                "SELECT DISTINCT author FROM cursor_rules
                 WHERE author IS NOT NULL AND author != ''
                 ORDER BY author",
                (),
            )
            .await?;

        let mut authors = Vec::new();
        while let Some(row) = rows.next().await? {
            authors.push(row.get(0)?);
        }
        Ok(authors)
    }

    async fn popular(&self, limit: i64) -> Result<Vec<Rule>, CatalogError> {
        let conn = self.db.connection().await?;
        let mut rows = conn
            .query(
                &format!(
                    "SELECT {RULE_COLUMNS} FROM cursor_rules
                     WHERE rating > 0
                     ORDER BY rating DESC, downloads DESC, id ASC
                     LIMIT ?1"
                ),
                params![limit],
            )
            .await?;

        let mut rules = Vec::new();
        while let Some(row) = rows.next().await? {
            rules.push(row_to_rule(row)?);
        }
        Ok(rules)
    }

    async fn recent(&self, limit: i64) -> Result<Vec<Rule>, CatalogError> {
        let conn = self.db.connection().await?;
        let mut rows = conn
            .query(
                &format!(
                    "SELECT {RULE_COLUMNS} FROM cursor_rules
                     ORDER BY created_at DESC, id ASC
                     LIMIT ?1"
                ),
                params![limit],
            )
            .await?;

        let mut rules = Vec::new();
        while let Some(row) = rows.next().await? {
            rules.push(row_to_rule(row)?);
        }
        Ok(rules)
    }

    async fn health_check(&self) -> Result<(), CatalogError> {
        Ok(self.db.health_check().await?)
    }
}

fn rfc3339(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn is_unique_violation(err: &libsql::Error) -> bool {
    err.to_string()
        .contains("UNIQUE constraint failed: cursor_rules.slug")
}

/// List columns are stored as JSON text. A row that fails to parse degrades
/// to an empty list rather than failing the read.
fn parse_list(raw: Option<String>) -> Vec<String> {
    raw.and_then(|value| serde_json::from_str(&value).ok())
        .unwrap_or_default()
}

fn row_to_rule(row: Row) -> Result<Rule, CatalogError> {
    let description: Option<String> = row.get(3)?;
    let author: Option<String> = row.get(5)?;
    let source_repo: Option<String> = row.get(6)?;
    let categories: Option<String> = row.get(7)?;
    let tags: Option<String> = row.get(8)?;
    let created_at: String = row.get(9)?;
    let updated_at: String = row.get(10)?;
    let language_support: Option<String> = row.get(15)?;

    Ok(Rule {
        id: row.get(0)?,
        name: row.get(1)?,
        slug: row.get(2)?,
        description: description.unwrap_or_default(),
        content: row.get(4)?,
        author: author.unwrap_or_default(),
        source_repo: source_repo.unwrap_or_default(),
        categories: parse_list(categories),
        tags: parse_list(tags),
        created_at: DateTime::parse_from_rfc3339(&created_at)?.with_timezone(&Utc),
        updated_at: DateTime::parse_from_rfc3339(&updated_at)?.with_timezone(&Utc),
        rating: row.get(11)?,
        downloads: row.get(12)?,
        favorites: row.get(13)?,
        file_size: row.get(14)?,
        language_support: parse_list(language_support),
    })
}
