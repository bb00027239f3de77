use std::collections::HashSet;
use std::path::Path;

use chrono::Utc;
use serde::Deserialize;

use crate::constants::CATALOG_VERSION;

use super::repository::{CatalogError, CatalogRepository};
use super::slug;
use super::types::{CatalogMeta, Rule};

/// Snapshot document accepted by the importer: the meta record plus the
/// full rule array.
#[derive(Debug, Deserialize)]
pub struct SnapshotDocument {
    #[serde(default)]
    pub meta: Option<CatalogMeta>,
    #[serde(default)]
    pub rules: Vec<Rule>,
}

/// Outcome of a bulk import. Per-row failures do not abort the batch; they
/// are counted and the import continues.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ImportReport {
    pub total: usize,
    pub migrated: usize,
    pub failed: usize,
    pub slugs_renamed: usize,
}

pub async fn read_snapshot(path: &Path) -> Result<SnapshotDocument, CatalogError> {
    let bytes = tokio::fs::read(path).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Load a snapshot into a catalog store. Slugs are de-duplicated against the
/// whole batch up front (numeric suffixes), then rows are inserted one by
/// one; a failing row is logged and skipped. Finishes by writing the meta
/// row with the processed count.
pub async fn import_snapshot(
    catalog: &dyn CatalogRepository,
    snapshot: SnapshotDocument,
) -> Result<ImportReport, CatalogError> {
    let mut report = ImportReport {
        total: snapshot.rules.len(),
        ..ImportReport::default()
    };

    let mut taken: HashSet<String> = HashSet::new();
    let mut prepared: Vec<Rule> = Vec::with_capacity(snapshot.rules.len());
    for mut rule in snapshot.rules {
        let unique = slug::make_unique(&rule.slug, &mut taken);
        if unique != rule.slug {
            tracing::debug!(id = %rule.id, old = %rule.slug, new = %unique, "renamed duplicate slug");
            report.slugs_renamed += 1;
            rule.slug = unique;
        }
        prepared.push(rule);
    }

    for rule in &prepared {
        match catalog.insert(rule).await {
            Ok(()) => report.migrated += 1,
            Err(err) => {
                tracing::warn!(id = %rule.id, "failed to import rule: {err}");
                report.failed += 1;
            }
        }
    }

    let meta = match snapshot.meta {
        Some(meta) => CatalogMeta {
            total_rules: report.migrated as i64,
            last_updated: Utc::now(),
            ..meta
        },
        None => CatalogMeta {
            version: CATALOG_VERSION.to_string(),
            total_rules: report.migrated as i64,
            last_updated: Utc::now(),
            sources: Vec::new(),
        },
    };
    catalog.put_meta(&meta).await?;

    Ok(report)
}
