use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::constants::{COMMUNITY_SOURCE, MAX_SLUG_ATTEMPTS};

use super::language::LanguageMap;
use super::repository::{CatalogError, CatalogRepository};
use super::slug;
use super::types::Rule;

const MIN_DESCRIPTION_LEN: usize = 50;
const MIN_CONTENT_LEN: usize = 100;

/// An untrusted inbound rule submission.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RuleSubmission {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// The slice of the created rule returned to the submitter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AcceptedRule {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub author: String,
    pub category: String,
}

#[derive(Debug, Error)]
pub enum SubmitError {
    /// Every violated constraint, not just the first one hit.
    #[error("validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),
    #[error("could not allocate a unique slug for {0}")]
    SlugExhausted(String),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

fn validate(submission: &RuleSubmission) -> Result<(), SubmitError> {
    let mut missing = Vec::new();
    if submission.name.trim().is_empty() {
        missing.push("name");
    }
    if submission.category.trim().is_empty() {
        missing.push("category");
    }
    if submission.description.trim().is_empty() {
        missing.push("description");
    }
    if submission.content.trim().is_empty() {
        missing.push("content");
    }
    if submission.author.trim().is_empty() {
        missing.push("author");
    }
    if submission.tags.is_empty() {
        missing.push("tags");
    }
    if !missing.is_empty() {
        return Err(SubmitError::Validation(
            missing
                .into_iter()
                .map(|field| format!("missing required field: {field}"))
                .collect(),
        ));
    }

    let mut violations = Vec::new();
    if submission.description.len() < MIN_DESCRIPTION_LEN {
        violations.push(format!(
            "description must be at least {MIN_DESCRIPTION_LEN} characters long"
        ));
    }
    if submission.content.len() < MIN_CONTENT_LEN {
        violations.push(format!(
            "content must be at least {MIN_CONTENT_LEN} characters long"
        ));
    }
    if !violations.is_empty() {
        return Err(SubmitError::Validation(violations));
    }
    Ok(())
}

/// Lowercase and trim every tag, dropping empties and duplicates while
/// keeping first-occurrence order. Idempotent.
pub fn normalize_tags(tags: &[String]) -> Vec<String> {
    let mut normalized: Vec<String> = Vec::new();
    for tag in tags {
        let tag = tag.trim().to_lowercase();
        if !tag.is_empty() && !normalized.contains(&tag) {
            normalized.push(tag);
        }
    }
    normalized
}

/// Validate, normalize, and persist one submission. The store's slug
/// uniqueness is the final arbiter: on a conflict the insert retries with
/// the next numeric suffix, so two racing submissions with the same name
/// both land (one with `-2`).
pub async fn submit_rule(
    catalog: &dyn CatalogRepository,
    languages: &LanguageMap,
    submission: RuleSubmission,
) -> Result<AcceptedRule, SubmitError> {
    validate(&submission)?;

    let name = submission.name.trim().to_string();
    let category = submission.category.trim().to_string();
    let description = submission.description.trim().to_string();
    let content = submission.content.trim().to_string();
    let author = submission.author.trim().to_string();
    let tags = normalize_tags(&submission.tags);
    if tags.is_empty() {
        return Err(SubmitError::Validation(vec![
            "at least one tag is required".to_string(),
        ]));
    }

    let language_support = languages.infer(&tags, &content);
    let now = Utc::now();
    let mut rule = Rule {
        id: Uuid::new_v4().to_string(),
        name: name.clone(),
        slug: String::new(),
        description,
        file_size: content.len() as i64,
        content,
        author: author.clone(),
        source_repo: COMMUNITY_SOURCE.to_string(),
        categories: vec![category.clone()],
        tags,
        created_at: now,
        updated_at: now,
        rating: 0.0,
        downloads: 0,
        favorites: 0,
        language_support,
    };

    let base = slug::base_slug(&name);
    for candidate in slug::candidates(&base).take(MAX_SLUG_ATTEMPTS) {
        if catalog.slug_exists(&candidate).await? {
            continue;
        }
        rule.slug = candidate;
        match catalog.insert(&rule).await {
            Ok(()) => {
                catalog.bump_meta(1, Some(COMMUNITY_SOURCE)).await?;
                return Ok(AcceptedRule {
                    id: rule.id,
                    name: rule.name,
                    slug: rule.slug,
                    author,
                    category,
                });
            }
            // Lost a probe/insert race; try the next suffix.
            Err(CatalogError::SlugTaken(_)) => continue,
            Err(err) => return Err(err.into()),
        }
    }

    Err(SubmitError::SlugExhausted(base))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_submission() -> RuleSubmission {
        RuleSubmission {
            name: "My Rule".to_string(),
            category: "Frontend".to_string(),
            description: "d".repeat(MIN_DESCRIPTION_LEN),
            content: "c".repeat(MIN_CONTENT_LEN),
            author: "alice".to_string(),
            tags: vec!["React".to_string()],
        }
    }

    #[test]
    fn missing_fields_are_all_reported() {
        let submission = RuleSubmission {
            description: "d".repeat(MIN_DESCRIPTION_LEN),
            ..RuleSubmission::default()
        };
        let err = validate(&submission).expect_err("invalid");
        let SubmitError::Validation(messages) = err else {
            panic!("expected validation error");
        };
        assert_eq!(messages.len(), 5);
        for field in ["name", "category", "content", "author", "tags"] {
            assert!(
                messages.iter().any(|m| m.ends_with(field)),
                "missing report for {field}: {messages:?}"
            );
        }
    }

    #[test]
    fn length_boundaries_are_inclusive() {
        let mut submission = valid_submission();
        submission.description = "d".repeat(MIN_DESCRIPTION_LEN - 1);
        let err = validate(&submission).expect_err("short description");
        let SubmitError::Validation(messages) = err else {
            panic!("expected validation error");
        };
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("description"));

        let mut submission = valid_submission();
        submission.description = "d".repeat(MIN_DESCRIPTION_LEN);
        submission.content = "c".repeat(MIN_CONTENT_LEN - 1);
        let err = validate(&submission).expect_err("short content");
        let SubmitError::Validation(messages) = err else {
            panic!("expected validation error");
        };
        assert!(messages[0].contains("content"));

        assert!(validate(&valid_submission()).is_ok());
    }

    #[test]
    fn both_length_violations_are_listed_together() {
        let mut submission = valid_submission();
        submission.description = "short".to_string();
        submission.content = "also short".to_string();
        let err = validate(&submission).expect_err("both short");
        let SubmitError::Validation(messages) = err else {
            panic!("expected validation error");
        };
        assert_eq!(messages.len(), 2);
    }

    #[test]
    fn tag_normalization_is_idempotent() {
        let once = normalize_tags(&["React".to_string(), " TypeScript ".to_string()]);
        assert_eq!(once, vec!["react", "typescript"]);
        assert_eq!(normalize_tags(&once), once);
    }

    #[test]
    fn tag_normalization_drops_empties_and_duplicates() {
        let tags = normalize_tags(&[
            "  ".to_string(),
            "React".to_string(),
            "react".to_string(),
        ]);
        assert_eq!(tags, vec!["react"]);
    }
}
