//! Rules API endpoints.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header},
    routing::get,
};
use serde::{Deserialize, Serialize};

use rulehub_core::{
    AcceptedRule, CatalogMeta, Rule, RuleQuery, RuleSubmission, SortField, SortOrder, SubmitError,
    submit_rule,
};

use super::ApiError;
use crate::AppState;

type ApiFailure = (StatusCode, Json<ApiError>);

/// Create the rules API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_rules))
        .route("/popular", get(popular_rules))
        .route("/recent", get(recent_rules))
        .route("/{slug}", get(get_rule_by_slug))
}

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub search: Option<String>,
    pub category: Option<String>,
    pub author: Option<String>,
    pub min_rating: Option<f64>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl ListParams {
    /// Permissive translation into a repository query: unknown sort values
    /// fall back to the default, oversized limits are clamped.
    pub fn into_query(self) -> RuleQuery {
        RuleQuery {
            search: self.search,
            category: self.category,
            author: self.author,
            min_rating: self.min_rating,
            sort: SortField::parse_or_default(self.sort_by.as_deref()),
            order: SortOrder::parse_or_default(self.sort_order.as_deref()),
            limit: RuleQuery::clamp_limit(self.limit),
            offset: RuleQuery::clamp_offset(self.offset),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Pagination {
    pub total_matched: i64,
    pub returned: i64,
    pub offset: i64,
    pub limit: i64,
}

#[derive(Debug, Serialize)]
pub struct ListData {
    pub rules: Vec<Rule>,
    pub meta: Option<CatalogMeta>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub success: bool,
    pub data: ListData,
}

/// GET /api/rules
async fn list_rules(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<ListResponse>, ApiFailure> {
    let query = params.into_query();

    let page = state.catalog.list(&query).await.map_err(|e| {
        tracing::error!("Failed to list rules: {e}");
        internal("Failed to list rules")
    })?;
    let meta = state.catalog.meta().await.map_err(|e| {
        tracing::error!("Failed to load catalog meta: {e}");
        internal("Failed to load catalog meta")
    })?;

    Ok(Json(ListResponse {
        success: true,
        data: ListData {
            pagination: Pagination {
                total_matched: page.total_matched,
                returned: page.returned,
                offset: page.offset,
                limit: page.limit,
            },
            rules: page.rules,
            meta,
        },
    }))
}

#[derive(Debug, Serialize)]
pub struct RulesData {
    pub rules: Vec<Rule>,
}

#[derive(Debug, Serialize)]
pub struct RulesResponse {
    pub success: bool,
    pub data: RulesData,
}

#[derive(Debug, Default, Deserialize)]
pub struct LimitParams {
    pub limit: Option<i64>,
}

/// GET /api/rules/popular
async fn popular_rules(
    State(state): State<AppState>,
    Query(params): Query<LimitParams>,
) -> Result<Json<RulesResponse>, ApiFailure> {
    let limit = RuleQuery::clamp_limit(params.limit.or(Some(10)));
    let rules = state.catalog.popular(limit).await.map_err(|e| {
        tracing::error!("Failed to list popular rules: {e}");
        internal("Failed to list popular rules")
    })?;
    Ok(Json(RulesResponse {
        success: true,
        data: RulesData { rules },
    }))
}

/// GET /api/rules/recent
async fn recent_rules(
    State(state): State<AppState>,
    Query(params): Query<LimitParams>,
) -> Result<Json<RulesResponse>, ApiFailure> {
    let limit = RuleQuery::clamp_limit(params.limit.or(Some(10)));
    let rules = state.catalog.recent(limit).await.map_err(|e| {
        tracing::error!("Failed to list recent rules: {e}");
        internal("Failed to list recent rules")
    })?;
    Ok(Json(RulesResponse {
        success: true,
        data: RulesData { rules },
    }))
}

#[derive(Debug, Serialize)]
pub struct RuleData {
    pub rule: Rule,
}

#[derive(Debug, Serialize)]
pub struct RuleResponse {
    pub success: bool,
    pub data: RuleData,
}

/// GET /api/rules/{slug}
///
/// Side effect: each hit counts as one download, incremented store-side.
async fn get_rule_by_slug(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<RuleResponse>, ApiFailure> {
    let rule = state.catalog.get_by_slug(&slug).await.map_err(|e| {
        tracing::error!("Failed to fetch rule {slug}: {e}");
        internal("Failed to fetch rule")
    })?;

    let Some(mut rule) = rule else {
        return Err((
            StatusCode::NOT_FOUND,
            Json(ApiError::not_found(format!("No rule found with slug: {slug}"))),
        ));
    };

    state
        .catalog
        .increment_downloads(&rule.id)
        .await
        .map_err(|e| {
            tracing::error!("Failed to count download for {slug}: {e}");
            internal("Failed to fetch rule")
        })?;
    // Reflect the increment without a second read.
    rule.downloads += 1;

    Ok(Json(RuleResponse {
        success: true,
        data: RuleData { rule },
    }))
}

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub success: bool,
    pub message: String,
    pub rule: AcceptedRule,
}

/// POST /api/submit
///
/// Requires a bearer token the session verifier accepts; no storage is
/// touched before the identity check passes.
pub async fn submit(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(submission): Json<RuleSubmission>,
) -> Result<(StatusCode, Json<SubmitResponse>), ApiFailure> {
    let token = bearer_token(&headers).ok_or_else(|| {
        (
            StatusCode::UNAUTHORIZED,
            Json(ApiError::unauthorized("Missing bearer token")),
        )
    })?;

    let user = state
        .sessions
        .verify(token)
        .await
        .map_err(|e| {
            tracing::error!("Identity provider failure: {e}");
            internal("Identity provider unavailable")
        })?
        .ok_or_else(|| {
            (
                StatusCode::UNAUTHORIZED,
                Json(ApiError::unauthorized("Invalid session token")),
            )
        })?;

    match submit_rule(state.catalog.as_ref(), &state.languages, submission).await {
        Ok(rule) => {
            tracing::info!(slug = %rule.slug, submitter = %user.username, "rule submitted");
            Ok((
                StatusCode::CREATED,
                Json(SubmitResponse {
                    success: true,
                    message: "Rule submitted successfully! It is now available in the catalog."
                        .to_string(),
                    rule,
                }),
            ))
        }
        Err(SubmitError::Validation(violations)) => Err((
            StatusCode::BAD_REQUEST,
            Json(ApiError::bad_request(violations.join("; "))),
        )),
        Err(e) => {
            tracing::error!("Failed to store submission: {e}");
            Err(internal("Failed to store submission"))
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
    pub limit: Option<i64>,
}

/// GET /api/search
pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<RulesResponse>, ApiFailure> {
    let query = params.q.as_deref().map(str::trim).unwrap_or_default();
    if query.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ApiError::bad_request("Query parameter q is required")),
        ));
    }

    let limit = RuleQuery::clamp_limit(params.limit);
    let rules = state
        .catalog
        .search_ranked(query, limit)
        .await
        .map_err(|e| {
            tracing::error!("Search failed for {query:?}: {e}");
            internal("Search failed")
        })?;

    Ok(Json(RulesResponse {
        success: true,
        data: RulesData { rules },
    }))
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

fn internal(message: &str) -> ApiFailure {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ApiError::internal(message)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rulehub_core::config::StaticToken;
    use rulehub_core::{Database, LanguageMap, SqlCatalog, StaticTokenVerifier};
    use std::sync::Arc;
    use tempfile::TempDir;

    async fn test_state() -> (AppState, TempDir) {
        let dir = TempDir::new().expect("temp dir");
        let db = Database::new(&dir.path().join("catalog.db"))
            .await
            .expect("db");
        rulehub_core::migrations::run_migrations(&db)
            .await
            .expect("migrations");
        let state = AppState {
            catalog: Arc::new(SqlCatalog::new(db)),
            sessions: Arc::new(StaticTokenVerifier::new(&[StaticToken {
                token: "dev-token".into(),
                id: "u1".into(),
                username: "alice".into(),
                email: None,
                name: None,
            }])),
            languages: Arc::new(LanguageMap::default()),
        };
        (state, dir)
    }

    fn valid_submission() -> RuleSubmission {
        RuleSubmission {
            name: "My Rule".into(),
            category: "Frontend".into(),
            description: "A description easily long enough to clear the bar.".into(),
            content: "Use functional components with hooks. Keep effects small and the \
                      dependency arrays explicit at every call site."
                .into(),
            author: "alice".into(),
            tags: vec!["React".into()],
        }
    }

    fn auth_headers(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            format!("Bearer {token}").parse().expect("header value"),
        );
        headers
    }

    #[tokio::test]
    async fn submit_requires_a_valid_token() {
        let (state, _dir) = test_state().await;

        let (status, Json(body)) = submit(
            State(state.clone()),
            HeaderMap::new(),
            Json(valid_submission()),
        )
        .await
        .expect_err("no token");
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body.error, "unauthorized");

        let (status, _) = submit(
            State(state),
            auth_headers("wrong-token"),
            Json(valid_submission()),
        )
        .await
        .expect_err("bad token");
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn submit_then_detail_fetch_reflects_download() {
        let (state, _dir) = test_state().await;

        let (status, Json(created)) = submit(
            State(state.clone()),
            auth_headers("dev-token"),
            Json(valid_submission()),
        )
        .await
        .expect("accepted");
        assert_eq!(status, StatusCode::CREATED);
        assert!(created.success);
        assert_eq!(created.rule.slug, "my-rule");

        let Json(detail) = get_rule_by_slug(State(state.clone()), Path("my-rule".into()))
            .await
            .expect("found");
        assert!(detail.success);
        assert_eq!(detail.data.rule.downloads, 1);

        let Json(detail) = get_rule_by_slug(State(state), Path("my-rule".into()))
            .await
            .expect("found again");
        assert_eq!(detail.data.rule.downloads, 2);
    }

    #[tokio::test]
    async fn detail_fetch_of_unknown_slug_is_404() {
        let (state, _dir) = test_state().await;
        let (status, Json(body)) = get_rule_by_slug(State(state), Path("nope".into()))
            .await
            .expect_err("missing");
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.error, "not_found");
    }

    #[tokio::test]
    async fn validation_errors_report_every_violation() {
        let (state, _dir) = test_state().await;

        let mut submission = valid_submission();
        submission.name = String::new();
        submission.author = String::new();
        let (status, Json(body)) = submit(
            State(state),
            auth_headers("dev-token"),
            Json(submission),
        )
        .await
        .expect_err("invalid");
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.message.contains("name"));
        assert!(body.message.contains("author"));
    }

    #[tokio::test]
    async fn list_params_are_permissive() {
        let (state, _dir) = test_state().await;
        let (created_status, _) = submit(
            State(state.clone()),
            auth_headers("dev-token"),
            Json(valid_submission()),
        )
        .await
        .expect("accepted");
        assert_eq!(created_status, StatusCode::CREATED);

        let params = ListParams {
            sort_by: Some("nonsense".into()),
            sort_order: Some("sideways".into()),
            limit: Some(9999),
            ..ListParams::default()
        };
        let Json(listing) = list_rules(State(state), Query(params))
            .await
            .expect("listing");
        assert!(listing.success);
        assert_eq!(listing.data.pagination.limit, 100, "limit is clamped");
        assert_eq!(listing.data.pagination.total_matched, 1);
        assert_eq!(listing.data.rules.len(), 1);
        assert!(listing.data.meta.is_some(), "submission created the meta row");
    }

    #[tokio::test]
    async fn search_requires_a_query() {
        let (state, _dir) = test_state().await;
        let (status, _) = search(State(state), Query(SearchParams::default()))
            .await
            .expect_err("missing q");
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
