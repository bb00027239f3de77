//! HTTP API handlers for the rulehub catalog.
//!
//! Provides:
//! - GET /api/rules - paginated listing with filters and sorting
//! - GET /api/rules/popular, /api/rules/recent - curated lists
//! - GET /api/rules/{slug} - rule detail (increments the download counter)
//! - POST /api/submit - community rule submission (auth required)
//! - GET /api/search - relevance-ranked free-text search
//! - GET /api/stats, /api/categories, /api/authors - catalog aggregates

pub mod rules;
pub mod stats;

use axum::{
    Router,
    routing::{get, post},
};
use serde::Serialize;

use crate::AppState;

/// Create the main API router with all endpoints mounted.
pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/rules", rules::router())
        .route("/submit", post(rules::submit))
        .route("/search", get(rules::search))
        .route("/stats", get(stats::get_stats))
        .route("/categories", get(stats::list_categories))
        .route("/authors", get(stats::list_authors))
}

/// Error response for API errors.
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
    pub message: String,
}

impl ApiError {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("not_found", message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new("bad_request", message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("unauthorized", message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new("internal_error", message)
    }
}
