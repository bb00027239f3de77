//! Catalog aggregate endpoints.

use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;

use rulehub_core::{CatalogMeta, StatsOverview};

use super::ApiError;
use crate::AppState;

type ApiFailure = (StatusCode, Json<ApiError>);

#[derive(Debug, Serialize)]
pub struct StatsData {
    #[serde(flatten)]
    pub overview: StatsOverview,
    pub meta: Option<CatalogMeta>,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub success: bool,
    pub data: StatsData,
}

/// GET /api/stats
///
/// Computed by scanning the full table. Fine at catalog scale; not designed
/// to scale past it.
pub async fn get_stats(
    State(state): State<AppState>,
) -> Result<Json<StatsResponse>, ApiFailure> {
    let overview = state.catalog.stats().await.map_err(|e| {
        tracing::error!("Failed to compute stats: {e}");
        internal("Failed to compute statistics")
    })?;
    let meta = state.catalog.meta().await.map_err(|e| {
        tracing::error!("Failed to load catalog meta: {e}");
        internal("Failed to compute statistics")
    })?;

    Ok(Json(StatsResponse {
        success: true,
        data: StatsData { overview, meta },
    }))
}

#[derive(Debug, Serialize)]
pub struct CategoriesResponse {
    pub success: bool,
    pub data: CategoriesData,
}

#[derive(Debug, Serialize)]
pub struct CategoriesData {
    pub categories: Vec<String>,
}

/// GET /api/categories
pub async fn list_categories(
    State(state): State<AppState>,
) -> Result<Json<CategoriesResponse>, ApiFailure> {
    let categories = state.catalog.list_categories().await.map_err(|e| {
        tracing::error!("Failed to list categories: {e}");
        internal("Failed to list categories")
    })?;
    Ok(Json(CategoriesResponse {
        success: true,
        data: CategoriesData { categories },
    }))
}

#[derive(Debug, Serialize)]
pub struct AuthorsResponse {
    pub success: bool,
    pub data: AuthorsData,
}

#[derive(Debug, Serialize)]
pub struct AuthorsData {
    pub authors: Vec<String>,
}

/// GET /api/authors
pub async fn list_authors(
    State(state): State<AppState>,
) -> Result<Json<AuthorsResponse>, ApiFailure> {
    let authors = state.catalog.list_authors().await.map_err(|e| {
        tracing::error!("Failed to list authors: {e}");
        internal("Failed to list authors")
    })?;
    Ok(Json(AuthorsResponse {
        success: true,
        data: AuthorsData { authors },
    }))
}

fn internal(message: &str) -> ApiFailure {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ApiError::internal(message)),
    )
}
