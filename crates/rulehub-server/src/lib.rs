pub mod api;

use std::sync::Arc;

use axum::{Json, Router, extract::State, http::StatusCode, routing::get};
use rulehub_core::{CatalogRepository, LanguageMap, SessionVerifier};
use serde::Serialize;

/// Shared handler state. Everything is injected; handlers never construct
/// their own backends.
#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<dyn CatalogRepository>,
    pub sessions: Arc<dyn SessionVerifier>,
    pub languages: Arc<LanguageMap>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .nest("/api", api::router())
        .with_state(state)
}

#[derive(Serialize)]
pub struct HealthResponse {
    status: String,
    version: String,
    catalog: String,
}

async fn healthz(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let catalog_status = match state.catalog.health_check().await {
        Ok(_) => "ok",
        Err(_) => "unhealthy",
    };

    let status = if catalog_status == "ok" {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(HealthResponse {
            status: if catalog_status == "ok" {
                "healthy".to_string()
            } else {
                "unhealthy".to_string()
            },
            version: env!("CARGO_PKG_VERSION").to_string(),
            catalog: catalog_status.to_string(),
        }),
    )
}
