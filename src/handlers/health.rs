//! Health check endpoint for service monitoring.

use axum::{Json, extract::State};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::AppState;
use crate::error::AppError;
use crate::models::api_key::STATUS_ACTIVE;
use crate::services::{page_store, settings_service};

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub plugin_version: String,
    pub api_enabled: bool,
    pub total_api_keys: i64,
    pub total_pages_created: i64,
}

/// Health check handler. Unauthenticated.
///
/// # Response (200 OK)
///
/// ```json
/// {
///   "status": "healthy",
///   "timestamp": "2025-08-01T19:00:00Z",
///   "plugin_version": "0.1.0",
///   "api_enabled": true,
///   "total_api_keys": 2,
///   "total_pages_created": 417
/// }
/// ```
pub async fn health_check(
    State(state): State<AppState>,
) -> Result<Json<HealthResponse>, AppError> {
    let settings = settings_service::load(&state.pool).await?;

    let total_api_keys: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM api_keys WHERE status = ?")
            .bind(STATUS_ACTIVE)
            .fetch_one(&state.pool)
            .await?;

    let total_pages_created = page_store::total_pages(&state.pool).await?;

    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: Utc::now(),
        plugin_version: env!("CARGO_PKG_VERSION").to_string(),
        api_enabled: settings.api_enabled,
        total_api_keys,
        total_pages_created,
    }))
}
