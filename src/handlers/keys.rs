//! Admin handlers for the credential lifecycle.
//!
//! All routes here sit behind the admin-token middleware:
//! - `POST /admin/api-keys` - generate a credential
//! - `GET /admin/api-keys` - list credentials (no hash material)
//! - `POST /admin/api-keys/{id}/revoke` - revoke (idempotent)
//! - `DELETE /admin/api-keys/{id}` - hard delete
//! - `POST /admin/api-keys/{id}/regenerate-secret` - new key material
//! - `GET /admin/api-keys/{id}/stats` - request statistics

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;
use serde_json::{Value, json};

use crate::AppState;
use crate::error::AppError;
use crate::models::activity::KeyStatistics;
use crate::models::api_key::{ApiKeySummary, GeneratedKey, RegeneratedKey};
use crate::services::{activity_log, key_service};
use crate::services::key_service::GenerateKeyRequest;

/// Generate a new credential.
///
/// # Response (201)
///
/// Contains the raw `api_key` and `secret_key`. This is the only time they
/// are ever returned; only hashes are stored.
pub async fn generate_key(
    State(state): State<AppState>,
    Json(request): Json<GenerateKeyRequest>,
) -> Result<(StatusCode, Json<GeneratedKey>), AppError> {
    let key = key_service::generate_key(&state.pool, request, None, Utc::now()).await?;

    Ok((StatusCode::CREATED, Json(key)))
}

/// List all credentials, newest first.
pub async fn list_keys(
    State(state): State<AppState>,
) -> Result<Json<Vec<ApiKeySummary>>, AppError> {
    Ok(Json(key_service::list_keys(&state.pool).await?))
}

/// Revoke a credential. Succeeds (and stays revoked) when called twice.
pub async fn revoke_key(
    State(state): State<AppState>,
    Path(key_id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    key_service::revoke_key(&state.pool, key_id).await?;

    Ok(Json(json!({ "revoked": true, "id": key_id })))
}

/// Hard-delete a credential, active or not.
pub async fn delete_key(
    State(state): State<AppState>,
    Path(key_id): Path<i64>,
) -> Result<StatusCode, AppError> {
    key_service::delete_key(&state.pool, key_id).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Replace the key material of an active credential.
///
/// The response carries the new raw pair once; the old pair stops
/// authenticating immediately.
pub async fn regenerate_secret(
    State(state): State<AppState>,
    Path(key_id): Path<i64>,
) -> Result<Json<RegeneratedKey>, AppError> {
    Ok(Json(key_service::regenerate_secret(&state.pool, key_id).await?))
}

/// Request statistics for one credential.
pub async fn key_stats(
    State(state): State<AppState>,
    Path(key_id): Path<i64>,
) -> Result<Json<KeyStatistics>, AppError> {
    // 404 for unknown ids rather than an all-zero report
    key_service::get_key(&state.pool, key_id).await?;

    Ok(Json(activity_log::key_statistics(&state.pool, key_id).await?))
}
