//! Admin handlers for runtime settings (the config provider).

use axum::{Json, extract::State};

use crate::AppState;
use crate::error::AppError;
use crate::models::settings::Settings;
use crate::services::settings_service;

/// Current runtime settings.
pub async fn get_settings(State(state): State<AppState>) -> Result<Json<Settings>, AppError> {
    Ok(Json(settings_service::load(&state.pool).await?))
}

/// Replace the runtime settings document.
///
/// Takes effect on the next request; nothing is cached per process.
pub async fn update_settings(
    State(state): State<AppState>,
    Json(settings): Json<Settings>,
) -> Result<Json<Settings>, AppError> {
    settings_service::save(&state.pool, &settings).await?;

    Ok(Json(settings))
}
