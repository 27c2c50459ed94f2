//! Admin handlers for the audit surfaces: activity log, webhook delivery
//! log and webhook tooling.

use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::AppState;
use crate::error::AppError;
use crate::models::activity::ActivityLogEntry;
use crate::models::webhook::{DeliveryStats, WebhookDeliveryAttempt};
use crate::services::{activity_log, settings_service, webhook_service};

#[derive(Debug, Deserialize)]
pub struct LogQuery {
    pub limit: Option<i64>,
}

impl LogQuery {
    fn limit(&self) -> i64 {
        self.limit.unwrap_or(50).clamp(1, 500)
    }
}

/// Recent activity log entries, newest first.
pub async fn activity_log(
    State(state): State<AppState>,
    Query(query): Query<LogQuery>,
) -> Result<Json<Vec<ActivityLogEntry>>, AppError> {
    Ok(Json(activity_log::recent(&state.pool, query.limit()).await?))
}

/// Recent webhook delivery attempts, newest first.
pub async fn webhook_log(
    State(state): State<AppState>,
    Query(query): Query<LogQuery>,
) -> Result<Json<Vec<WebhookDeliveryAttempt>>, AppError> {
    Ok(Json(
        webhook_service::recent_attempts(&state.pool, query.limit()).await?,
    ))
}

/// Aggregate webhook delivery statistics.
pub async fn webhook_stats(
    State(state): State<AppState>,
) -> Result<Json<DeliveryStats>, AppError> {
    Ok(Json(webhook_service::delivery_stats(&state.pool).await?))
}

/// Fire a sample delivery at the configured webhook URL.
pub async fn test_webhook(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    let settings = settings_service::load(&state.pool).await?;
    let request_id = webhook_service::send_test_webhook(
        &state.pool,
        &state.dispatcher,
        &settings,
        &state.config,
    )
    .await?;

    Ok(Json(json!({ "queued": true, "request_id": request_id })))
}
