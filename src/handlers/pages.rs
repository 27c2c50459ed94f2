//! Bulk page-creation handler.
//!
//! `POST /pagebuilder/v1/create-pages` is the endpoint the whole service
//! exists for. By the time this handler runs, the auth middleware has
//! already authenticated the credential and admitted it past the rate
//! limiter; what remains is batch validation, page creation with per-page
//! error isolation, activity logging and the webhook trigger.

use std::time::Instant;

use axum::{Extension, Json, body::Bytes, extract::State};
use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use crate::AppState;
use crate::error::AppError;
use crate::middleware::auth::AuthContext;
use crate::models::activity::{NewLogEntry, RequestMeta};
use crate::models::page::{
    CreatePagesData, CreatePagesRequest, CreatePagesResponse, PageCreationError,
};
use crate::services::{activity_log, page_store, settings_service, webhook_service};

/// Create pages in bulk.
///
/// # Response (200)
///
/// ```json
/// {
///   "success": true,
///   "request_id": "req_6f1a...",
///   "message": "Created 2 pages, 1 failed",
///   "data": {
///     "total_requested": 3,
///     "total_created": 2,
///     "total_failed": 1,
///     "created_pages": [{ "id": 1, "title": "...", "url": "...", "edit_url": "...", "status": "publish" }],
///     "errors": [{ "index": 1, "title": "Untitled", "error": "Page title is required" }],
///     "response_time_ms": 12.34
///   }
/// }
/// ```
///
/// A page that fails validation does not abort the batch; it lands in
/// `errors` with its zero-based index while the rest proceed. The request
/// returns as soon as the activity log entry is durable; webhook delivery
/// happens on detached tasks and its outcome is never surfaced here.
///
/// The body is taken raw and parsed here rather than through the `Json`
/// extractor: by this point the request is authenticated and counted by
/// the rate limiter, so even a malformed body must produce the structured
/// error shape and an activity log entry.
pub async fn create_pages(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Extension(meta): Extension<RequestMeta>,
    body: Bytes,
) -> Result<Json<CreatePagesResponse>, AppError> {
    let start = Instant::now();
    let request_id = format!("req_{}", Uuid::new_v4().simple());

    let Ok(request) = serde_json::from_slice::<CreatePagesRequest>(&body) else {
        let error = AppError::InvalidData("No pages data provided or invalid format".to_string());
        let raw_body = Some(String::from_utf8_lossy(&body).into_owned());
        log_error(&state, &auth, &meta, raw_body, &request_id, 400, &error, start).await?;
        return Err(error);
    };

    if request.pages.is_empty() {
        let error = AppError::InvalidData("No pages data provided or invalid format".to_string());
        let logged = serde_json::to_string(&request).ok();
        log_error(&state, &auth, &meta, logged, &request_id, 400, &error, start).await?;
        return Err(error);
    }

    let max_pages = state.config.max_pages_per_request;
    if request.pages.len() > max_pages {
        let error = AppError::TooManyPages(max_pages);
        let logged = serde_json::to_string(&request).ok();
        log_error(&state, &auth, &meta, logged, &request_id, 400, &error, start).await?;
        return Err(error);
    }

    let now = Utc::now();
    let mut created_pages = Vec::new();
    let mut errors = Vec::new();

    for (index, input) in request.pages.iter().enumerate() {
        match page_store::create_page(&state.pool, &state.config, input, auth.api_key_id, now)
            .await?
        {
            Ok(page) => created_pages.push(page),
            Err(e) => errors.push(PageCreationError {
                index,
                title: if input.title.trim().is_empty() {
                    "Untitled".to_string()
                } else {
                    input.title.clone()
                },
                error: e.to_string(),
            }),
        }
    }

    let response = CreatePagesResponse {
        success: true,
        request_id: request_id.clone(),
        message: format!(
            "Created {} pages, {} failed",
            created_pages.len(),
            errors.len()
        ),
        data: CreatePagesData {
            total_requested: request.pages.len(),
            total_created: created_pages.len(),
            total_failed: errors.len(),
            created_pages,
            errors,
            response_time_ms: elapsed_ms(start),
        },
    };

    // The log row must be visible before the response leaves; the rate
    // limiter counts it for the next request in the window.
    activity_log::record(
        &state.pool,
        NewLogEntry {
            api_key_id: Some(auth.api_key_id),
            endpoint: meta.endpoint.clone(),
            method: meta.method.clone(),
            status_code: 200,
            request_body: serde_json::to_string(&request).ok(),
            response_body: serde_json::to_string(&response).ok(),
            pages_created: response.data.total_created as i64,
            response_time_ms: Some(response.data.response_time_ms),
            ip_address: meta.ip_address.clone(),
            user_agent: meta.user_agent.clone(),
        },
        Utc::now(),
    )
    .await?;

    if !response.data.created_pages.is_empty() {
        let settings = settings_service::load(&state.pool).await?;
        if let Err(e) = webhook_service::trigger_pages_created(
            &state.pool,
            &state.dispatcher,
            &settings,
            &state.config,
            &request_id,
            auth.api_key_id,
            &auth.key_name,
            &response.data.created_pages,
        )
        .await
        {
            // Delivery problems are internal; the caller's request succeeded
            tracing::error!(request_id = %request_id, "Failed to trigger webhook: {:?}", e);
        }
    }

    Ok(Json(response))
}

/// Log a rejected batch before surfacing the error to the caller.
#[allow(clippy::too_many_arguments)]
async fn log_error(
    state: &AppState,
    auth: &AuthContext,
    meta: &RequestMeta,
    request_body: Option<String>,
    request_id: &str,
    status_code: i64,
    error: &AppError,
    start: Instant,
) -> Result<(), AppError> {
    let response_body = json!({
        "success": false,
        "request_id": request_id,
        "error": { "message": error.to_string() },
        "response_time_ms": elapsed_ms(start)
    });

    activity_log::record(
        &state.pool,
        NewLogEntry {
            api_key_id: Some(auth.api_key_id),
            endpoint: meta.endpoint.clone(),
            method: meta.method.clone(),
            status_code,
            request_body,
            response_body: Some(response_body.to_string()),
            pages_created: 0,
            response_time_ms: Some(elapsed_ms(start)),
            ip_address: meta.ip_address.clone(),
            user_agent: meta.user_agent.clone(),
        },
        Utc::now(),
    )
    .await?;

    Ok(())
}

fn elapsed_ms(start: Instant) -> f64 {
    (start.elapsed().as_secs_f64() * 1000.0 * 100.0).round() / 100.0
}
