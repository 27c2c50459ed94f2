//! API key authentication middleware.
//!
//! Intercepts every protected request to:
//! 1. Check the global API kill switch
//! 2. Extract the raw key from `X-API-Key` or `Authorization: Bearer`
//! 3. Authenticate it against the credential store
//! 4. Enforce the sliding-window rate limit
//! 5. Record the usage atomically and inject context for the handler
//!
//! Every rejection is written to the activity log before the error
//! response leaves, so the audit trail covers failed requests too.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use chrono::Utc;

use crate::AppState;
use crate::error::AppError;
use crate::models::activity::{NewLogEntry, RequestMeta};
use crate::services::{activity_log, auth_service, rate_limiter, settings_service};

/// Authentication context attached to authenticated requests.
///
/// Inserted into the request's extension map; handlers extract it with
/// `Extension<AuthContext>` to know which credential made the request.
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// ID of the authenticated credential
    pub api_key_id: i64,

    /// Label of the credential, used in webhook payloads
    pub key_name: String,
}

/// API key authentication middleware function.
///
/// # Flow
///
/// 1. Capture request metadata (endpoint, method, client IP, user agent)
/// 2. Reject everything while the API is globally disabled
/// 3. Reject requests carrying no key at all
/// 4. Authenticate, then rate-limit (both log their own rejections)
/// 5. Atomically bump the credential's usage counters
/// 6. Inject [`AuthContext`] and [`RequestMeta`] and call the next handler
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let meta = RequestMeta::new(
        request.method().as_str(),
        request.uri().path(),
        request.headers(),
    );
    let now = Utc::now();

    // Global kill switch comes before any credential handling
    let settings = settings_service::load(&state.pool).await?;
    if !settings.api_enabled {
        activity_log::record(
            &state.pool,
            NewLogEntry::rejection(&meta, None, 403, "The API is currently disabled"),
            now,
        )
        .await?;
        return Err(AppError::ApiDisabled);
    }

    let Some(raw_key) = auth_service::extract_api_key(request.headers()) else {
        activity_log::record(
            &state.pool,
            NewLogEntry::rejection(&meta, None, 401, "API key is required"),
            now,
        )
        .await?;
        return Err(AppError::MissingApiKey);
    };

    let key = auth_service::authenticate(&state.pool, &raw_key, &meta, now).await?;

    rate_limiter::check_and_admit(&state.pool, &key, &settings, &meta, now).await?;

    auth_service::record_success(&state.pool, key.id, now).await?;

    let auth_context = AuthContext {
        api_key_id: key.id,
        key_name: key.key_name,
    };
    request.extensions_mut().insert(auth_context);
    request.extensions_mut().insert(meta);

    Ok(next.run(request).await)
}
