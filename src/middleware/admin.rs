//! Admin route protection.
//!
//! The credential-lifecycle and settings endpoints are operator-facing,
//! not part of the public API surface, and are gated by a static bearer
//! token from the environment. An empty configured token disables the
//! admin surface entirely.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::AppState;
use crate::error::AppError;

/// Require `Authorization: Bearer <ADMIN_TOKEN>` on admin routes.
pub async fn admin_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = request
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match token {
        Some(token) if !state.config.admin_token.is_empty() && token == state.config.admin_token => {
            Ok(next.run(request).await)
        }
        _ => Err(AppError::Unauthorized),
    }
}
