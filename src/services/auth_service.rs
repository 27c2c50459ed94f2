//! Authenticator: validates raw API keys against the credential store.
//!
//! Keys are verified with bcrypt, so there is no hash column to index on;
//! authentication scans every active credential and lets the verification
//! primitive do a constant-time-safe comparison per row. The public key
//! hash is unique, so at most one row can ever match.

use axum::http::HeaderMap;
use chrono::{DateTime, Utc};

use crate::db::DbPool;
use crate::error::AppError;
use crate::models::activity::{NewLogEntry, RequestMeta};
use crate::models::api_key::{ApiKey, STATUS_ACTIVE};
use crate::services::activity_log;

/// Extract the raw API key from request headers.
///
/// Header priority is fixed: `X-API-Key` wins over
/// `Authorization: Bearer <token>`; the first match is used.
pub fn extract_api_key(headers: &HeaderMap) -> Option<String> {
    if let Some(value) = headers.get("x-api-key").and_then(|v| v.to_str().ok()) {
        let value = value.trim();
        if !value.is_empty() {
            return Some(value.to_string());
        }
    }

    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Validate a raw API key against all active credentials.
///
/// # Algorithm
///
/// 1. Fetch every row with `status = 'active'`
/// 2. `bcrypt::verify` the raw value against each `api_key_hash`;
///    malformed hashes count as non-matches
/// 3. On the (unique) match: reject expired keys and keys without the
///    `create_pages` permission; otherwise return the credential
///
/// Every failure is written to the activity log with its reason before the
/// error is returned. Success logging is the request handler's job, since
/// only it knows the final response.
///
/// # Errors
///
/// - `KeyExpired`: the matched key's `expires_at` has passed
/// - `InsufficientPermissions`: the matched key cannot create pages
/// - `InvalidApiKey`: no active credential matched
pub async fn authenticate(
    pool: &DbPool,
    raw_key: &str,
    meta: &RequestMeta,
    now: DateTime<Utc>,
) -> Result<ApiKey, AppError> {
    let keys = sqlx::query_as::<_, ApiKey>("SELECT * FROM api_keys WHERE status = ?")
        .bind(STATUS_ACTIVE)
        .fetch_all(pool)
        .await?;

    for key in keys {
        if !bcrypt::verify(raw_key, &key.api_key_hash).unwrap_or(false) {
            continue;
        }

        if key.is_expired(now) {
            log_failure(pool, meta, Some(key.id), "Authentication failed: key expired", now)
                .await?;
            return Err(AppError::KeyExpired);
        }

        if !key.can_create_pages() {
            log_failure(
                pool,
                meta,
                Some(key.id),
                "Authentication failed: insufficient permissions",
                now,
            )
            .await?;
            return Err(AppError::InsufficientPermissions);
        }

        return Ok(key);
    }

    log_failure(pool, meta, None, "Authentication failed: invalid API key", now).await?;
    Err(AppError::InvalidApiKey)
}

/// Record a successful authentication on the credential.
///
/// The increment happens in a single UPDATE so concurrent requests for the
/// same credential cannot lose counts to a read-modify-write race.
pub async fn record_success(
    pool: &DbPool,
    api_key_id: i64,
    now: DateTime<Utc>,
) -> Result<(), AppError> {
    sqlx::query(
        r#"
        UPDATE api_keys
        SET request_count = request_count + 1,
            last_used = ?
        WHERE id = ?
        "#,
    )
    .bind(now)
    .bind(api_key_id)
    .execute(pool)
    .await?;

    Ok(())
}

async fn log_failure(
    pool: &DbPool,
    meta: &RequestMeta,
    api_key_id: Option<i64>,
    reason: &str,
    now: DateTime<Utc>,
) -> Result<(), AppError> {
    activity_log::record(pool, NewLogEntry::rejection(meta, api_key_id, 401, reason), now).await?;
    Ok(())
}
