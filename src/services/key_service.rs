//! Credential lifecycle operations: generate, revoke, delete, regenerate,
//! list, and the periodic expiry sweep.

use chrono::{DateTime, Duration, Utc};
use rand::distr::{Alphanumeric, SampleString};
use serde::Deserialize;

use crate::db::DbPool;
use crate::error::AppError;
use crate::models::api_key::{
    ApiKey, ApiKeySummary, GeneratedKey, PERMISSION_CREATE_PAGES, RegeneratedKey, STATUS_ACTIVE,
    STATUS_REVOKED,
};

/// Length of raw key material in alphanumeric characters. 64 characters of
/// [A-Za-z0-9] carry ~380 bits of entropy.
const RAW_KEY_LEN: usize = 64;

/// Revoked keys unused for this long are hard-deleted by the sweep.
const REVOKED_RETENTION_DAYS: i64 = 30;

const DEFAULT_RATE_LIMIT_HOURLY: i64 = 100;

/// Parameters for generating a new credential.
#[derive(Debug, Deserialize)]
pub struct GenerateKeyRequest {
    pub key_name: String,

    /// Days until the key expires; `None` means never
    pub expiration_days: Option<i64>,

    /// Per-key hourly rate limit, defaults to 100
    pub rate_limit: Option<i64>,

    /// Extra capability strings; `create_pages` is always included
    pub permissions: Option<Vec<String>>,
}

/// Generate a new credential.
///
/// # Process
///
/// 1. Validate the name
/// 2. Draw a random public/secret key pair (CSPRNG, 64 chars each)
/// 3. Store bcrypt hashes only
/// 4. Return the raw pair, the single time it will ever be available
pub async fn generate_key(
    pool: &DbPool,
    request: GenerateKeyRequest,
    user_id: Option<i64>,
    now: DateTime<Utc>,
) -> Result<GeneratedKey, AppError> {
    let key_name = request.key_name.trim().to_string();
    if key_name.is_empty() {
        return Err(AppError::InvalidData("Key name is required".to_string()));
    }

    let api_key = generate_raw_key();
    let secret_key = generate_raw_key();
    let api_key_hash = bcrypt::hash(&api_key, bcrypt::DEFAULT_COST)?;
    let secret_key_hash = bcrypt::hash(&secret_key, bcrypt::DEFAULT_COST)?;

    let expires_at = request
        .expiration_days
        .filter(|days| *days > 0)
        .map(|days| now + Duration::days(days));

    let mut permissions = vec![PERMISSION_CREATE_PAGES.to_string()];
    if let Some(extra) = request.permissions {
        for permission in extra {
            if !permissions.contains(&permission) {
                permissions.push(permission);
            }
        }
    }

    let rate_limit_hourly = request
        .rate_limit
        .filter(|limit| *limit >= 0)
        .unwrap_or(DEFAULT_RATE_LIMIT_HOURLY);

    let result = sqlx::query(
        r#"
        INSERT INTO api_keys (
            key_name,
            api_key_hash,
            secret_key_hash,
            status,
            permissions,
            created_at,
            expires_at,
            rate_limit_hourly,
            user_id
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&key_name)
    .bind(&api_key_hash)
    .bind(&secret_key_hash)
    .bind(STATUS_ACTIVE)
    .bind(serde_json::to_string(&permissions)?)
    .bind(now)
    .bind(expires_at)
    .bind(rate_limit_hourly)
    .bind(user_id)
    .execute(pool)
    .await?;

    Ok(GeneratedKey {
        id: result.last_insert_rowid(),
        key_name,
        api_key,
        secret_key,
        expires_at,
        permissions,
        rate_limit_hourly,
    })
}

/// Revoke a credential. Idempotent: revoking an already-revoked key
/// succeeds and leaves it revoked. History is kept.
pub async fn revoke_key(pool: &DbPool, key_id: i64) -> Result<(), AppError> {
    let result = sqlx::query("UPDATE api_keys SET status = ? WHERE id = ?")
        .bind(STATUS_REVOKED)
        .bind(key_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::KeyNotFound);
    }

    Ok(())
}

/// Hard-delete a credential, whatever its status. Takes effect on the very
/// next authentication attempt.
pub async fn delete_key(pool: &DbPool, key_id: i64) -> Result<(), AppError> {
    let result = sqlx::query("DELETE FROM api_keys WHERE id = ?")
        .bind(key_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::KeyNotFound);
    }

    Ok(())
}

/// Replace both key hashes of an active credential and reset its usage
/// counters. The previous raw values become permanently unverifiable.
///
/// # Errors
///
/// `KeyNotFound` when the id does not exist or the key is not active.
pub async fn regenerate_secret(
    pool: &DbPool,
    key_id: i64,
) -> Result<RegeneratedKey, AppError> {
    let key = sqlx::query_as::<_, ApiKey>("SELECT * FROM api_keys WHERE id = ? AND status = ?")
        .bind(key_id)
        .bind(STATUS_ACTIVE)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::KeyNotFound)?;

    let api_key = generate_raw_key();
    let secret_key = generate_raw_key();
    let api_key_hash = bcrypt::hash(&api_key, bcrypt::DEFAULT_COST)?;
    let secret_key_hash = bcrypt::hash(&secret_key, bcrypt::DEFAULT_COST)?;

    sqlx::query(
        r#"
        UPDATE api_keys
        SET api_key_hash = ?,
            secret_key_hash = ?,
            request_count = 0,
            last_used = NULL
        WHERE id = ? AND status = ?
        "#,
    )
    .bind(&api_key_hash)
    .bind(&secret_key_hash)
    .bind(key_id)
    .bind(STATUS_ACTIVE)
    .execute(pool)
    .await?;

    Ok(RegeneratedKey {
        id: key.id,
        key_name: key.key_name,
        api_key,
        secret_key,
    })
}

/// All credentials, newest first, without hash material.
pub async fn list_keys(pool: &DbPool) -> Result<Vec<ApiKeySummary>, AppError> {
    let keys = sqlx::query_as::<_, ApiKey>("SELECT * FROM api_keys ORDER BY created_at DESC")
        .fetch_all(pool)
        .await?;

    Ok(keys.into_iter().map(ApiKeySummary::from).collect())
}

/// Fetch one credential row.
pub async fn get_key(pool: &DbPool, key_id: i64) -> Result<ApiKey, AppError> {
    sqlx::query_as::<_, ApiKey>("SELECT * FROM api_keys WHERE id = ?")
        .bind(key_id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::KeyNotFound)
}

/// Periodic expiry sweep.
///
/// Normalizes stored state: active keys past their expiry become revoked,
/// and revoked keys unused for 30 days are hard-deleted. The authenticator
/// never trusts stored status alone, so this only exists to keep the store
/// tidy. Keys that were never used (`last_used` NULL) are kept.
pub async fn cleanup_expired_keys(pool: &DbPool, now: DateTime<Utc>) -> Result<(), AppError> {
    sqlx::query(
        r#"
        UPDATE api_keys
        SET status = ?
        WHERE status = ?
          AND expires_at IS NOT NULL
          AND expires_at < ?
        "#,
    )
    .bind(STATUS_REVOKED)
    .bind(STATUS_ACTIVE)
    .bind(now)
    .execute(pool)
    .await?;

    let delete_cutoff = now - Duration::days(REVOKED_RETENTION_DAYS);
    sqlx::query("DELETE FROM api_keys WHERE status = ? AND last_used < ?")
        .bind(STATUS_REVOKED)
        .bind(delete_cutoff)
        .execute(pool)
        .await?;

    Ok(())
}

/// Draw one raw key from the OS CSPRNG.
fn generate_raw_key() -> String {
    Alphanumeric.sample_string(&mut rand::rng(), RAW_KEY_LEN)
}
