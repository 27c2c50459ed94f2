//! Activity logger.
//!
//! Records every authenticated or rejected API request as an append-only
//! row. The rate limiter counts these rows, so [`record`] is always awaited
//! inside the request before the response is produced; nothing is buffered.

use chrono::{DateTime, Duration, Utc};

use crate::db::DbPool;
use crate::error::AppError;
use crate::models::activity::{ActivityLogEntry, KeyStatistics, NewLogEntry};

/// Insert one log row with the given timestamp. Returns the row id.
pub async fn record(
    pool: &DbPool,
    entry: NewLogEntry,
    now: DateTime<Utc>,
) -> Result<i64, AppError> {
    let result = sqlx::query(
        r#"
        INSERT INTO activity_logs (
            api_key_id,
            endpoint,
            method,
            status_code,
            request_body,
            response_body,
            pages_created,
            response_time_ms,
            ip_address,
            user_agent,
            created_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(entry.api_key_id)
    .bind(&entry.endpoint)
    .bind(&entry.method)
    .bind(entry.status_code)
    .bind(&entry.request_body)
    .bind(&entry.response_body)
    .bind(entry.pages_created)
    .bind(entry.response_time_ms)
    .bind(&entry.ip_address)
    .bind(&entry.user_agent)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Count log rows for a credential newer than `cutoff`. This is the
/// sliding-window counter the rate limiter runs on.
pub async fn count_since(
    pool: &DbPool,
    api_key_id: i64,
    cutoff: DateTime<Utc>,
) -> Result<i64, AppError> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM activity_logs WHERE api_key_id = ? AND created_at > ?",
    )
    .bind(api_key_id)
    .bind(cutoff)
    .fetch_one(pool)
    .await?;

    Ok(count)
}

/// Most recent log entries, newest first.
pub async fn recent(pool: &DbPool, limit: i64) -> Result<Vec<ActivityLogEntry>, AppError> {
    let entries = sqlx::query_as::<_, ActivityLogEntry>(
        "SELECT * FROM activity_logs ORDER BY id DESC LIMIT ?",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(entries)
}

/// Aggregate request statistics for one credential.
pub async fn key_statistics(pool: &DbPool, api_key_id: i64) -> Result<KeyStatistics, AppError> {
    let total_requests: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM activity_logs WHERE api_key_id = ?")
            .bind(api_key_id)
            .fetch_one(pool)
            .await?;

    let successful_requests: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM activity_logs
         WHERE api_key_id = ? AND status_code BETWEEN 200 AND 299",
    )
    .bind(api_key_id)
    .fetch_one(pool)
    .await?;

    let failed_requests: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM activity_logs WHERE api_key_id = ? AND status_code >= 400",
    )
    .bind(api_key_id)
    .fetch_one(pool)
    .await?;

    let total_pages_created: Option<i64> = sqlx::query_scalar(
        "SELECT SUM(pages_created) FROM activity_logs WHERE api_key_id = ?",
    )
    .bind(api_key_id)
    .fetch_one(pool)
    .await?;

    let avg_response_time_ms: Option<f64> = sqlx::query_scalar(
        "SELECT AVG(response_time_ms) FROM activity_logs
         WHERE api_key_id = ? AND response_time_ms > 0",
    )
    .bind(api_key_id)
    .fetch_one(pool)
    .await?;

    Ok(KeyStatistics {
        total_requests,
        successful_requests,
        failed_requests,
        total_pages_created: total_pages_created.unwrap_or(0),
        avg_response_time_ms: avg_response_time_ms.unwrap_or(0.0),
    })
}

/// Delete activity and webhook log rows older than the retention window.
///
/// `retention_days` of zero (or less) keeps everything.
pub async fn cleanup_old_logs(
    pool: &DbPool,
    retention_days: i64,
    now: DateTime<Utc>,
) -> Result<(), AppError> {
    if retention_days <= 0 {
        return Ok(());
    }

    let cutoff = now - Duration::days(retention_days);

    sqlx::query("DELETE FROM activity_logs WHERE created_at < ?")
        .bind(cutoff)
        .execute(pool)
        .await?;

    sqlx::query("DELETE FROM webhook_logs WHERE created_at < ?")
        .bind(cutoff)
        .execute(pool)
        .await?;

    Ok(())
}
