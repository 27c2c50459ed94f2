//! Sliding-window rate limiter.
//!
//! The activity log is the counter: admission is decided by counting the
//! credential's log rows inside the trailing hour. There is no separate
//! counter store to drift out of sync, but it does mean log writes must be
//! visible before the next check (they are; inserts are awaited within the
//! request).

use chrono::{DateTime, Duration, Utc};

use crate::db::DbPool;
use crate::error::AppError;
use crate::models::activity::{NewLogEntry, RequestMeta};
use crate::models::api_key::ApiKey;
use crate::models::settings::Settings;
use crate::services::activity_log;

/// Admit or reject a request for the given credential.
///
/// The effective limit is the minimum of the credential's own hourly limit
/// and the global one. Admission requires the trailing-hour count to be
/// strictly below the limit, so an effective limit of zero always rejects.
///
/// Rejections are logged (and therefore count toward the next window).
pub async fn check_and_admit(
    pool: &DbPool,
    key: &ApiKey,
    settings: &Settings,
    meta: &RequestMeta,
    now: DateTime<Utc>,
) -> Result<(), AppError> {
    let effective_limit = key.rate_limit_hourly.min(settings.rate_limit);

    let window_start = now - Duration::hours(1);
    let request_count = activity_log::count_since(pool, key.id, window_start).await?;

    if request_count >= effective_limit {
        activity_log::record(
            pool,
            NewLogEntry::rejection(meta, Some(key.id), 429, "Rate limit exceeded"),
            now,
        )
        .await?;
        return Err(AppError::RateLimitExceeded);
    }

    Ok(())
}
