//! Runtime settings storage (the key-value config provider).
//!
//! Settings are one JSON document in the `settings` table under a fixed
//! key. Absent or unparseable rows fall back to defaults, so a fresh
//! database starts with the API enabled and webhooks off.

use crate::db::DbPool;
use crate::error::AppError;
use crate::models::settings::Settings;

const SETTINGS_KEY: &str = "settings";

/// Load the current settings, falling back to defaults when unset.
pub async fn load(pool: &DbPool) -> Result<Settings, AppError> {
    let value: Option<String> =
        sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
            .bind(SETTINGS_KEY)
            .fetch_optional(pool)
            .await?;

    Ok(value
        .and_then(|v| serde_json::from_str(&v).ok())
        .unwrap_or_default())
}

/// Persist the settings document, replacing any previous version.
///
/// # Validation
///
/// A non-empty `webhook_url` must be a valid http/https URL; everything
/// else is accepted as-is.
pub async fn save(pool: &DbPool, settings: &Settings) -> Result<(), AppError> {
    if !settings.webhook_url.is_empty() {
        validate_webhook_url(&settings.webhook_url)?;
    }

    let value = serde_json::to_string(settings)?;

    sqlx::query(
        r#"
        INSERT INTO settings (key, value)
        VALUES (?, ?)
        ON CONFLICT (key) DO UPDATE SET value = excluded.value
        "#,
    )
    .bind(SETTINGS_KEY)
    .bind(value)
    .execute(pool)
    .await?;

    Ok(())
}

/// Validate a webhook target URL.
///
/// # Rules
///
/// - Must parse as a URL
/// - Must use http or https
/// - Maximum 2048 characters
fn validate_webhook_url(url: &str) -> Result<(), AppError> {
    if url.len() > 2048 {
        return Err(AppError::InvalidData(
            "Webhook URL exceeds 2048 characters".to_string(),
        ));
    }

    let parsed = url::Url::parse(url)
        .map_err(|_| AppError::InvalidData("Invalid webhook URL format".to_string()))?;

    match parsed.scheme() {
        "http" | "https" => Ok(()),
        _ => Err(AppError::InvalidData(
            "Webhook URL must use HTTP or HTTPS".to_string(),
        )),
    }
}
