//! Runtime settings document.
//!
//! These are the knobs an operator can change without restarting the
//! process. They are stored as a single JSON document in the `settings`
//! table and read fresh on each request that needs them.

use serde::{Deserialize, Serialize};

/// Runtime-tunable settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Global kill switch; when false every API request is rejected before
    /// credentials are examined
    #[serde(default = "default_api_enabled")]
    pub api_enabled: bool,

    /// Global hourly rate limit; the effective limit per credential is the
    /// minimum of this and the credential's own limit
    #[serde(default = "default_rate_limit")]
    pub rate_limit: i64,

    #[serde(default)]
    pub webhook_enabled: bool,

    /// Target URL for `pages_created` notifications; empty disables
    /// delivery even when `webhook_enabled` is set
    #[serde(default)]
    pub webhook_url: String,

    /// HMAC-SHA256 signing secret; empty means payloads go unsigned, which
    /// leaves receivers unable to verify authenticity
    #[serde(default)]
    pub webhook_secret: String,

    /// Days to keep activity and webhook log rows; 0 keeps them forever
    #[serde(default = "default_log_retention")]
    pub log_retention: i64,
}

fn default_api_enabled() -> bool {
    true
}

fn default_rate_limit() -> i64 {
    100
}

fn default_log_retention() -> i64 {
    90
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_enabled: default_api_enabled(),
            rate_limit: default_rate_limit(),
            webhook_enabled: false,
            webhook_url: String::new(),
            webhook_secret: String::new(),
            log_retention: default_log_retention(),
        }
    }
}
