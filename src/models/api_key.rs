//! API credential model.
//!
//! Credentials are public/secret key pairs identifying external callers.
//! Only bcrypt hashes of the key material are stored; the raw values are
//! handed to the caller once at generation time and never persisted.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Capability required to call the bulk page-creation endpoint.
pub const PERMISSION_CREATE_PAGES: &str = "create_pages";

/// Credential status for keys that may authenticate.
pub const STATUS_ACTIVE: &str = "active";

/// Credential status for keys that were revoked. Expiry is not a stored
/// status; it is derived from `expires_at` at authentication time.
pub const STATUS_REVOKED: &str = "revoked";

/// Represents an API credential row from the database.
///
/// # Database Table
///
/// Maps to the `api_keys` table. `api_key_hash` is unique across all rows,
/// so at most one credential can match a given raw key.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ApiKey {
    pub id: i64,

    /// Human-readable label for this credential
    pub key_name: String,

    /// bcrypt hash of the public key presented on requests
    pub api_key_hash: String,

    /// bcrypt hash of the secret key (reserved for signed-request schemes)
    pub secret_key_hash: String,

    /// `active` or `revoked`
    pub status: String,

    /// JSON array of capability strings, e.g. `["create_pages"]`
    pub permissions: String,

    pub created_at: DateTime<Utc>,

    /// When this key stops authenticating; `None` means never
    pub expires_at: Option<DateTime<Utc>>,

    /// Timestamp of the most recent successful authentication
    pub last_used: Option<DateTime<Utc>>,

    /// Total successful authentications, incremented atomically in SQL
    pub request_count: i64,

    /// Per-key request budget for the sliding hour window
    pub rate_limit_hourly: i64,

    /// Identity that created the key (lookup only, may be absent)
    pub user_id: Option<i64>,
}

impl ApiKey {
    /// Whether the key's expiry date has passed.
    ///
    /// Always evaluated against `expires_at` directly so that keys whose
    /// stored status has not yet been swept still fail authentication.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        matches!(self.expires_at, Some(expires_at) if expires_at <= now)
    }

    /// Parse the stored permissions JSON.
    ///
    /// Unparseable rows yield an empty set, which fails the permission
    /// check rather than granting access.
    pub fn permission_list(&self) -> Vec<String> {
        serde_json::from_str(&self.permissions).unwrap_or_default()
    }

    /// Whether this credential may invoke the bulk page-creation action.
    pub fn can_create_pages(&self) -> bool {
        self.permission_list()
            .iter()
            .any(|p| p == PERMISSION_CREATE_PAGES)
    }
}

/// Credential metadata exposed to the admin API. Hashes never leave the
/// store.
#[derive(Debug, Serialize)]
pub struct ApiKeySummary {
    pub id: i64,
    pub key_name: String,
    pub status: String,
    pub permissions: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub last_used: Option<DateTime<Utc>>,
    pub request_count: i64,
    pub rate_limit_hourly: i64,
    pub user_id: Option<i64>,
}

impl From<ApiKey> for ApiKeySummary {
    fn from(key: ApiKey) -> Self {
        let permissions = key.permission_list();
        Self {
            id: key.id,
            key_name: key.key_name,
            status: key.status,
            permissions,
            created_at: key.created_at,
            expires_at: key.expires_at,
            last_used: key.last_used,
            request_count: key.request_count,
            rate_limit_hourly: key.rate_limit_hourly,
            user_id: key.user_id,
        }
    }
}

/// Raw key material returned exactly once after generation.
///
/// # Security
///
/// This is the only moment the raw `api_key` and `secret_key` exist outside
/// the caller's hands; the store keeps hashes only and cannot re-derive
/// them.
#[derive(Debug, Serialize)]
pub struct GeneratedKey {
    pub id: i64,
    pub key_name: String,
    pub api_key: String,
    pub secret_key: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub permissions: Vec<String>,
    pub rate_limit_hourly: i64,
}

/// Raw secret returned exactly once after regeneration.
#[derive(Debug, Serialize)]
pub struct RegeneratedKey {
    pub id: i64,
    pub key_name: String,
    pub api_key: String,
    pub secret_key: String,
}
