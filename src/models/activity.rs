//! Activity log models.
//!
//! Every authenticated or rejected API request leaves one append-only row
//! here. The log doubles as the rate-limit state: the limiter counts rows
//! for a credential inside the trailing hour.

use axum::http::HeaderMap;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;

/// An activity log row. Never mutated after insert.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct ActivityLogEntry {
    pub id: i64,

    /// Credential the request authenticated as; `None` for pre-auth
    /// failures such as a missing or unrecognized key
    pub api_key_id: Option<i64>,

    pub endpoint: String,
    pub method: String,
    pub status_code: i64,
    pub request_body: Option<String>,
    pub response_body: Option<String>,
    pub pages_created: i64,
    pub response_time_ms: Option<f64>,
    pub ip_address: String,
    pub user_agent: String,
    pub created_at: DateTime<Utc>,
}

/// Fields for a new activity log row; `created_at` is bound at insert time.
#[derive(Debug, Clone)]
pub struct NewLogEntry {
    pub api_key_id: Option<i64>,
    pub endpoint: String,
    pub method: String,
    pub status_code: i64,
    pub request_body: Option<String>,
    pub response_body: Option<String>,
    pub pages_created: i64,
    pub response_time_ms: Option<f64>,
    pub ip_address: String,
    pub user_agent: String,
}

impl NewLogEntry {
    /// Build a rejection entry with a `{"success":false,"message":...}`
    /// response body, the shape auth failures have always been logged with.
    pub fn rejection(
        meta: &RequestMeta,
        api_key_id: Option<i64>,
        status_code: i64,
        message: &str,
    ) -> Self {
        Self {
            api_key_id,
            endpoint: meta.endpoint.clone(),
            method: meta.method.clone(),
            status_code,
            request_body: None,
            response_body: Some(
                json!({
                    "success": false,
                    "message": message
                })
                .to_string(),
            ),
            pages_created: 0,
            response_time_ms: None,
            ip_address: meta.ip_address.clone(),
            user_agent: meta.user_agent.clone(),
        }
    }
}

/// Request metadata captured once by the auth middleware and shared with
/// every component that logs.
#[derive(Debug, Clone)]
pub struct RequestMeta {
    pub endpoint: String,
    pub method: String,
    pub ip_address: String,
    pub user_agent: String,
}

impl RequestMeta {
    pub fn new(method: &str, endpoint: &str, headers: &HeaderMap) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            method: method.to_string(),
            ip_address: client_ip(headers),
            user_agent: headers
                .get("user-agent")
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string(),
        }
    }
}

/// Best-effort client IP from proxy headers.
///
/// Checks `X-Forwarded-For` (first valid entry) then `X-Real-IP`; entries
/// that do not parse as an IP address are skipped.
fn client_ip(headers: &HeaderMap) -> String {
    for header in ["x-forwarded-for", "x-real-ip"] {
        if let Some(value) = headers.get(header).and_then(|v| v.to_str().ok()) {
            for candidate in value.split(',') {
                let candidate = candidate.trim();
                if candidate.parse::<std::net::IpAddr>().is_ok() {
                    return candidate.to_string();
                }
            }
        }
    }

    "0.0.0.0".to_string()
}

/// Aggregated request statistics for one credential.
#[derive(Debug, Serialize)]
pub struct KeyStatistics {
    pub total_requests: i64,
    pub successful_requests: i64,
    pub failed_requests: i64,
    pub total_pages_created: i64,
    pub avg_response_time_ms: f64,
}
