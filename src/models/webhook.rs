//! Webhook models: outbound payloads, the durable retry queue and the
//! append-only delivery log.
//!
//! # Webhook Flow
//!
//! 1. A bulk request creates at least one page
//! 2. The payload is built and signed once, then enqueued
//! 3. The dispatcher POSTs it to the configured URL
//! 4. Failures are retried on a fixed backoff schedule; every attempt is
//!    logged as its own row
//!
//! # Idempotency
//!
//! Retries resend the payload and signature computed at the first attempt
//! byte for byte, so receivers may see duplicates and should dedupe by
//! `request_id`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::models::page::PageRef;

/// Payload POSTed to the configured webhook URL.
///
/// # Example
///
/// ```json
/// {
///   "event": "pages_created",
///   "timestamp": "2025-08-01T10:30:00Z",
///   "request_id": "req_6f1a...",
///   "api_key_name": "Deploy bot",
///   "api_key_id": 3,
///   "total_pages": 2,
///   "pages": [
///     { "id": 11, "title": "About", "url": "...", "edit_url": "...", "status": "publish" }
///   ],
///   "site_url": "https://example.com",
///   "site_name": "Example"
/// }
/// ```
///
/// # Signature Verification
///
/// When a webhook secret is configured, the `X-Webhook-Signature` header
/// carries `hex(HMAC-SHA256(body, secret))`. Receivers should recompute it
/// over the raw request body and compare in constant time.
#[derive(Debug, Serialize, Deserialize)]
pub struct WebhookPayload {
    /// Event name, always `pages_created`
    pub event: String,

    /// When the payload was built (ISO-8601)
    pub timestamp: DateTime<Utc>,

    /// Correlates the delivery (and all its retries) to the triggering
    /// API request
    pub request_id: String,

    pub api_key_name: String,
    pub api_key_id: i64,
    pub total_pages: usize,
    pub pages: Vec<PageRef>,
    pub site_url: String,
    pub site_name: String,
}

/// A delivery waiting in the dispatcher, either fresh or between retries.
#[derive(Debug, Clone)]
pub struct WebhookJob {
    /// Row id in `webhook_queue`, deleted once the delivery terminates
    pub queue_id: i64,
    pub request_id: String,
    pub url: String,

    /// Payload JSON serialized once at trigger time and reused verbatim
    pub payload: String,

    /// Hex HMAC computed once at trigger time; `None` when no secret is
    /// configured
    pub signature: Option<String>,

    /// 0 for the initial attempt, 1 and 2 for retries
    pub retry_count: i64,
}

/// Persisted pending delivery, reloaded at startup so retries survive a
/// process restart.
#[derive(Debug, Clone, FromRow)]
pub struct QueuedWebhook {
    pub id: i64,
    pub request_id: String,
    pub webhook_url: String,
    pub payload: String,
    pub signature: Option<String>,
    pub retry_count: i64,
    pub next_attempt_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl QueuedWebhook {
    pub fn into_job(self) -> WebhookJob {
        WebhookJob {
            queue_id: self.id,
            request_id: self.request_id,
            url: self.webhook_url,
            payload: self.payload,
            signature: self.signature,
            retry_count: self.retry_count,
        }
    }
}

/// One delivery attempt from the append-only `webhook_logs` table.
///
/// `status_code` 0 means the request never reached the receiver (transport
/// error or timeout). `delivered_at` is set only on 2xx responses.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct WebhookDeliveryAttempt {
    pub id: i64,
    pub request_id: String,
    pub webhook_url: String,
    pub payload: Option<String>,
    pub signature: Option<String>,
    pub status_code: i64,
    pub response_body: Option<String>,
    pub error_message: Option<String>,
    pub retry_count: i64,
    pub delivered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Aggregated delivery statistics over the webhook log.
#[derive(Debug, Serialize)]
pub struct DeliveryStats {
    pub total_attempts: i64,
    pub successful: i64,
    pub failed: i64,
    pub success_rate: f64,
}
