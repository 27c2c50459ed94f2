//! Webhook dispatcher: builds signed payloads and delivers them with
//! bounded retries.
//!
//! # Delivery lifecycle
//!
//! `Pending -> Sent` on a 2xx response, otherwise
//! `Pending -> Failed -> Scheduled -> Pending -> ...` until either a
//! success or the retry budget (3 total attempts) is exhausted.
//!
//! # Durability
//!
//! A pending delivery is a row in `webhook_queue` from enqueue until it
//! terminates. The dispatcher reloads those rows at startup, so retries
//! survive a process restart instead of living only in timers.
//!
//! # Decoupling
//!
//! Callers enqueue and move on; delivery and retries run on detached tokio
//! tasks fed by an mpsc channel. A delivery failure is never surfaced to
//! the API caller that triggered it.

use std::time::Duration as StdDuration;

use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::config::Config;
use crate::db::DbPool;
use crate::error::AppError;
use crate::models::page::PageRef;
use crate::models::settings::Settings;
use crate::models::webhook::{
    DeliveryStats, QueuedWebhook, WebhookDeliveryAttempt, WebhookJob, WebhookPayload,
};

type HmacSha256 = Hmac<Sha256>;

/// Retries allowed after the initial attempt (3 total attempts).
const MAX_RETRIES: i64 = 2;

/// Backoff schedule; retry n waits `RETRY_DELAYS[n - 1]`.
const RETRY_DELAYS: [StdDuration; 3] = [
    StdDuration::from_secs(5),
    StdDuration::from_secs(30),
    StdDuration::from_secs(90),
];

/// Per-attempt HTTP timeout. A timed-out attempt is a failure like any
/// other and feeds the same retry logic.
const DELIVERY_TIMEOUT: StdDuration = StdDuration::from_secs(10);

/// Handle for enqueuing deliveries. Cloneable; all clones feed the same
/// worker task.
#[derive(Clone)]
pub struct WebhookDispatcher {
    tx: mpsc::UnboundedSender<WebhookJob>,
}

impl WebhookDispatcher {
    /// Spawn the dispatcher with the production schedule and timeout.
    pub fn spawn(pool: DbPool) -> Result<Self, AppError> {
        Self::spawn_with(pool, RETRY_DELAYS, DELIVERY_TIMEOUT)
    }

    /// Spawn the dispatcher with an explicit schedule and timeout.
    ///
    /// Recovers any deliveries persisted in `webhook_queue` before
    /// processing new ones.
    pub fn spawn_with(
        pool: DbPool,
        retry_delays: [StdDuration; 3],
        timeout: StdDuration,
    ) -> Result<Self, AppError> {
        let (tx, mut rx) = mpsc::unbounded_channel::<WebhookJob>();
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        let recovery_tx = tx.clone();
        let worker_pool = pool.clone();
        tokio::spawn(async move {
            if let Err(e) = resume_pending(&worker_pool, &recovery_tx).await {
                tracing::error!("Failed to resume pending webhook deliveries: {:?}", e);
            }

            while let Some(job) = rx.recv().await {
                tokio::spawn(process_job(
                    worker_pool.clone(),
                    client.clone(),
                    retry_delays,
                    job,
                ));
            }
        });

        Ok(Self { tx })
    }

    /// Hand a job to the worker. Fire-and-forget; if the worker is gone
    /// the job stays in `webhook_queue` for the next startup recovery.
    pub fn dispatch(&self, job: WebhookJob) {
        if self.tx.send(job).is_err() {
            tracing::error!("Webhook worker is not running; delivery deferred to next startup");
        }
    }
}

/// Trigger a `pages_created` notification.
///
/// Does nothing unless webhooks are enabled with a non-empty URL. The
/// payload is serialized and signed exactly once here; retries reuse both
/// verbatim, so receivers can dedupe duplicate deliveries by `request_id`.
pub async fn trigger_pages_created(
    pool: &DbPool,
    dispatcher: &WebhookDispatcher,
    settings: &Settings,
    config: &Config,
    request_id: &str,
    api_key_id: i64,
    api_key_name: &str,
    pages: &[PageRef],
) -> Result<(), AppError> {
    if !settings.webhook_enabled || settings.webhook_url.is_empty() {
        return Ok(());
    }

    let payload = WebhookPayload {
        event: "pages_created".to_string(),
        timestamp: Utc::now(),
        request_id: request_id.to_string(),
        api_key_name: api_key_name.to_string(),
        api_key_id,
        total_pages: pages.len(),
        pages: pages.to_vec(),
        site_url: config.site_url.clone(),
        site_name: config.site_name.clone(),
    };
    let body = serde_json::to_string(&payload)?;

    let signature = if settings.webhook_secret.is_empty() {
        None
    } else {
        Some(sign_payload(&body, &settings.webhook_secret))
    };

    let now = Utc::now();
    let result = sqlx::query(
        r#"
        INSERT INTO webhook_queue (
            request_id,
            webhook_url,
            payload,
            signature,
            retry_count,
            next_attempt_at,
            created_at
        )
        VALUES (?, ?, ?, ?, 0, ?, ?)
        "#,
    )
    .bind(request_id)
    .bind(&settings.webhook_url)
    .bind(&body)
    .bind(&signature)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    dispatcher.dispatch(WebhookJob {
        queue_id: result.last_insert_rowid(),
        request_id: request_id.to_string(),
        url: settings.webhook_url.clone(),
        payload: body,
        signature,
        retry_count: 0,
    });

    Ok(())
}

/// Send a throwaway sample payload to the configured URL so operators can
/// verify their receiver end to end.
pub async fn send_test_webhook(
    pool: &DbPool,
    dispatcher: &WebhookDispatcher,
    settings: &Settings,
    config: &Config,
) -> Result<String, AppError> {
    if settings.webhook_url.is_empty() {
        return Err(AppError::InvalidData("Webhook URL is not set".to_string()));
    }

    let request_id = format!("test_{}", Uuid::new_v4().simple());
    let base = config.site_url.trim_end_matches('/');
    let pages = vec![
        PageRef {
            id: 999,
            title: "Test Page 1".to_string(),
            url: format!("{base}/test-page-1"),
            edit_url: format!("{base}/admin/pages/999"),
            status: "publish".to_string(),
        },
        PageRef {
            id: 1000,
            title: "Test Page 2".to_string(),
            url: format!("{base}/test-page-2"),
            edit_url: format!("{base}/admin/pages/1000"),
            status: "publish".to_string(),
        },
    ];

    let mut test_settings = settings.clone();
    test_settings.webhook_enabled = true;

    trigger_pages_created(
        pool,
        dispatcher,
        &test_settings,
        config,
        &request_id,
        0,
        "Test",
        &pages,
    )
    .await?;

    Ok(request_id)
}

/// HMAC-SHA256 signature over the serialized payload, hex encoded.
pub fn sign_payload(payload: &str, secret: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(payload.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Constant-time verification of a received signature, for receivers (and
/// tests) checking `X-Webhook-Signature`.
pub fn verify_signature(payload: &str, signature: &str, secret: &str) -> bool {
    let Ok(raw) = hex::decode(signature) else {
        return false;
    };

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(payload.as_bytes());
    mac.verify_slice(&raw).is_ok()
}

/// Most recent delivery attempts, newest first.
pub async fn recent_attempts(
    pool: &DbPool,
    limit: i64,
) -> Result<Vec<WebhookDeliveryAttempt>, AppError> {
    let attempts = sqlx::query_as::<_, WebhookDeliveryAttempt>(
        "SELECT * FROM webhook_logs ORDER BY id DESC LIMIT ?",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(attempts)
}

/// Aggregate delivery statistics over the whole webhook log.
pub async fn delivery_stats(pool: &DbPool) -> Result<DeliveryStats, AppError> {
    let total_attempts: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM webhook_logs")
        .fetch_one(pool)
        .await?;

    let successful: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM webhook_logs WHERE status_code BETWEEN 200 AND 299",
    )
    .fetch_one(pool)
    .await?;

    let failed = total_attempts - successful;
    let success_rate = if total_attempts > 0 {
        (successful as f64 / total_attempts as f64 * 1000.0).round() / 10.0
    } else {
        0.0
    };

    Ok(DeliveryStats {
        total_attempts,
        successful,
        failed,
        success_rate,
    })
}

/// Re-schedule every persisted pending delivery, honoring whatever wait
/// remains on its `next_attempt_at`.
async fn resume_pending(
    pool: &DbPool,
    tx: &mpsc::UnboundedSender<WebhookJob>,
) -> Result<(), AppError> {
    let pending = sqlx::query_as::<_, QueuedWebhook>("SELECT * FROM webhook_queue ORDER BY id")
        .fetch_all(pool)
        .await?;

    if pending.is_empty() {
        return Ok(());
    }

    tracing::info!("Resuming {} pending webhook deliveries", pending.len());
    let now = Utc::now();

    for row in pending {
        let delay = (row.next_attempt_at - now)
            .to_std()
            .unwrap_or(StdDuration::ZERO);
        let tx = tx.clone();

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(row.into_job());
        });
    }

    Ok(())
}

/// Drive one delivery to a terminal state, sleeping between attempts.
async fn process_job(
    pool: DbPool,
    client: reqwest::Client,
    retry_delays: [StdDuration; 3],
    mut job: WebhookJob,
) {
    loop {
        let delivered = match attempt_delivery(&pool, &client, &job).await {
            Ok(delivered) => delivered,
            Err(e) => {
                tracing::error!(
                    request_id = %job.request_id,
                    "Failed to record webhook attempt: {:?}",
                    e
                );
                false
            }
        };

        if delivered {
            finish_job(&pool, job.queue_id).await;
            return;
        }

        if job.retry_count >= MAX_RETRIES {
            tracing::warn!(
                request_id = %job.request_id,
                "Webhook delivery exhausted after {} attempts",
                job.retry_count + 1
            );
            finish_job(&pool, job.queue_id).await;
            return;
        }

        let delay = retry_delays[job.retry_count as usize];
        job.retry_count += 1;

        let next_attempt_at = Utc::now()
            + Duration::from_std(delay).unwrap_or_else(|_| Duration::seconds(90));
        if let Err(e) = sqlx::query(
            "UPDATE webhook_queue SET retry_count = ?, next_attempt_at = ? WHERE id = ?",
        )
        .bind(job.retry_count)
        .bind(next_attempt_at)
        .bind(job.queue_id)
        .execute(&pool)
        .await
        {
            tracing::error!("Failed to persist webhook retry state: {:?}", e);
        }

        tokio::time::sleep(delay).await;
    }
}

/// Perform one HTTP POST and append the attempt to the delivery log.
///
/// Returns whether the receiver answered 2xx. Transport errors are logged
/// with status_code 0.
async fn attempt_delivery(
    pool: &DbPool,
    client: &reqwest::Client,
    job: &WebhookJob,
) -> Result<bool, AppError> {
    let mut request = client
        .post(&job.url)
        .header("Content-Type", "application/json")
        .header("X-Request-ID", &job.request_id);

    if let Some(signature) = &job.signature {
        request = request.header("X-Webhook-Signature", signature);
    }

    let response = request.body(job.payload.clone()).send().await;

    let (status_code, response_body, error_message, delivered_at) = match response {
        Ok(resp) => {
            let status = i64::from(resp.status().as_u16());
            let body = resp.text().await.ok();
            if (200..300).contains(&status) {
                (status, body, None, Some(Utc::now()))
            } else {
                (status, body, Some(format!("HTTP {status} received")), None)
            }
        }
        Err(e) => {
            tracing::error!(
                request_id = %job.request_id,
                "Webhook request to {} failed: {}",
                job.url,
                e
            );
            (0, None, Some(e.to_string()), None)
        }
    };

    sqlx::query(
        r#"
        INSERT INTO webhook_logs (
            request_id,
            webhook_url,
            payload,
            signature,
            status_code,
            response_body,
            error_message,
            retry_count,
            delivered_at,
            created_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&job.request_id)
    .bind(&job.url)
    .bind(&job.payload)
    .bind(&job.signature)
    .bind(status_code)
    .bind(&response_body)
    .bind(&error_message)
    .bind(job.retry_count)
    .bind(delivered_at)
    .bind(Utc::now())
    .execute(pool)
    .await?;

    Ok(delivered_at.is_some())
}

/// Remove the queue row for a terminated delivery (sent or exhausted).
async fn finish_job(pool: &DbPool, queue_id: i64) {
    if let Err(e) = sqlx::query("DELETE FROM webhook_queue WHERE id = ?")
        .bind(queue_id)
        .execute(pool)
        .await
    {
        tracing::error!("Failed to remove finished webhook job: {:?}", e);
    }
}
