//! Webhook delivery tests against a local mock receiver.
//!
//! The dispatcher runs with a millisecond retry schedule so exhaustion
//! scenarios finish quickly. Delivery is asynchronous, so assertions poll
//! the append-only `webhook_logs` table instead of awaiting the dispatch.

mod common;

use std::time::Duration;

use chrono::Utc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{test_config, test_pool};
use pagebuilder_api::db::DbPool;
use pagebuilder_api::models::page::PageRef;
use pagebuilder_api::models::settings::Settings;
use pagebuilder_api::models::webhook::WebhookDeliveryAttempt;
use pagebuilder_api::services::webhook_service::{self, WebhookDispatcher};

fn fast_dispatcher(pool: &DbPool) -> WebhookDispatcher {
    WebhookDispatcher::spawn_with(
        pool.clone(),
        [Duration::from_millis(10); 3],
        Duration::from_secs(1),
    )
    .expect("webhook dispatcher")
}

fn webhook_settings(url: &str, secret: &str) -> Settings {
    Settings {
        webhook_enabled: true,
        webhook_url: url.to_string(),
        webhook_secret: secret.to_string(),
        ..Settings::default()
    }
}

fn sample_pages() -> Vec<PageRef> {
    vec![PageRef {
        id: 1,
        title: "About us".to_string(),
        url: "http://localhost:3000/about-us".to_string(),
        edit_url: "http://localhost:3000/admin/pages/1".to_string(),
        status: "publish".to_string(),
    }]
}

async fn attempt_count(pool: &DbPool) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM webhook_logs")
        .fetch_one(pool)
        .await
        .unwrap()
}

async fn queue_count(pool: &DbPool) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM webhook_queue")
        .fetch_one(pool)
        .await
        .unwrap()
}

async fn wait_for_attempts(pool: &DbPool, expected: i64) {
    for _ in 0..250 {
        if attempt_count(pool).await >= expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("timed out waiting for {expected} delivery attempts");
}

async fn wait_for_empty_queue(pool: &DbPool) {
    for _ in 0..250 {
        if queue_count(pool).await == 0 {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("timed out waiting for the webhook queue to drain");
}

async fn attempts(pool: &DbPool) -> Vec<WebhookDeliveryAttempt> {
    sqlx::query_as::<_, WebhookDeliveryAttempt>("SELECT * FROM webhook_logs ORDER BY id")
        .fetch_all(pool)
        .await
        .unwrap()
}

#[tokio::test]
async fn successful_delivery_is_signed_and_logged_once() {
    let pool = test_pool().await;
    let dispatcher = fast_dispatcher(&pool);
    let config = test_config();

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&server)
        .await;

    let settings = webhook_settings(&format!("{}/hook", server.uri()), "s3cret");
    webhook_service::trigger_pages_created(
        &pool,
        &dispatcher,
        &settings,
        &config,
        "req_success",
        7,
        "Deploy bot",
        &sample_pages(),
    )
    .await
    .unwrap();

    wait_for_attempts(&pool, 1).await;
    wait_for_empty_queue(&pool).await;

    // Give a spurious retry time to show up if there were one
    tokio::time::sleep(Duration::from_millis(100)).await;
    let logged = attempts(&pool).await;
    assert_eq!(logged.len(), 1);
    assert_eq!(logged[0].status_code, 200);
    assert_eq!(logged[0].retry_count, 0);
    assert!(logged[0].delivered_at.is_some());
    assert!(logged[0].error_message.is_none());

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);

    let body = std::str::from_utf8(&requests[0].body).unwrap();
    let signature = requests[0]
        .headers
        .get("x-webhook-signature")
        .and_then(|v| v.to_str().ok())
        .expect("signature header");
    assert!(webhook_service::verify_signature(body, signature, "s3cret"));
    assert_eq!(
        requests[0]
            .headers
            .get("x-request-id")
            .and_then(|v| v.to_str().ok()),
        Some("req_success")
    );

    let payload: serde_json::Value = serde_json::from_str(body).unwrap();
    assert_eq!(payload["event"], "pages_created");
    assert_eq!(payload["api_key_name"], "Deploy bot");
    assert_eq!(payload["api_key_id"], 7);
    assert_eq!(payload["total_pages"], 1);
    assert_eq!(payload["pages"][0]["title"], "About us");
}

#[tokio::test]
async fn failing_receiver_gets_three_attempts_then_gives_up() {
    let pool = test_pool().await;
    let dispatcher = fast_dispatcher(&pool);
    let config = test_config();

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let settings = webhook_settings(&server.uri(), "s3cret");
    webhook_service::trigger_pages_created(
        &pool,
        &dispatcher,
        &settings,
        &config,
        "req_retry",
        1,
        "Deploy bot",
        &sample_pages(),
    )
    .await
    .unwrap();

    wait_for_attempts(&pool, 3).await;
    wait_for_empty_queue(&pool).await;

    tokio::time::sleep(Duration::from_millis(100)).await;
    let logged = attempts(&pool).await;
    assert_eq!(logged.len(), 3);

    let counts: Vec<i64> = logged.iter().map(|a| a.retry_count).collect();
    assert_eq!(counts, vec![0, 1, 2]);
    for attempt in &logged {
        assert_eq!(attempt.status_code, 500);
        assert_eq!(attempt.error_message.as_deref(), Some("HTTP 500 received"));
        assert!(attempt.delivered_at.is_none());
        // Retries resend the exact payload and signature from the first attempt
        assert_eq!(attempt.payload, logged[0].payload);
        assert_eq!(attempt.signature, logged[0].signature);
    }
}

#[tokio::test]
async fn unreachable_receiver_logs_transport_errors() {
    let pool = test_pool().await;
    let dispatcher = fast_dispatcher(&pool);
    let config = test_config();

    // Nothing listens here; every attempt fails before an HTTP status exists
    let settings = webhook_settings("http://127.0.0.1:9/hook", "");
    webhook_service::trigger_pages_created(
        &pool,
        &dispatcher,
        &settings,
        &config,
        "req_unreachable",
        1,
        "Deploy bot",
        &sample_pages(),
    )
    .await
    .unwrap();

    wait_for_attempts(&pool, 3).await;
    wait_for_empty_queue(&pool).await;

    let logged = attempts(&pool).await;
    assert_eq!(logged.len(), 3);
    for attempt in &logged {
        assert_eq!(attempt.status_code, 0);
        assert!(attempt.error_message.is_some());
    }
}

#[tokio::test]
async fn disabled_webhooks_send_nothing() {
    let pool = test_pool().await;
    let dispatcher = fast_dispatcher(&pool);
    let config = test_config();

    let disabled = Settings {
        webhook_enabled: false,
        webhook_url: "http://127.0.0.1:9/hook".to_string(),
        ..Settings::default()
    };
    webhook_service::trigger_pages_created(
        &pool,
        &dispatcher,
        &disabled,
        &config,
        "req_disabled",
        1,
        "Deploy bot",
        &sample_pages(),
    )
    .await
    .unwrap();

    let no_url = Settings {
        webhook_enabled: true,
        webhook_url: String::new(),
        ..Settings::default()
    };
    webhook_service::trigger_pages_created(
        &pool,
        &dispatcher,
        &no_url,
        &config,
        "req_no_url",
        1,
        "Deploy bot",
        &sample_pages(),
    )
    .await
    .unwrap();

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(queue_count(&pool).await, 0);
    assert_eq!(attempt_count(&pool).await, 0);
}

#[tokio::test]
async fn empty_secret_sends_unsigned_payload() {
    let pool = test_pool().await;
    let dispatcher = fast_dispatcher(&pool);
    let config = test_config();

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let settings = webhook_settings(&server.uri(), "");
    webhook_service::trigger_pages_created(
        &pool,
        &dispatcher,
        &settings,
        &config,
        "req_unsigned",
        1,
        "Deploy bot",
        &sample_pages(),
    )
    .await
    .unwrap();

    wait_for_attempts(&pool, 1).await;

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].headers.get("x-webhook-signature").is_none());
}

#[tokio::test]
async fn persisted_deliveries_resume_at_startup() {
    let pool = test_pool().await;

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    // A delivery left behind by a previous process: one failed attempt
    // already logged, next attempt already due
    let payload = r#"{"event":"pages_created","total_pages":1}"#;
    let signature = webhook_service::sign_payload(payload, "s3cret");
    sqlx::query(
        r#"
        INSERT INTO webhook_queue (
            request_id, webhook_url, payload, signature, retry_count,
            next_attempt_at, created_at
        )
        VALUES (?, ?, ?, ?, 1, ?, ?)
        "#,
    )
    .bind("req_resumed")
    .bind(server.uri())
    .bind(payload)
    .bind(&signature)
    .bind(Utc::now())
    .bind(Utc::now())
    .execute(&pool)
    .await
    .unwrap();

    // Starting the dispatcher plays the role of process startup
    let _dispatcher = fast_dispatcher(&pool);

    wait_for_attempts(&pool, 1).await;
    wait_for_empty_queue(&pool).await;

    let logged = attempts(&pool).await;
    assert_eq!(logged.len(), 1);
    assert_eq!(logged[0].request_id, "req_resumed");
    assert_eq!(logged[0].retry_count, 1);
    assert!(logged[0].delivered_at.is_some());
}
