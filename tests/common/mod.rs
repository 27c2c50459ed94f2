//! Shared helpers for the integration test suites.
//!
//! Every test gets its own in-memory SQLite database with the full
//! migration set applied, so suites never interfere with each other. The
//! pool is capped at one connection because each `sqlite::memory:`
//! connection would otherwise open a separate empty database.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::http::HeaderMap;
use sqlx::sqlite::SqlitePoolOptions;

use pagebuilder_api::config::Config;
use pagebuilder_api::db::{self, DbPool};
use pagebuilder_api::models::activity::RequestMeta;
use pagebuilder_api::services::webhook_service::WebhookDispatcher;
use pagebuilder_api::{AppState, create_app};

pub const ADMIN_TOKEN: &str = "test-admin-token";

/// Fresh in-memory database with all migrations applied.
pub async fn test_pool() -> DbPool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory database");

    db::run_migrations(&pool).await.expect("migrations");
    pool
}

pub fn test_config() -> Config {
    Config {
        admin_token: ADMIN_TOKEN.to_string(),
        ..Config::default()
    }
}

/// Application state with a dispatcher on a millisecond retry schedule, so
/// webhook tests finish in well under a second per delivery.
pub fn test_state(pool: DbPool, config: Config) -> AppState {
    let dispatcher = WebhookDispatcher::spawn_with(
        pool.clone(),
        [Duration::from_millis(20); 3],
        Duration::from_secs(2),
    )
    .expect("webhook dispatcher");

    AppState {
        pool,
        config: Arc::new(config),
        dispatcher,
    }
}

/// Full application router over a fresh database.
pub async fn test_app() -> (Router, DbPool) {
    let pool = test_pool().await;
    let state = test_state(pool.clone(), test_config());
    (create_app(state), pool)
}

/// Request metadata as the auth middleware would capture it.
pub fn request_meta() -> RequestMeta {
    RequestMeta::new("POST", "/pagebuilder/v1/create-pages", &HeaderMap::new())
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = http_body_util::BodyExt::collect(response.into_body())
        .await
        .expect("response body")
        .to_bytes();

    serde_json::from_slice(&bytes).expect("JSON response body")
}
