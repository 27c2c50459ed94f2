//! REST API for bulk page creation.
//!
//! An HTTP service exposing a WordPress-style page-creation endpoint
//! protected by hashed API keys, a sliding-window rate limit and an
//! activity audit trail, with signed webhook notifications delivered
//! asynchronously with durable retries.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{delete, get, post},
};
use chrono::Utc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;

use config::Config;
use db::DbPool;
use middleware::{admin::admin_middleware, auth::auth_middleware};
use services::webhook_service::WebhookDispatcher;
use services::{activity_log, key_service, settings_service};

/// Shared application state handed to every handler and middleware.
#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub config: Arc<Config>,
    pub dispatcher: WebhookDispatcher,
}

/// Build the application router.
///
/// # Route map
///
/// Public:
/// - `GET /pagebuilder/v1/health`
///
/// API-key protected:
/// - `POST /pagebuilder/v1/create-pages`
///
/// Admin-token protected (everything under `/admin`):
/// - credential lifecycle, settings, activity and webhook logs
pub fn create_app(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/pagebuilder/v1/create-pages", post(handlers::pages::create_pages))
        .route_layer(from_fn_with_state(state.clone(), auth_middleware));

    let admin_routes = Router::new()
        .route(
            "/admin/api-keys",
            post(handlers::keys::generate_key).get(handlers::keys::list_keys),
        )
        .route("/admin/api-keys/{id}", delete(handlers::keys::delete_key))
        .route("/admin/api-keys/{id}/revoke", post(handlers::keys::revoke_key))
        .route(
            "/admin/api-keys/{id}/regenerate-secret",
            post(handlers::keys::regenerate_secret),
        )
        .route("/admin/api-keys/{id}/stats", get(handlers::keys::key_stats))
        .route(
            "/admin/settings",
            get(handlers::settings::get_settings).put(handlers::settings::update_settings),
        )
        .route("/admin/activity-log", get(handlers::logs::activity_log))
        .route("/admin/webhook-log", get(handlers::logs::webhook_log))
        .route("/admin/webhook-log/stats", get(handlers::logs::webhook_stats))
        .route("/admin/webhooks/test", post(handlers::logs::test_webhook))
        .route_layer(from_fn_with_state(state.clone(), admin_middleware));

    Router::new()
        .route("/pagebuilder/v1/health", get(handlers::health::health_check))
        .merge(api_routes)
        .merge(admin_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Spawn the hourly maintenance task.
///
/// Each tick revokes expired credentials, purges long-revoked ones and
/// trims activity and webhook logs past the configured retention.
pub fn spawn_maintenance(pool: DbPool) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(3600));

        loop {
            interval.tick().await;
            let now = Utc::now();

            if let Err(e) = key_service::cleanup_expired_keys(&pool, now).await {
                tracing::error!("Credential cleanup failed: {:?}", e);
            }

            match settings_service::load(&pool).await {
                Ok(settings) => {
                    if let Err(e) =
                        activity_log::cleanup_old_logs(&pool, settings.log_retention, now).await
                    {
                        tracing::error!("Log retention cleanup failed: {:?}", e);
                    }
                }
                Err(e) => tracing::error!("Failed to load settings for cleanup: {:?}", e),
            }
        }
    });
}
