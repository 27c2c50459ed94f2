//! Page Builder API - Main Application Entry Point
//!
//! REST API server for bulk page creation. Authenticated clients submit
//! batches of pages; the service validates and stores them, records every
//! request in an activity log, and notifies an optional webhook receiver
//! with an HMAC-signed payload.
//!
//! # Architecture
//!
//! - **Web Framework**: Axum (async HTTP server)
//! - **Database**: SQLite with sqlx (async queries)
//! - **Authentication**: API key with bcrypt hashing
//! - **Format**: JSON requests/responses
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment variables
//! 2. Create database connection pool and run migrations
//! 3. Start the webhook dispatcher (resumes interrupted deliveries)
//! 4. Start the hourly maintenance task
//! 5. Build the HTTP router and serve on the configured port

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use pagebuilder_api::services::webhook_service::WebhookDispatcher;
use pagebuilder_api::{AppState, config, create_app, db, spawn_maintenance};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging with tracing subscriber. Reads RUST_LOG environment variable (defaults to "info" level)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    // Load configuration
    let config = config::Config::from_env()?;
    tracing::info!("Configuration loaded");

    // Create database pool
    let pool = db::create_pool(&config.database_url).await?;
    tracing::info!("Database pool created");

    // Run migrations
    db::run_migrations(&pool).await?;
    tracing::info!("Database migrations complete");

    // Webhook dispatcher picks up any deliveries interrupted by the last
    // shutdown before accepting new work
    let dispatcher = WebhookDispatcher::spawn(pool.clone())?;
    tracing::info!("Webhook dispatcher started");

    // Hourly credential and log retention sweep
    spawn_maintenance(pool.clone());

    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        dispatcher,
    };
    let app = create_app(state);

    // Bind to network address and start server
    let addr = format!("0.0.0.0:{}", config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    // Start serving HTTP requests
    // This blocks forever, handling requests concurrently with tokio
    axum::serve(listener, app).await?;

    Ok(())
}
