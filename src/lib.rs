//! PostForge - A self-hosted LinkedIn content studio backend
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      API Layer (Axum)                        │
//! │  - OAuth login / callback / check / logout                  │
//! │  - Action proxy endpoints (generate, publish)               │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Outbound Collaborators                    │
//! │  - LinkedIn OAuth endpoints (token exchange, userinfo)      │
//! │  - Automation webhook (generate, publish)                   │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Data Layer                              │
//! │  - SQLite (sqlx): users, posts                              │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - `api`: HTTP handlers for the action proxy and metrics
//! - `auth`: LinkedIn OAuth flow, session codec, auth middleware
//! - `webhook`: client for the automation webhook endpoints
//! - `data`: database layer (users, posts)
//! - `config`: configuration management
//! - `error`: error types
//! - `metrics`: Prometheus instruments

pub mod api;
pub mod auth;
pub mod config;
pub mod data;
pub mod error;
pub mod metrics;
pub mod webhook;

use std::sync::Arc;

/// Application state shared across all handlers
///
/// This struct is cloned for each request and contains shared resources:
/// the configuration, database pool, webhook client, and HTTP client.
/// Everything is constructed once at startup — there is no lazy,
/// first-access initialization anywhere.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<config::AppConfig>,

    /// Database connection pool
    pub db: Arc<data::Database>,

    /// Automation webhook client
    pub webhooks: Arc<webhook::WebhookClient>,

    /// HTTP client for OAuth provider calls
    pub http_client: Arc<reqwest::Client>,
}

impl AppState {
    /// Initialize application state
    ///
    /// # Steps
    /// 1. Connect to the SQLite database (runs migrations)
    /// 2. Initialize the shared HTTP client
    /// 3. Initialize the webhook client
    ///
    /// # Errors
    /// Returns error if any initialization step fails
    pub async fn new(config: config::AppConfig) -> Result<Self, error::AppError> {
        tracing::info!("Initializing application state...");

        // 1. Connect to SQLite database
        let db = data::Database::connect(&config.database.path).await?;
        tracing::info!("Database connected");

        // 2. Initialize HTTP client
        let http_client = Arc::new(
            reqwest::Client::builder()
                .user_agent("PostForge/0.1.0")
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .map_err(|e| error::AppError::Internal(e.into()))?,
        );

        // 3. Initialize webhook client
        let webhooks = webhook::WebhookClient::new(http_client.clone(), config.webhook.clone());
        tracing::info!("Webhook client initialized");

        tracing::info!("Application state initialized successfully");

        Ok(Self {
            config: Arc::new(config),
            db: Arc::new(db),
            webhooks: Arc::new(webhooks),
            http_client,
        })
    }
}

/// Build the Axum router with all routes.
///
/// This is shared by the binary and integration tests to keep route
/// composition consistent across environments.
pub fn build_router(state: AppState) -> axum::Router {
    use axum::Router;
    use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

    Router::new()
        .route("/health", axum::routing::get(health_check))
        .merge(auth::auth_router())
        .merge(api::actions_router(state.clone()))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        // Browser preflight for the action endpoints is answered here.
        .layer(CorsLayer::permissive())
        .with_state(state)
        .merge(api::metrics_router())
}

async fn health_check() -> &'static str {
    "OK"
}
