//! HTTP server implementation using Axum.

use axum::{
    Router,
    routing::{get, post},
};
use rollcall_core::config::GatewayConfig;
use rollcall_poll::PollService;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Shared state for the gateway server.
pub struct AppState {
    pub service: Arc<PollService>,
    /// Used to drop commands addressed to other bots.
    pub bot_username: Option<String>,
    /// Expected `X-Telegram-Bot-Api-Secret-Token`, if any.
    pub webhook_secret: Option<String>,
    pub start_time: std::time::Instant,
}

impl AppState {
    pub fn new(
        service: Arc<PollService>,
        bot_username: Option<String>,
        webhook_secret: Option<String>,
    ) -> Self {
        Self {
            service,
            bot_username,
            webhook_secret: webhook_secret.filter(|s| !s.is_empty()),
            start_time: std::time::Instant::now(),
        }
    }
}

/// Build the Axum router. The webhook is mounted at `webhook_path`.
pub fn build_router(state: AppState, webhook_path: &str) -> Router {
    Router::new()
        .route("/", get(super::routes::root))
        .route("/health", get(super::routes::health_check))
        .route(webhook_path, post(super::routes::telegram_webhook))
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

/// Start the HTTP server.
pub async fn start(config: &GatewayConfig, state: AppState) -> anyhow::Result<()> {
    let app = build_router(state, &config.webhook_path);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("🌐 Gateway server listening on http://{}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
