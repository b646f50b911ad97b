//! Route handlers.

use axum::{Json, extract::State, http::HeaderMap, http::StatusCode};
use rollcall_channels::TelegramUpdate;
use std::sync::Arc;

use crate::server::AppState;

const SECRET_HEADER: &str = "x-telegram-bot-api-secret-token";

/// Static confirmation page.
pub async fn root() -> &'static str {
    "Bot is running via webhook ✅"
}

/// Health check endpoint.
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "rollcall",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_secs": state.start_time.elapsed().as_secs(),
    }))
}

/// Telegram webhook. Malformed or ignored updates are still acknowledged
/// with 200 so Telegram does not redeliver them.
pub async fn telegram_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: String,
) -> (StatusCode, Json<serde_json::Value>) {
    if let Some(expected) = &state.webhook_secret {
        let provided = headers
            .get(SECRET_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        if provided != expected {
            tracing::warn!("⚠️ Webhook call with missing or wrong secret token");
            return (
                StatusCode::UNAUTHORIZED,
                Json(serde_json::json!({"ok": false, "error": "Invalid secret token"})),
            );
        }
    }

    let update: TelegramUpdate = match serde_json::from_str(&body) {
        Ok(u) => u,
        Err(e) => {
            tracing::warn!("⚠️ Unparseable Telegram update: {e}");
            return (
                StatusCode::OK,
                Json(serde_json::json!({"ok": false, "error": "Invalid update"})),
            );
        }
    };

    match update.to_inbound(state.bot_username.as_deref()) {
        Some(event) => {
            state.service.handle_event(event).await;
        }
        None => tracing::debug!("Ignoring update {}", update.update_id),
    }

    (StatusCode::OK, Json(serde_json::json!({"ok": true})))
}
