//! HTTP server setup with Axum

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};

use super::sse::handler::{live_notification_handler, push_message_handler, server_info_handler};
use super::sse::SseState;

/// Create the Axum router with all endpoints
pub fn create_router(state: Arc<SseState>) -> Router {
    // SSE clients connect from browser pages on other origins
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/live-notification", get(live_notification_handler))
        .route("/push-message", post(push_message_handler))
        .route("/info", get(server_info_handler))
        // Health check
        .route("/health", get(health_check))
        .layer(cors)
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}
