use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::websocket::websocket_handler;

use super::feed_handlers::{connect_feed, disconnect_feed, get_feed_status};
use super::handlers::{get_ws_stats, health_check, AppState};
use super::openapi::ApiDoc;

/// Create the API router with Swagger UI and the WebSocket endpoint
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // WebSocket endpoint (token in query string)
        .route("/ws/news", get(websocket_handler))
        // Health + monitoring
        .route("/api/v1/health", get(health_check))
        .route("/api/v1/ws/stats", get(get_ws_stats))
        // News feed control
        .route("/api/v1/feed/status", get(get_feed_status))
        .route("/api/v1/feed/connect", post(connect_feed))
        .route("/api/v1/feed/disconnect", post(disconnect_feed))
        .with_state(state)
}
