use axum::{extract::State, Json};
use chrono::Utc;
use std::sync::Arc;

use crate::auth::CredentialValidator;
use crate::feed::FeedService;
use crate::websocket::{NewsDispatcher, SubscriptionRegistry};

use super::responses::{HealthResponse, WsStatsResponse};

/// Shared application state
pub struct AppState {
    pub registry: Arc<SubscriptionRegistry>,
    pub dispatcher: Arc<NewsDispatcher>,
    pub feed: Arc<FeedService>,
    pub validator: Arc<dyn CredentialValidator>,
}

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/api/v1/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    )
)]
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        service: "market-atlas-api".to_string(),
        feed_connected: state.feed.is_connected().await,
        timestamp: Utc::now(),
    })
}

/// Live WebSocket and fan-out statistics
#[utoipa::path(
    get,
    path = "/api/v1/ws/stats",
    tag = "WebSocket",
    responses(
        (status = 200, description = "Registry and dispatcher counters", body = WsStatsResponse)
    )
)]
pub async fn get_ws_stats(State(state): State<Arc<AppState>>) -> Json<WsStatsResponse> {
    Json(WsStatsResponse {
        registry: state.registry.stats(),
        dispatcher: state.dispatcher.stats(),
    })
}
