use axum::{extract::State, Json};
use std::sync::Arc;

use super::handlers::AppState;
use super::responses::{FeedControlResponse, FeedStatusResponse};

/// Get news feed status
///
/// Returns whether the consumer task is running, whether it currently holds
/// a broker subscription, and its counters.
#[utoipa::path(
    get,
    path = "/api/v1/feed/status",
    tag = "Feed",
    responses(
        (status = 200, description = "News feed status", body = FeedStatusResponse)
    )
)]
pub async fn get_feed_status(State(state): State<Arc<AppState>>) -> Json<FeedStatusResponse> {
    Json(FeedStatusResponse {
        running: state.feed.is_running().await,
        exchange: state.feed.exchange().to_string(),
        stats: state.feed.stats().await,
    })
}

/// Start the news feed consumer
///
/// Spawns the broadcast subscriber if it is not already running. The
/// consumer keeps retrying the broker on its own from then on.
#[utoipa::path(
    post,
    path = "/api/v1/feed/connect",
    tag = "Feed",
    responses(
        (status = 200, description = "Feed consumer started", body = FeedControlResponse)
    )
)]
pub async fn connect_feed(State(state): State<Arc<AppState>>) -> Json<FeedControlResponse> {
    match state.feed.connect().await {
        Ok(()) => Json(FeedControlResponse {
            success: true,
            message: "news feed consumer started".to_string(),
        }),
        Err(e) => {
            tracing::warn!("feed connect request failed: {}", e);
            Json(FeedControlResponse {
                success: false,
                message: e.to_string(),
            })
        }
    }
}

/// Stop the news feed consumer
#[utoipa::path(
    post,
    path = "/api/v1/feed/disconnect",
    tag = "Feed",
    responses(
        (status = 200, description = "Feed consumer stopped", body = FeedControlResponse)
    )
)]
pub async fn disconnect_feed(State(state): State<Arc<AppState>>) -> Json<FeedControlResponse> {
    match state.feed.disconnect().await {
        Ok(()) => Json(FeedControlResponse {
            success: true,
            message: "news feed consumer stopped".to_string(),
        }),
        Err(e) => Json(FeedControlResponse {
            success: false,
            message: e.to_string(),
        }),
    }
}
