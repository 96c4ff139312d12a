use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::feed::FeedStats;
use crate::websocket::{DispatcherStats, RegistryStats};

/// Service liveness summary
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    /// Whether the news feed currently holds a broker subscription
    pub feed_connected: bool,
    pub timestamp: DateTime<Utc>,
}

/// Live-connection and fan-out counters
#[derive(Debug, Serialize, ToSchema)]
pub struct WsStatsResponse {
    pub registry: RegistryStats,
    pub dispatcher: DispatcherStats,
}

/// News feed status
#[derive(Debug, Serialize, ToSchema)]
pub struct FeedStatusResponse {
    pub running: bool,
    pub exchange: String,
    pub stats: FeedStats,
}

/// Outcome of a feed control action
#[derive(Debug, Serialize, ToSchema)]
pub struct FeedControlResponse {
    pub success: bool,
    pub message: String,
}
