use utoipa::OpenApi;

use crate::api::{feed_handlers, handlers};
use crate::api::responses::*;
use crate::feed::FeedStats;
use crate::websocket::{DispatcherStats, RegistryStats};

/// OpenAPI specification for the REST surface. The WebSocket wire contract
/// lives on /ws/news and is documented on the message types.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Market Atlas Notification API",
        version = "0.1.0",
        description = "Real-time news fan-out service: WebSocket subscriptions per ticker, fed by an AMQP broadcast exchange",
    ),
    paths(
        handlers::health_check,
        handlers::get_ws_stats,
        feed_handlers::get_feed_status,
        feed_handlers::connect_feed,
        feed_handlers::disconnect_feed,
    ),
    components(
        schemas(
            HealthResponse,
            WsStatsResponse,
            FeedStatusResponse,
            FeedControlResponse,
            RegistryStats,
            DispatcherStats,
            FeedStats,
        )
    ),
    tags(
        (name = "Health", description = "Health check endpoints"),
        (name = "WebSocket", description = "Live connection statistics"),
        (name = "Feed", description = "News feed lifecycle control"),
    )
)]
pub struct ApiDoc;
