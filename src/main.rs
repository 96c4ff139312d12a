use market_atlas_api::auth::{CredentialValidator, JwtValidator};
use market_atlas_api::{
    create_router, AppConfig, AppState, FeedService, NewsDispatcher, SubscriptionRegistry,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Load environment variables from .env file (if present)
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "market_atlas_api=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("configuration error: {}", e);
            std::process::exit(1);
        }
    };

    // Per-process connection/subscription registry
    let registry = Arc::new(SubscriptionRegistry::new());

    // Feed -> dispatcher channel; one dispatcher per process
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let dispatcher = Arc::new(NewsDispatcher::new(registry.clone()));
    tokio::spawn(dispatcher.clone().run(events_rx));

    // News feed consumer (broadcast subscription on the AMQP exchange)
    let feed = Arc::new(FeedService::new(config.feed.clone(), events_tx));
    if config.feed_auto_start {
        match feed.connect().await {
            Ok(()) => tracing::info!("✅ news feed consumer started"),
            Err(e) => tracing::warn!("⚠️  news feed auto-start failed: {}", e),
        }
    } else {
        tracing::info!("news feed auto-start disabled; use POST /api/v1/feed/connect");
    }

    let validator: Arc<dyn CredentialValidator> =
        Arc::new(JwtValidator::new(config.jwt_secret.as_bytes()));

    let state = Arc::new(AppState {
        registry,
        dispatcher,
        feed: feed.clone(),
        validator,
    });
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await.unwrap();

    tracing::info!("🚀 Market Atlas notification API running on http://{}", config.bind_addr);
    tracing::info!("📊 Health check: http://{}/api/v1/health", config.bind_addr);
    tracing::info!("📚 Swagger UI: http://{}/swagger-ui", config.bind_addr);
    tracing::info!("🔌 WebSocket: ws://{}/ws/news?token=<JWT>", config.bind_addr);
    tracing::info!("");
    tracing::info!("📡 WebSocket subscription examples:");
    tracing::info!(r#"   {{"action":"subscribe","tickers":["AAPL","TSLA"]}}"#);
    tracing::info!(r#"   {{"action":"subscribe","tickers":["*"]}}"#);
    tracing::info!(r#"   {{"action":"ping"}}"#);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .unwrap();

    // Release the broker subscription before exit
    let _ = feed.disconnect().await;
    tracing::info!("shutdown complete");
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install ctrl-c handler");
    tracing::info!("shutdown signal received");
}
