//! Manual publisher for exercising the fan-out path end to end:
//! start the server, connect a WebSocket client, subscribe to a ticker,
//! then run `cargo run --bin publish_news -- TSLA "Deliveries beat estimates"`.

use market_atlas_api::feed::{FeedConfig, NewsPublisher};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let mut args = std::env::args().skip(1);
    let ticker = args.next().unwrap_or_else(|| "AAPL".to_string());
    let headline = args
        .collect::<Vec<_>>()
        .join(" ")
        .trim()
        .to_string();
    let headline = if headline.is_empty() {
        format!("Sample headline for {}", ticker)
    } else {
        headline
    };

    let publisher = NewsPublisher::new(FeedConfig::from_env());
    if let Err(e) = publisher.connect().await {
        tracing::error!("failed to connect publisher: {}", e);
        std::process::exit(1);
    }

    let event = serde_json::json!({
        "ticker": ticker,
        "headline": headline,
        "published_at": chrono::Utc::now(),
    });

    match publisher.publish(&event).await {
        Ok(()) => tracing::info!("published news event for {}", ticker),
        Err(e) => tracing::error!("publish failed: {}", e),
    }

    let _ = publisher.disconnect().await;
}
