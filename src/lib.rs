pub mod api;
pub mod auth;
pub mod config;
pub mod feed;
pub mod websocket;

pub use api::{create_router, AppState};
pub use config::AppConfig;
pub use feed::{FeedService, NewsEvent, NewsPublisher};
pub use websocket::{NewsDispatcher, SubscriptionRegistry};
