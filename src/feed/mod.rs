pub mod config;
pub mod consumer;
pub mod event;
pub mod publisher;
pub mod service;

pub use config::{FeedConfig, ReconnectConfig};
pub use consumer::{FeedError, NewsFeedConsumer};
pub use event::NewsEvent;
pub use publisher::NewsPublisher;
pub use service::{FeedService, FeedStats};
