use lapin::{
    options::{BasicPublishOptions, ExchangeDeclareOptions},
    types::FieldTable,
    BasicProperties, Channel, Connection, ConnectionProperties, ExchangeKind,
};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;

use super::config::FeedConfig;
use super::consumer::{FeedError, Result};

/// Publisher side of the news-updates contract.
///
/// Background workers (news ingestion, research tasks) use this to announce
/// fresh data for a ticker. Routing keys are irrelevant on a fanout
/// exchange; every bound consumer gets every event.
pub struct NewsPublisher {
    config: FeedConfig,
    connection: RwLock<Option<Connection>>,
    channel: RwLock<Option<Channel>>,
    is_connected: AtomicBool,
    messages_published: AtomicU64,
}

impl NewsPublisher {
    pub fn new(config: FeedConfig) -> Self {
        Self {
            config,
            connection: RwLock::new(None),
            channel: RwLock::new(None),
            is_connected: AtomicBool::new(false),
            messages_published: AtomicU64::new(0),
        }
    }

    /// Connect to the broker and declare the fanout exchange.
    pub async fn connect(&self) -> Result<()> {
        tracing::info!("connecting news publisher to {}", self.config.uri);

        let connection = tokio::time::timeout(
            Duration::from_secs(self.config.connection_timeout_secs),
            Connection::connect(&self.config.uri, ConnectionProperties::default()),
        )
        .await
        .map_err(|_| FeedError::Timeout(self.config.connection_timeout_secs))??;

        let channel = connection.create_channel().await?;
        channel
            .exchange_declare(
                &self.config.exchange,
                ExchangeKind::Fanout,
                ExchangeDeclareOptions {
                    durable: self.config.durable,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await?;

        *self.connection.write().await = Some(connection);
        *self.channel.write().await = Some(channel);
        self.is_connected.store(true, Ordering::Release);

        tracing::info!(exchange = %self.config.exchange, "news publisher connected");
        Ok(())
    }

    pub async fn disconnect(&self) -> Result<()> {
        if let Some(channel) = self.channel.write().await.take() {
            let _ = channel.close(200, "normal shutdown").await;
        }
        if let Some(connection) = self.connection.write().await.take() {
            let _ = connection.close(200, "normal shutdown").await;
        }
        self.is_connected.store(false, Ordering::Release);
        tracing::info!("news publisher disconnected");
        Ok(())
    }

    /// Publish one event to the exchange as JSON.
    pub async fn publish<T: Serialize>(&self, message: &T) -> Result<()> {
        if !self.is_connected.load(Ordering::Acquire) {
            return Err(FeedError::NotRunning);
        }

        let payload = serde_json::to_vec(message)?;

        let channel_guard = self.channel.read().await;
        let channel = channel_guard.as_ref().ok_or(FeedError::NotRunning)?;

        // No confirm_select on this channel; the returned confirm resolves
        // immediately and at-most-once delivery is acceptable for news pushes.
        let _confirm = channel
            .basic_publish(
                &self.config.exchange,
                "",
                BasicPublishOptions::default(),
                &payload,
                BasicProperties::default(),
            )
            .await?;

        self.messages_published.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(exchange = %self.config.exchange, "news event published");
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        self.is_connected.load(Ordering::Acquire)
    }

    pub fn messages_published(&self) -> u64 {
        self.messages_published.load(Ordering::Relaxed)
    }
}
