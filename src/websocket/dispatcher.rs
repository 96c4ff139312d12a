use axum::extract::ws::Message;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use utoipa::ToSchema;

use crate::feed::NewsEvent;

use super::messages::ServerMessage;
use super::registry::SubscriptionRegistry;

/// Dispatcher counters for the monitoring API
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DispatcherStats {
    /// Events consumed from the feed channel (lifetime)
    pub events_dispatched: u64,
    /// Messages handed to connection writers
    pub messages_delivered: u64,
    /// Per-connection delivery failures (closed sessions)
    pub delivery_failures: u64,
}

/// Bridges the news feed to the subscription registry.
///
/// One dispatcher runs per process. Events are fanned out strictly in
/// arrival order: each event's pass over the matching connections completes
/// before the next event is taken. A failure to reach one connection is
/// logged and counted, never propagated to the loop or to other sessions;
/// the failed connection's own session handles its teardown.
pub struct NewsDispatcher {
    registry: Arc<SubscriptionRegistry>,
    events_dispatched: AtomicU64,
    messages_delivered: AtomicU64,
    delivery_failures: AtomicU64,
}

impl NewsDispatcher {
    pub fn new(registry: Arc<SubscriptionRegistry>) -> Self {
        Self {
            registry,
            events_dispatched: AtomicU64::new(0),
            messages_delivered: AtomicU64::new(0),
            delivery_failures: AtomicU64::new(0),
        }
    }

    /// Consume events until the feed side of the channel is dropped
    /// (process shutdown).
    pub async fn run(self: Arc<Self>, mut events: mpsc::UnboundedReceiver<NewsEvent>) {
        tracing::info!("news dispatcher started");

        while let Some(event) = events.recv().await {
            self.dispatch(event);
        }

        tracing::info!("news dispatcher stopped: feed channel closed");
    }

    /// One fan-out pass: serialize the update once, snapshot the matching
    /// connections, push to each.
    pub fn dispatch(&self, event: NewsEvent) {
        self.events_dispatched.fetch_add(1, Ordering::Relaxed);

        let targets = self.registry.matching_connections(&event.ticker);
        if targets.is_empty() {
            tracing::trace!(ticker = %event.ticker, "no subscribers for event");
            return;
        }

        let message = ServerMessage::News {
            ticker: event.ticker.clone(),
            data: event.data,
        };
        let json = match serde_json::to_string(&message) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!(ticker = %event.ticker, "failed to serialize news update: {}", e);
                return;
            }
        };

        for (id, sender) in targets {
            if sender.send(Message::Text(json.clone())).is_ok() {
                self.messages_delivered.fetch_add(1, Ordering::Relaxed);
            } else {
                // Session is tearing down; it deregisters itself.
                self.delivery_failures.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(
                    connection_id = %id,
                    ticker = %event.ticker,
                    "news delivery failed: connection closed"
                );
            }
        }
    }

    pub fn stats(&self) -> DispatcherStats {
        DispatcherStats {
            events_dispatched: self.events_dispatched.load(Ordering::Relaxed),
            messages_delivered: self.messages_delivered.load(Ordering::Relaxed),
            delivery_failures: self.delivery_failures.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::websocket::registry::{ConnectionId, WILDCARD};
    use std::collections::HashSet;
    use uuid::Uuid;

    fn connect(
        registry: &SubscriptionRegistry,
        subscribed: &[&str],
    ) -> (ConnectionId, mpsc::UnboundedReceiver<Message>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = ConnectionId::new();
        registry.register(id, Uuid::new_v4(), tx).unwrap();
        let tickers: HashSet<String> = subscribed.iter().map(|t| t.to_string()).collect();
        registry.add_subscriptions(id, &tickers);
        (id, rx)
    }

    fn event(ticker: &str) -> NewsEvent {
        NewsEvent {
            ticker: ticker.to_string(),
            data: serde_json::json!({"ticker": ticker, "headline": "test headline"}),
        }
    }

    fn recv_news_ticker(rx: &mut mpsc::UnboundedReceiver<Message>) -> String {
        match rx.try_recv().unwrap() {
            Message::Text(json) => {
                let value: serde_json::Value = serde_json::from_str(&json).unwrap();
                assert_eq!(value["type"], "news");
                value["ticker"].as_str().unwrap().to_string()
            }
            other => panic!("expected text frame, got {:?}", other),
        }
    }

    #[test]
    fn test_fan_out_reaches_exact_and_wildcard_subscribers() {
        let registry = Arc::new(SubscriptionRegistry::new());
        let dispatcher = NewsDispatcher::new(registry.clone());

        let (_c1, mut rx1) = connect(&registry, &["AAPL"]);
        let (_c2, mut rx2) = connect(&registry, &["MSFT"]);
        let (_c3, mut rx3) = connect(&registry, &[WILDCARD]);

        dispatcher.dispatch(event("AAPL"));

        assert_eq!(recv_news_ticker(&mut rx1), "AAPL");
        assert_eq!(recv_news_ticker(&mut rx3), "AAPL");
        assert!(rx2.try_recv().is_err());

        let stats = dispatcher.stats();
        assert_eq!(stats.events_dispatched, 1);
        assert_eq!(stats.messages_delivered, 2);
        assert_eq!(stats.delivery_failures, 0);
    }

    #[test]
    fn test_one_dead_connection_does_not_abort_the_pass() {
        let registry = Arc::new(SubscriptionRegistry::new());
        let dispatcher = NewsDispatcher::new(registry.clone());

        let (_c1, rx1) = connect(&registry, &["AAPL"]);
        let (_c3, mut rx3) = connect(&registry, &[WILDCARD]);

        // c1's writer is gone but it has not deregistered yet
        drop(rx1);

        dispatcher.dispatch(event("AAPL"));

        assert_eq!(recv_news_ticker(&mut rx3), "AAPL");
        let stats = dispatcher.stats();
        assert_eq!(stats.messages_delivered, 1);
        assert_eq!(stats.delivery_failures, 1);
    }

    #[test]
    fn test_subscribe_deliver_unsubscribe_silence() {
        let registry = Arc::new(SubscriptionRegistry::new());
        let dispatcher = NewsDispatcher::new(registry.clone());

        let (id, mut rx) = connect(&registry, &["TSLA"]);

        dispatcher.dispatch(event("TSLA"));
        assert_eq!(recv_news_ticker(&mut rx), "TSLA");

        let tickers: HashSet<String> = ["TSLA".to_string()].into_iter().collect();
        registry.remove_subscriptions(id, &tickers);

        dispatcher.dispatch(event("TSLA"));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_run_drains_events_in_order() {
        let registry = Arc::new(SubscriptionRegistry::new());
        let dispatcher = Arc::new(NewsDispatcher::new(registry.clone()));

        let (_c, mut rx) = connect(&registry, &[WILDCARD]);

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        events_tx.send(event("AAPL")).unwrap();
        events_tx.send(event("MSFT")).unwrap();
        drop(events_tx);

        // run() terminates once the feed side is dropped
        dispatcher.clone().run(events_rx).await;

        assert_eq!(recv_news_ticker(&mut rx), "AAPL");
        assert_eq!(recv_news_ticker(&mut rx), "MSFT");
        assert_eq!(dispatcher.stats().events_dispatched, 2);
    }
}
