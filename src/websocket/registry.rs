use axum::extract::ws::Message;
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fmt;
use tokio::sync::mpsc;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::UserId;

use super::messages::ServerMessage;

/// Subscription marker matching every ticker.
pub const WILDCARD: &str = "*";

/// Outbound channel into one session's writer task. Sending never blocks;
/// it fails only once the owning session has torn down.
pub type ConnectionSender = mpsc::UnboundedSender<Message>;

/// Opaque handle for one live WebSocket connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Error types for registry operations
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// A live handle was registered twice. The session state machine makes
    /// this unreachable; hitting it is a bug, not a runtime condition.
    #[error("connection {0} is already registered")]
    DuplicateConnection(ConnectionId),
}

/// Registry counters for the monitoring API
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RegistryStats {
    /// Number of live connections
    pub connections: usize,
    /// Number of users with at least one connection
    pub users: usize,
    /// Total ticker subscriptions across all connections
    pub subscriptions: usize,
}

struct ConnectionEntry {
    user_id: UserId,
    tickers: HashSet<String>,
    sender: ConnectionSender,
}

struct RegistryInner {
    /// user -> live connections for that user (multiple tabs/devices)
    user_connections: HashMap<UserId, HashSet<ConnectionId>>,
    /// connection -> owning user, subscribed tickers, outbound sender
    connections: HashMap<ConnectionId, ConnectionEntry>,
}

/// In-memory registry of live connections and their ticker subscriptions.
///
/// Both mappings live behind a single lock so connect/disconnect updates
/// them as an atomic pair; there is no window where a connection is visible
/// in one map but not the other. State is per-process and rebuilt empty on
/// restart (the transport drops with the process anyway).
pub struct SubscriptionRegistry {
    inner: RwLock<RegistryInner>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(RegistryInner {
                user_connections: HashMap::new(),
                connections: HashMap::new(),
            }),
        }
    }

    /// Add a connection under its user with an empty subscription set.
    pub fn register(
        &self,
        id: ConnectionId,
        user_id: UserId,
        sender: ConnectionSender,
    ) -> Result<(), RegistryError> {
        let mut inner = self.inner.write();

        if inner.connections.contains_key(&id) {
            return Err(RegistryError::DuplicateConnection(id));
        }

        inner.user_connections.entry(user_id).or_default().insert(id);
        inner.connections.insert(
            id,
            ConnectionEntry {
                user_id,
                tickers: HashSet::new(),
                sender,
            },
        );

        tracing::debug!(connection_id = %id, user_id = %user_id, "connection registered");
        Ok(())
    }

    /// Remove a connection and its subscription set. Idempotent: duplicate
    /// cleanup calls from racing disconnect paths are a no-op.
    pub fn deregister(&self, id: ConnectionId) {
        let mut inner = self.inner.write();

        let Some(entry) = inner.connections.remove(&id) else {
            return;
        };

        if let Some(user_conns) = inner.user_connections.get_mut(&entry.user_id) {
            user_conns.remove(&id);
            if user_conns.is_empty() {
                inner.user_connections.remove(&entry.user_id);
            }
        }

        tracing::debug!(connection_id = %id, user_id = %entry.user_id, "connection deregistered");
    }

    /// Union `tickers` into the connection's subscription set.
    /// Silent no-op if the connection is not registered (races with
    /// deregister must never raise or resurrect an entry).
    pub fn add_subscriptions(&self, id: ConnectionId, tickers: &HashSet<String>) {
        let mut inner = self.inner.write();
        if let Some(entry) = inner.connections.get_mut(&id) {
            entry.tickers.extend(tickers.iter().cloned());
        }
    }

    /// Remove `tickers` from the connection's subscription set.
    /// Same no-op-on-missing rule as `add_subscriptions`.
    pub fn remove_subscriptions(&self, id: ConnectionId, tickers: &HashSet<String>) {
        let mut inner = self.inner.write();
        if let Some(entry) = inner.connections.get_mut(&id) {
            for ticker in tickers {
                entry.tickers.remove(ticker);
            }
        }
    }

    /// Snapshot of the user's live connections; empty if none.
    pub fn connections_for_user(&self, user_id: UserId) -> HashSet<ConnectionId> {
        self.inner
            .read()
            .user_connections
            .get(&user_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Point-in-time snapshot of every connection subscribed to `ticker`,
    /// including wildcard subscribers. Safe to iterate while other sessions
    /// mutate their own entries.
    pub fn matching_connections(&self, ticker: &str) -> Vec<(ConnectionId, ConnectionSender)> {
        self.inner
            .read()
            .connections
            .iter()
            .filter(|(_, entry)| {
                entry.tickers.contains(ticker) || entry.tickers.contains(WILDCARD)
            })
            .map(|(id, entry)| (*id, entry.sender.clone()))
            .collect()
    }

    /// Push one message to every connection owned by `user_id`.
    /// Returns the number of connections the message was handed to.
    pub fn broadcast_to_user(&self, user_id: UserId, message: &ServerMessage) -> usize {
        let targets: Vec<(ConnectionId, ConnectionSender)> = {
            let inner = self.inner.read();
            let Some(conns) = inner.user_connections.get(&user_id) else {
                return 0;
            };
            conns
                .iter()
                .filter_map(|id| inner.connections.get(id).map(|e| (*id, e.sender.clone())))
                .collect()
        };

        let json = match serde_json::to_string(message) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!("failed to serialize user broadcast: {}", e);
                return 0;
            }
        };

        let mut delivered = 0;
        for (id, sender) in targets {
            if sender.send(Message::Text(json.clone())).is_ok() {
                delivered += 1;
            } else {
                tracing::warn!(connection_id = %id, "dropping user broadcast to closed connection");
            }
        }
        delivered
    }

    /// Current subscription set for a connection; empty if not registered.
    pub fn subscriptions(&self, id: ConnectionId) -> HashSet<String> {
        self.inner
            .read()
            .connections
            .get(&id)
            .map(|entry| entry.tickers.clone())
            .unwrap_or_default()
    }

    pub fn stats(&self) -> RegistryStats {
        let inner = self.inner.read();
        RegistryStats {
            connections: inner.connections.len(),
            users: inner.user_connections.len(),
            subscriptions: inner.connections.values().map(|e| e.tickers.len()).sum(),
        }
    }
}

impl Default for SubscriptionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
