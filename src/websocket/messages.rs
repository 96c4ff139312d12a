use serde::{Deserialize, Serialize};

/// Inbound control message from a connected client.
///
/// Decoded once at the protocol boundary; actions this server does not
/// recognize map to `Unknown` and are ignored for forward compatibility.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ClientMessage {
    Subscribe { tickers: Vec<String> },
    Unsubscribe { tickers: Vec<String> },
    Ping,
    #[serde(other)]
    Unknown,
}

/// Outbound message pushed to a client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Ack of a subscribe, echoing the tickers applied
    Subscribed { tickers: Vec<String> },
    /// Ack of an unsubscribe, echoing the tickers removed
    Unsubscribed { tickers: Vec<String> },
    /// Liveness reply
    Pong,
    /// Fan-out of one news event to a matching subscriber
    News {
        ticker: String,
        data: serde_json::Value,
    },
}
