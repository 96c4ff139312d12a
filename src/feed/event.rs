use serde::{Deserialize, Serialize};

use super::consumer::FeedError;

/// One ticker-update event from the news feed.
///
/// Workers publish flat JSON objects carrying at least a string `ticker`;
/// the whole object rides along as the opaque payload the client receives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsEvent {
    pub ticker: String,
    pub data: serde_json::Value,
}

impl NewsEvent {
    /// Decode a raw feed delivery. Payloads without a string `ticker` field
    /// are rejected; there is nothing to route them by.
    pub fn from_payload(payload: &[u8]) -> Result<Self, FeedError> {
        let value: serde_json::Value = serde_json::from_slice(payload)?;
        let ticker = value
            .get("ticker")
            .and_then(serde_json::Value::as_str)
            .ok_or(FeedError::MissingTicker)?
            .to_string();
        Ok(Self {
            ticker,
            data: value,
        })
    }
}
