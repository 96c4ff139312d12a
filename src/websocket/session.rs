use axum::{
    extract::{
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::Response,
};
use futures::{sink::SinkExt, stream::StreamExt};
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::select;
use tokio::sync::mpsc;

use crate::api::AppState;
use crate::auth::UserId;

use super::messages::{ClientMessage, ServerMessage};
use super::registry::{ConnectionId, ConnectionSender, SubscriptionRegistry};

/// Application close code for a failed handshake. The client sees a
/// policy-violation-class close with no protocol exchange before it.
const CLOSE_INVALID_TOKEN: u16 = 4001;

/// Query parameters for the WebSocket handshake.
/// The access token travels as `?token=JWT`; there is no usable header
/// channel during a browser WebSocket upgrade.
#[derive(Debug, Deserialize)]
pub struct WsAuthQuery {
    pub token: String,
}

/// Handle WebSocket upgrade request on /ws/news
///
/// The credential is checked before the session exists: an invalid or
/// expired token closes the transport with code 4001 and never touches
/// the registry.
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<WsAuthQuery>,
    State(state): State<Arc<AppState>>,
) -> Response {
    match state.validator.validate(&params.token) {
        Ok(user_id) => {
            tracing::info!(user_id = %user_id, "WebSocket connection authenticated");
            ws.on_upgrade(move |socket| run_session(socket, state.registry.clone(), user_id))
        }
        Err(err) => {
            tracing::warn!(close_code = CLOSE_INVALID_TOKEN, "WebSocket auth failed: {}", err);
            ws.on_upgrade(move |mut socket| async move {
                let _ = socket
                    .send(Message::Close(Some(CloseFrame {
                        code: CLOSE_INVALID_TOKEN,
                        reason: "Invalid token".into(),
                    })))
                    .await;
            })
        }
    }
}

/// Run one authenticated connection: register, process inbound messages in
/// arrival order, and guarantee deregistration on every exit path.
async fn run_session(socket: WebSocket, registry: Arc<SubscriptionRegistry>, user_id: UserId) {
    let (sink, mut receiver) = socket.split();
    let (tx, rx) = mpsc::unbounded_channel::<Message>();
    let id = ConnectionId::new();

    if let Err(e) = registry.register(id, user_id, tx.clone()) {
        // Unreachable with freshly minted ids; bail without touching state.
        tracing::error!(connection_id = %id, "session registration failed: {}", e);
        return;
    }

    tracing::info!(connection_id = %id, user_id = %user_id, "WebSocket session opened");

    // Writer task owns the sink; everything outbound funnels through tx.
    let mut writer = tokio::spawn(write_outbound(sink, rx));

    loop {
        select! {
            frame = receiver.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        handle_text_frame(&registry, id, &tx, &text);
                    }
                    Some(Ok(Message::Ping(data))) => {
                        // Transport liveness, no registry effect
                        if tx.send(Message::Pong(data)).is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) => {
                        tracing::info!(connection_id = %id, "client closed connection");
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::warn!(connection_id = %id, "WebSocket receive error: {}", e);
                        break;
                    }
                    None => break,
                }
            }

            // A finished writer means an outbound send failed; treat it as a
            // disconnect, not something to retry.
            _ = &mut writer => {
                tracing::warn!(connection_id = %id, "outbound writer stopped, closing session");
                break;
            }
        }
    }

    // Single cleanup path for every exit: normal close, receive error,
    // abrupt disconnect, send failure.
    registry.deregister(id);
    writer.abort();

    tracing::info!(connection_id = %id, user_id = %user_id, "WebSocket session closed");
}

/// Forward queued outbound frames to the socket; exit on the first send
/// error, which the session loop observes as a disconnect signal.
async fn write_outbound(
    mut sink: futures::stream::SplitSink<WebSocket, Message>,
    mut rx: mpsc::UnboundedReceiver<Message>,
) {
    while let Some(msg) = rx.recv().await {
        if sink.send(msg).await.is_err() {
            break;
        }
    }
}

/// Decode one inbound text frame and apply it. Malformed frames are dropped
/// with a debug log; they never close the connection.
fn handle_text_frame(
    registry: &SubscriptionRegistry,
    id: ConnectionId,
    tx: &ConnectionSender,
    text: &str,
) {
    let msg = match serde_json::from_str::<ClientMessage>(text) {
        Ok(msg) => msg,
        Err(e) => {
            tracing::debug!(connection_id = %id, "dropping malformed client message: {}", e);
            return;
        }
    };

    if let Some(reply) = apply_client_message(registry, id, msg) {
        match serde_json::to_string(&reply) {
            Ok(json) => {
                if tx.send(Message::Text(json)).is_err() {
                    tracing::debug!(connection_id = %id, "session outbound channel closed");
                }
            }
            Err(e) => {
                tracing::error!(connection_id = %id, "failed to serialize reply: {}", e);
            }
        }
    }
}

/// Apply one decoded control message against the registry and produce the
/// acknowledgement, if the message kind calls for one.
pub(crate) fn apply_client_message(
    registry: &SubscriptionRegistry,
    id: ConnectionId,
    msg: ClientMessage,
) -> Option<ServerMessage> {
    match msg {
        ClientMessage::Subscribe { tickers } => {
            let set: HashSet<String> = tickers.into_iter().collect();
            registry.add_subscriptions(id, &set);
            Some(ServerMessage::Subscribed {
                tickers: sorted(set),
            })
        }
        ClientMessage::Unsubscribe { tickers } => {
            let set: HashSet<String> = tickers.into_iter().collect();
            registry.remove_subscriptions(id, &set);
            Some(ServerMessage::Unsubscribed {
                tickers: sorted(set),
            })
        }
        ClientMessage::Ping => Some(ServerMessage::Pong),
        ClientMessage::Unknown => None,
    }
}

fn sorted(set: HashSet<String>) -> Vec<String> {
    let mut tickers: Vec<String> = set.into_iter().collect();
    tickers.sort();
    tickers
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn registered_connection(
        registry: &SubscriptionRegistry,
    ) -> (ConnectionId, mpsc::UnboundedReceiver<Message>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = ConnectionId::new();
        registry.register(id, Uuid::new_v4(), tx).unwrap();
        (id, rx)
    }

    #[test]
    fn test_subscribe_mutates_registry_and_acks() {
        let registry = SubscriptionRegistry::new();
        let (id, _rx) = registered_connection(&registry);

        let reply = apply_client_message(
            &registry,
            id,
            ClientMessage::Subscribe {
                tickers: vec!["TSLA".to_string(), "AAPL".to_string()],
            },
        );

        match reply {
            Some(ServerMessage::Subscribed { tickers }) => {
                assert_eq!(tickers, vec!["AAPL".to_string(), "TSLA".to_string()]);
            }
            other => panic!("expected subscribed ack, got {:?}", other),
        }
        assert!(registry.subscriptions(id).contains("TSLA"));
    }

    #[test]
    fn test_unsubscribe_acks_removed_set() {
        let registry = SubscriptionRegistry::new();
        let (id, _rx) = registered_connection(&registry);

        apply_client_message(
            &registry,
            id,
            ClientMessage::Subscribe {
                tickers: vec!["TSLA".to_string()],
            },
        );
        let reply = apply_client_message(
            &registry,
            id,
            ClientMessage::Unsubscribe {
                tickers: vec!["TSLA".to_string()],
            },
        );

        assert!(matches!(reply, Some(ServerMessage::Unsubscribed { .. })));
        assert!(registry.subscriptions(id).is_empty());
    }

    #[test]
    fn test_ping_replies_pong_without_registry_effect() {
        let registry = SubscriptionRegistry::new();
        let (id, _rx) = registered_connection(&registry);

        let reply = apply_client_message(&registry, id, ClientMessage::Ping);
        assert!(matches!(reply, Some(ServerMessage::Pong)));
        assert!(registry.subscriptions(id).is_empty());
    }

    #[test]
    fn test_unknown_message_gets_no_reply() {
        let registry = SubscriptionRegistry::new();
        let (id, _rx) = registered_connection(&registry);

        assert!(apply_client_message(&registry, id, ClientMessage::Unknown).is_none());
    }

    #[test]
    fn test_malformed_frame_is_dropped_silently() {
        let registry = SubscriptionRegistry::new();
        let (id, mut rx) = registered_connection(&registry);

        let (sender, _unused_rx) = mpsc::unbounded_channel();
        handle_text_frame(&registry, id, &sender, "{\"action\":");

        // no reply queued, connection entry untouched
        assert!(rx.try_recv().is_err());
        assert_eq!(registry.stats().connections, 1);
    }
}
