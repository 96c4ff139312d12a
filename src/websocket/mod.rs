pub mod dispatcher;
pub mod messages;
pub mod registry;
pub mod session;

pub use dispatcher::{DispatcherStats, NewsDispatcher};
pub use messages::{ClientMessage, ServerMessage};
pub use registry::{
    ConnectionId, ConnectionSender, RegistryError, RegistryStats, SubscriptionRegistry, WILDCARD,
};
pub use session::websocket_handler;
