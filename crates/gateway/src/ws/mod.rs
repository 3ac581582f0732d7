//! WebSocket Fabric (C9): authenticated long-lived connections, subscribe/
//! unsubscribe and session-event fan-out (spec §4.5).

pub mod connection;
pub mod fabric;

pub use connection::handle_connection;
pub use fabric::{Connection, ConnectionState, FabricEvent, Subscription, WsFabric};
