//! Wire protocol definitions shared by every transport surface (REST, gRPC,
//! WebSocket, tool-adapter): the `Action`/`ActionResult` schema (§3, §6), the
//! WebSocket frame types (§6), and the error taxonomy with its HTTP/gRPC
//! status mappings (§7).

pub mod action;
pub mod error;
pub mod wire;

pub use action::{Action, ActionKind, ActionResult};
pub use error::{ErrorKind, ProtocolError};
pub use wire::{
    BrowserEventPayload, ErrorPayload, PerformanceMetricPayload, SubscribePayload,
    UnsubscribePayload, WsEnvelope, WsPayload,
};
