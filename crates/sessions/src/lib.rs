//! Session Store (C3): authoritative `Session` records, lifecycle state
//! machine, ownership enforcement, and batched durable persistence.

pub mod error;
pub mod store;
pub mod types;

pub use error::SessionError;
pub use store::{NoopPersistence, SessionPersistence, SessionStore, SessionStoreConfig};
pub use types::{Session, SessionEvent, SessionFilter, SessionState};
