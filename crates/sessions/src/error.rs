//! Session store error types (spec §7: `UNAUTHENTICATED`, `ACCESS_DENIED`,
//! `NOT_FOUND`, `CONFLICT`).

use navigant_protocol::ErrorKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session not found: {0}")]
    NotFound(String),

    #[error("session expired: {0}")]
    Expired(String),

    #[error("access denied for session {0}")]
    AccessDenied(String),

    #[error("session limit exceeded for user {0} (max {1})")]
    LimitExceeded(String, usize),

    #[error("invalid state transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: crate::types::SessionState,
        to: crate::types::SessionState,
    },

    #[error("persistence error: {0}")]
    Persistence(String),
}

impl SessionError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Expired(_) => ErrorKind::Unauthenticated,
            Self::AccessDenied(_) => ErrorKind::AccessDenied,
            Self::LimitExceeded(..) => ErrorKind::Conflict,
            Self::InvalidTransition { .. } => ErrorKind::Conflict,
            Self::Persistence(_) => ErrorKind::Internal,
        }
    }
}
