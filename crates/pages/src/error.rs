//! Page Manager / Context Registry error types (spec §4.2, §4.3).

use navigant_protocol::ErrorKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PageError {
    #[error("page not found: {0}")]
    NotFound(String),

    #[error("page is gone: {0}")]
    Gone(String),

    #[error("context not found: {0}")]
    ContextNotFound(String),

    #[error("context {context_id} belongs to a different session")]
    ContextMismatch { context_id: String },

    #[error("ownership violation: caller does not own page {0}")]
    OwnershipViolation(String),

    #[error(transparent)]
    Browser(#[from] navigant_browser::BrowserError),
}

impl PageError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) | Self::ContextNotFound(_) => ErrorKind::NotFound,
            Self::Gone(_) => ErrorKind::PageClosed,
            Self::ContextMismatch { .. } => ErrorKind::Conflict,
            Self::OwnershipViolation(_) => ErrorKind::AccessDenied,
            Self::Browser(e) => e.kind(),
        }
    }
}
