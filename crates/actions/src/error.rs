//! Action Executor error types (spec §4.4, §7).

use navigant_protocol::ErrorKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ActionError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("unsupported action type: {0}")]
    UnsupportedAction(String),

    #[error("security error: {0}")]
    Security(String),

    #[error("page not found: {0}")]
    PageNotFound(String),

    #[error(transparent)]
    Page(#[from] navigant_pages::PageError),

    #[error(transparent)]
    Browser(#[from] navigant_browser::BrowserError),

    #[error("action cancelled")]
    Cancelled,
}

impl ActionError {
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    #[must_use]
    pub fn security(message: impl Into<String>) -> Self {
        Self::Security(message.into())
    }

    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::ValidationFailed,
            Self::UnsupportedAction(_) => ErrorKind::ValidationFailed,
            Self::Security(_) => ErrorKind::SecurityError,
            Self::PageNotFound(_) => ErrorKind::NotFound,
            Self::Page(e) => e.kind(),
            Self::Browser(e) => e.kind(),
            Self::Cancelled => ErrorKind::Cancelled,
        }
    }

    /// Whether this error, as surfaced to the Retry/Error Engine, is
    /// unconditionally non-retryable regardless of message substrings
    /// (spec §4.4 "Validation failures... are never retried").
    #[must_use]
    pub fn never_retry(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::UnsupportedAction(_) | Self::Security(_) | Self::PageNotFound(_)
        )
    }
}
