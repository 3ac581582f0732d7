//! Browser pool error types (spec §7 kinds: `TIMEOUT`, `NAVIGATION_FAILED`,
//! `ELEMENT_NOT_FOUND`, `PAGE_CLOSED`, `BROWSER_CLOSED`, `SECURITY_ERROR`,
//! `NOT_SUPPORTED`, ...).

use std::error::Error as StdError;

use navigant_protocol::ErrorKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("browser not available: no compatible Chrome/Chromium binary found")]
    BrowserNotAvailable,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("browser launch failed: {0}")]
    LaunchFailed(String),

    #[error("navigation failed: {0}")]
    NavigationFailed(String),

    #[error("element not found: {0}")]
    ElementNotFound(String),

    #[error("invalid selector: {0}")]
    InvalidSelector(String),

    #[error("JavaScript evaluation failed: {0}")]
    JsEvalFailed(String),

    #[error("screenshot failed: {0}")]
    ScreenshotFailed(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("pool exhausted: no browser instances available")]
    PoolExhausted,

    #[error("acquire timeout after waiting for a free browser")]
    AcquireTimeout,

    #[error("pool is shutting down")]
    PoolShuttingDown,

    #[error("page cap reached for this browser instance")]
    PageCap,

    #[error("browser closed unexpectedly")]
    BrowserClosed,

    #[error("page closed")]
    PageClosed,

    #[error("page not found: {0}")]
    PageNotFound(String),

    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    #[error("CDP error: {0}")]
    Cdp(String),

    #[error("security error: {0}")]
    Security(String),

    #[error("action not supported: {0}")]
    NotSupported(String),

    #[error("invalid action: {0}")]
    InvalidAction(String),

    #[error("browser error: {source}")]
    Other {
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
}

/// Substrings that indicate the CDP connection to the browser process is
/// dead and the instance should be recycled, not just retried.
const STALE_CONNECTION_PATTERNS: &[&str] = &[
    "receiver is gone",
    "oneshot canceled",
    "request timed out",
    "connection closed",
    "already closed",
    "browser closed",
];

impl BrowserError {
    /// Whether this error indicates the underlying CDP connection is dead
    /// and the hosting instance should be flagged for recycling (spec §5
    /// "the page is marked errored and the browser flagged for recycling").
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        match self {
            Self::BrowserClosed | Self::ConnectionClosed(_) | Self::PageClosed => true,
            Self::Cdp(msg) | Self::Timeout(msg) | Self::NavigationFailed(msg) => {
                let lower = msg.to_lowercase();
                STALE_CONNECTION_PATTERNS.iter().any(|p| lower.contains(p))
            },
            _ => false,
        }
    }

    #[must_use]
    pub fn other(source: impl StdError + Send + Sync + 'static) -> Self {
        Self::Other {
            source: Box::new(source),
        }
    }

    /// Maps to the spec §7 error taxonomy kind for this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::BrowserNotAvailable
            | Self::LaunchFailed(_)
            | Self::PoolExhausted
            | Self::AcquireTimeout
            | Self::PoolShuttingDown
            | Self::PageCap => ErrorKind::Transient,
            Self::NavigationFailed(_) => ErrorKind::NavigationFailed,
            Self::ElementNotFound(_) => ErrorKind::ElementNotFound,
            Self::InvalidSelector(_) | Self::InvalidAction(_) => ErrorKind::ValidationFailed,
            Self::JsEvalFailed(_) => ErrorKind::EvaluationFailed,
            Self::ScreenshotFailed(_) => ErrorKind::InteractionFailed,
            Self::Timeout(_) => ErrorKind::Timeout,
            Self::BrowserClosed => ErrorKind::BrowserClosed,
            Self::PageClosed | Self::PageNotFound(_) => ErrorKind::PageClosed,
            Self::ConnectionClosed(_) | Self::Cdp(_) => ErrorKind::Transient,
            Self::Security(_) => ErrorKind::SecurityError,
            Self::NotSupported(_) => ErrorKind::NotSupported,
            Self::Io(_) | Self::Other { .. } => ErrorKind::Internal,
        }
    }
}

impl From<chromiumoxide::error::CdpError> for BrowserError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        Self::Cdp(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_variants_are_connection_errors() {
        assert!(BrowserError::BrowserClosed.is_connection_error());
        assert!(BrowserError::ConnectionClosed("gone".into()).is_connection_error());
        assert!(BrowserError::PageClosed.is_connection_error());
    }

    #[test]
    fn stale_connection_messages_are_detected_case_insensitively() {
        for msg in [
            "Request timed out.",
            "Connection Closed by remote",
            "the receiver is gone",
            "oneshot CANCELED",
        ] {
            assert!(
                BrowserError::Cdp(msg.to_string()).is_connection_error(),
                "{msg}"
            );
        }
    }

    #[test]
    fn normal_errors_are_not_connection_errors() {
        assert!(!BrowserError::PoolExhausted.is_connection_error());
        assert!(!BrowserError::InvalidSelector("div>".into()).is_connection_error());
        assert!(!BrowserError::Timeout("element not found after 5000ms".into()).is_connection_error());
    }

    #[test]
    fn kind_mapping_covers_retryable_and_recycle_cases() {
        assert_eq!(
            BrowserError::ElementNotFound("#a".into()).kind(),
            ErrorKind::ElementNotFound
        );
        assert!(BrowserError::ElementNotFound("#a".into()).kind().retryable_by_default());
        assert_eq!(BrowserError::Security("xss".into()).kind(), ErrorKind::SecurityError);
        assert!(BrowserError::Security("xss".into()).kind().flags_for_recycle());
    }
}
