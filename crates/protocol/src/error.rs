//! Error taxonomy (spec §7). Every error the core produces carries one of
//! these kinds, which fixes its HTTP status, gRPC status code, and whether
//! the Action Executor's retry engine (C7) may retry it.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    ValidationFailed,
    Unauthenticated,
    AccessDenied,
    NotFound,
    Conflict,
    RateLimited,
    Transient,
    Timeout,
    ElementNotFound,
    NavigationFailed,
    InteractionFailed,
    EvaluationFailed,
    FileUploadFailed,
    PageClosed,
    BrowserClosed,
    SecurityError,
    NotSupported,
    Cancelled,
    Internal,
}

impl ErrorKind {
    /// HTTP status mapping fixed by spec §6/§7.
    #[must_use]
    pub fn http_status(self) -> u16 {
        match self {
            Self::ValidationFailed => 400,
            Self::Unauthenticated => 401,
            Self::AccessDenied => 403,
            Self::NotFound => 404,
            Self::Conflict => 409,
            Self::RateLimited => 429,
            Self::Transient => 503,
            Self::Timeout
            | Self::ElementNotFound
            | Self::NavigationFailed
            | Self::InteractionFailed
            | Self::EvaluationFailed
            | Self::FileUploadFailed
            | Self::PageClosed
            | Self::BrowserClosed
            | Self::SecurityError
            | Self::NotSupported
            | Self::Cancelled
            | Self::Internal => 500,
        }
    }

    /// gRPC status code name mapping fixed by spec §6.
    #[must_use]
    pub fn grpc_status(self) -> &'static str {
        match self {
            Self::ValidationFailed => "INVALID_ARGUMENT",
            Self::Unauthenticated => "UNAUTHENTICATED",
            Self::AccessDenied => "PERMISSION_DENIED",
            Self::NotFound => "NOT_FOUND",
            Self::Conflict => "ALREADY_EXISTS",
            Self::RateLimited => "RESOURCE_EXHAUSTED",
            Self::Transient => "UNAVAILABLE",
            Self::Cancelled => "CANCELLED",
            _ => "INTERNAL",
        }
    }

    /// Whether the Retry/Error Engine (C7) treats this kind as retryable
    /// absent message-level overrides (spec §4.4, §7 table).
    #[must_use]
    pub fn retryable_by_default(self) -> bool {
        matches!(
            self,
            Self::RateLimited
                | Self::Transient
                | Self::Timeout
                | Self::ElementNotFound
                | Self::NavigationFailed
                | Self::InteractionFailed
        )
    }

    /// Whether a page/browser should be flagged for recycling when this
    /// error surfaces (spec §7 table).
    #[must_use]
    pub fn flags_for_recycle(self) -> bool {
        matches!(
            self,
            Self::PageClosed | Self::BrowserClosed | Self::SecurityError | Self::Internal
        )
    }
}

/// A structured error surfaced across every transport boundary.
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct ProtocolError {
    pub kind: ErrorKind,
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ProtocolError {
    #[must_use]
    pub fn new(kind: ErrorKind, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    #[must_use]
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_status_mapping_matches_spec_table() {
        assert_eq!(ErrorKind::ValidationFailed.http_status(), 400);
        assert_eq!(ErrorKind::Unauthenticated.http_status(), 401);
        assert_eq!(ErrorKind::AccessDenied.http_status(), 403);
        assert_eq!(ErrorKind::NotFound.http_status(), 404);
        assert_eq!(ErrorKind::Conflict.http_status(), 409);
        assert_eq!(ErrorKind::RateLimited.http_status(), 429);
        assert_eq!(ErrorKind::Transient.http_status(), 503);
        assert_eq!(ErrorKind::Internal.http_status(), 500);
    }

    #[test]
    fn retryable_kinds_match_spec_table() {
        assert!(ErrorKind::Timeout.retryable_by_default());
        assert!(ErrorKind::ElementNotFound.retryable_by_default());
        assert!(ErrorKind::NavigationFailed.retryable_by_default());
        assert!(ErrorKind::InteractionFailed.retryable_by_default());
        assert!(!ErrorKind::ValidationFailed.retryable_by_default());
        assert!(!ErrorKind::PageClosed.retryable_by_default());
    }

    #[test]
    fn recycle_flags_match_spec_table() {
        assert!(ErrorKind::PageClosed.flags_for_recycle());
        assert!(ErrorKind::BrowserClosed.flags_for_recycle());
        assert!(ErrorKind::SecurityError.flags_for_recycle());
        assert!(!ErrorKind::Timeout.flags_for_recycle());
    }
}
