//! Maps every upstream error type to the fixed HTTP status / gRPC status
//! code table in spec §6–§7, via one shared [`GatewayError`] the REST, gRPC
//! and WebSocket surfaces all convert into.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use navigant_protocol::{ErrorKind, ProtocolError};

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error(transparent)]
    Session(#[from] navigant_sessions::SessionError),
    #[error(transparent)]
    Page(#[from] navigant_pages::PageError),
    #[error(transparent)]
    Browser(#[from] navigant_browser::BrowserError),
    #[error(transparent)]
    Action(#[from] navigant_actions::ActionError),
    #[error("unauthenticated")]
    Unauthenticated,
    #[error("batch of {0} actions exceeds the configured maximum of {1}")]
    BatchTooLarge(usize, usize),
    #[error("invalid request body: {0}")]
    BadRequest(String),
}

impl GatewayError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Session(e) => e.kind(),
            Self::Page(e) => e.kind(),
            Self::Browser(e) => e.kind(),
            Self::Action(e) => e.kind(),
            Self::Unauthenticated => ErrorKind::Unauthenticated,
            Self::BatchTooLarge(..) | Self::BadRequest(_) => ErrorKind::ValidationFailed,
        }
    }

    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Session(e) => session_code(e),
            Self::Page(e) => page_code(e),
            Self::Browser(_) => "BROWSER_ERROR",
            Self::Action(_) => "ACTION_FAILED",
            Self::Unauthenticated => "UNAUTHENTICATED",
            Self::BatchTooLarge(..) => "BATCH_TOO_LARGE",
            Self::BadRequest(_) => "BAD_REQUEST",
        }
    }

    #[must_use]
    pub fn to_protocol_error(&self) -> ProtocolError {
        ProtocolError::new(self.kind(), self.code(), self.to_string())
    }
}

fn session_code(e: &navigant_sessions::SessionError) -> &'static str {
    use navigant_sessions::SessionError::*;
    match e {
        NotFound(_) => "SESSION_NOT_FOUND",
        Expired(_) => "SESSION_EXPIRED",
        AccessDenied(_) => "ACCESS_DENIED",
        LimitExceeded(..) => "SESSION_LIMIT_EXCEEDED",
        InvalidTransition { .. } => "INVALID_TRANSITION",
        Persistence(_) => "PERSISTENCE_ERROR",
    }
}

fn page_code(e: &navigant_pages::PageError) -> &'static str {
    use navigant_pages::PageError::*;
    match e {
        NotFound(_) => "PAGE_NOT_FOUND",
        Gone(_) => "PAGE_CLOSED",
        ContextNotFound(_) => "CONTEXT_NOT_FOUND",
        ContextMismatch { .. } => "CONTEXT_MISMATCH",
        OwnershipViolation(_) => "OWNERSHIP_VIOLATION",
        Browser(_) => "BROWSER_ERROR",
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.kind().http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let error = self.to_protocol_error();
        (status, Json(serde_json::json!({ "error": error }))).into_response()
    }
}

impl From<GatewayError> for tonic::Status {
    fn from(e: GatewayError) -> Self {
        let error = e.to_protocol_error();
        let code = match error.kind {
            ErrorKind::ValidationFailed => tonic::Code::InvalidArgument,
            ErrorKind::Unauthenticated => tonic::Code::Unauthenticated,
            ErrorKind::AccessDenied => tonic::Code::PermissionDenied,
            ErrorKind::NotFound => tonic::Code::NotFound,
            ErrorKind::Conflict => tonic::Code::AlreadyExists,
            ErrorKind::RateLimited => tonic::Code::ResourceExhausted,
            ErrorKind::Transient => tonic::Code::Unavailable,
            ErrorKind::Cancelled => tonic::Code::Cancelled,
            _ => tonic::Code::Internal,
        };
        tonic::Status::new(code, error.message)
    }
}
