//! REST surface (spec §6 "Session CRUD under `/sessions`; context CRUD
//! under `/sessions/{id}/contexts`; page CRUD under
//! `/sessions/{id}/contexts/{id}/pages`; `POST /sessions/{id}/execute`").

pub mod actions;
pub mod contexts;
pub mod ops;
pub mod pages;
pub mod sessions;

use std::sync::Arc;

use axum::{
    Router,
    http::HeaderMap,
    routing::{get, post},
};

use crate::{
    auth::{CallerIdentity, Credential},
    error::GatewayError,
    state::GatewayState,
};

/// Shared across every REST handler: resolve the caller's identity from
/// request headers via the injected [`crate::auth::Authenticator`].
pub(crate) async fn authenticate(
    state: &GatewayState,
    headers: &HeaderMap,
) -> Result<CallerIdentity, GatewayError> {
    let credential = Credential::from_headers(headers);
    state.authenticator.authenticate(&credential).await
}

pub fn router() -> Router<Arc<GatewayState>> {
    Router::new()
        .route("/healthz", get(ops::healthz))
        .route("/metrics", get(ops::metrics))
        .route("/sessions", post(sessions::create).get(sessions::list))
        .route(
            "/sessions/{session_id}",
            get(sessions::get).delete(sessions::delete),
        )
        .route(
            "/sessions/{session_id}/contexts",
            post(contexts::create).get(contexts::list),
        )
        .route(
            "/sessions/{session_id}/contexts/{context_id}",
            get(contexts::get).delete(contexts::delete),
        )
        .route(
            "/sessions/{session_id}/contexts/{context_id}/pages",
            post(pages::create).get(pages::list),
        )
        .route(
            "/sessions/{session_id}/contexts/{context_id}/pages/{page_id}",
            get(pages::get).delete(pages::delete),
        )
        .route(
            "/sessions/{session_id}/contexts/{context_id}/pages/{page_id}/navigate",
            post(pages::navigate),
        )
        .route("/sessions/{session_id}/execute", post(actions::execute))
        .route(
            "/sessions/{session_id}/execute/batch",
            post(actions::execute_batch),
        )
        .route(
            "/sessions/{session_id}/history",
            get(actions::history),
        )
}
