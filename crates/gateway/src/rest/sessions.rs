//! Session CRUD (spec §6 "Session CRUD under `/sessions`").

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::HeaderMap,
};
use navigant_sessions::{SessionFilter, SessionState};
use serde::Deserialize;

use crate::{error::GatewayError, rest::authenticate, state::GatewayState};

#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default, rename = "ttlSeconds")]
    pub ttl_seconds: Option<i64>,
}

pub async fn create(
    State(state): State<Arc<GatewayState>>,
    headers: HeaderMap,
    Json(body): Json<CreateSessionRequest>,
) -> Result<Json<serde_json::Value>, GatewayError> {
    let identity = authenticate(&state, &headers).await?;
    let ttl = body.ttl_seconds.map(chrono::Duration::seconds);
    let username = body.username.unwrap_or_else(|| identity.user_id.clone());
    let session = state.sessions.create(identity.user_id, username, ttl).await?;
    Ok(Json(serde_json::to_value(session).unwrap_or_default()))
}

#[derive(Debug, Deserialize)]
pub struct ListSessionsQuery {
    #[serde(default)]
    pub status: Option<String>,
}

pub async fn list(
    State(state): State<Arc<GatewayState>>,
    headers: HeaderMap,
    Query(query): Query<ListSessionsQuery>,
) -> Result<Json<serde_json::Value>, GatewayError> {
    let identity = authenticate(&state, &headers).await?;
    let status = query.status.as_deref().and_then(parse_status);
    let filter = SessionFilter {
        user_id: (!identity.is_admin()).then_some(identity.user_id),
        ids: None,
        status,
    };
    let sessions = state.sessions.list(&filter);
    Ok(Json(serde_json::to_value(sessions).unwrap_or_default()))
}

pub async fn get(
    State(state): State<Arc<GatewayState>>,
    headers: HeaderMap,
    Path(session_id): Path<String>,
) -> Result<Json<serde_json::Value>, GatewayError> {
    let identity = authenticate(&state, &headers).await?;
    state
        .sessions
        .check_access(&session_id, &identity.user_id, identity.is_admin())?;
    let session = state.sessions.get(&session_id)?;
    Ok(Json(serde_json::to_value(session).unwrap_or_default()))
}

pub async fn delete(
    State(state): State<Arc<GatewayState>>,
    headers: HeaderMap,
    Path(session_id): Path<String>,
) -> Result<Json<serde_json::Value>, GatewayError> {
    let identity = authenticate(&state, &headers).await?;
    state
        .sessions
        .check_access(&session_id, &identity.user_id, identity.is_admin())?;

    state.contexts.destroy_by_session(&session_id);
    state.pages.close_by_session(&session_id).await;
    state.sessions.delete(&session_id).await?;
    Ok(Json(serde_json::json!({ "deleted": session_id })))
}

fn parse_status(s: &str) -> Option<SessionState> {
    match s {
        "creating" => Some(SessionState::Creating),
        "active" => Some(SessionState::Active),
        "idle" => Some(SessionState::Idle),
        "expiring" => Some(SessionState::Expiring),
        "terminated" => Some(SessionState::Terminated),
        _ => None,
    }
}
