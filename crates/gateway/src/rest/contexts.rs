//! Context CRUD (spec §6 "context CRUD under `/sessions/{id}/contexts`").

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::HeaderMap,
};
use navigant_pages::ContextType;
use serde::Deserialize;

use crate::{error::GatewayError, rest::authenticate, state::GatewayState};

#[derive(Debug, Deserialize, Default)]
pub struct CreateContextRequest {
    #[serde(default, rename = "type")]
    pub context_type: Option<String>,
}

pub async fn create(
    State(state): State<Arc<GatewayState>>,
    headers: HeaderMap,
    Path(session_id): Path<String>,
    Json(body): Json<CreateContextRequest>,
) -> Result<Json<serde_json::Value>, GatewayError> {
    let identity = authenticate(&state, &headers).await?;
    state
        .sessions
        .check_access(&session_id, &identity.user_id, identity.is_admin())?;

    let context_type = match body.context_type.as_deref() {
        Some("incognito") => ContextType::Incognito,
        _ => ContextType::Default,
    };
    let context = state.contexts.create(session_id, context_type);
    Ok(Json(serde_json::to_value(context).unwrap_or_default()))
}

pub async fn list(
    State(state): State<Arc<GatewayState>>,
    headers: HeaderMap,
    Path(session_id): Path<String>,
) -> Result<Json<serde_json::Value>, GatewayError> {
    let identity = authenticate(&state, &headers).await?;
    state
        .sessions
        .check_access(&session_id, &identity.user_id, identity.is_admin())?;
    let contexts = state.contexts.list_by_session(&session_id);
    Ok(Json(serde_json::to_value(contexts).unwrap_or_default()))
}

pub async fn get(
    State(state): State<Arc<GatewayState>>,
    headers: HeaderMap,
    Path((session_id, context_id)): Path<(String, String)>,
) -> Result<Json<serde_json::Value>, GatewayError> {
    let identity = authenticate(&state, &headers).await?;
    state
        .sessions
        .check_access(&session_id, &identity.user_id, identity.is_admin())?;
    let context = state
        .contexts
        .check_access(&context_id, &session_id, identity.is_admin())?;
    Ok(Json(serde_json::to_value(context).unwrap_or_default()))
}

pub async fn delete(
    State(state): State<Arc<GatewayState>>,
    headers: HeaderMap,
    Path((session_id, context_id)): Path<(String, String)>,
) -> Result<Json<serde_json::Value>, GatewayError> {
    let identity = authenticate(&state, &headers).await?;
    state
        .sessions
        .check_access(&session_id, &identity.user_id, identity.is_admin())?;
    state
        .contexts
        .check_access(&context_id, &session_id, identity.is_admin())?;

    state.pages.close_by_context(&context_id).await;
    state.contexts.destroy(&context_id)?;
    Ok(Json(serde_json::json!({ "deleted": context_id })))
}
