//! `POST /sessions/{id}/execute` and the batch/history extensions
//! (spec §6, SPEC_FULL §4 "Batch execution" / "Audit ring buffer query API").

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::HeaderMap,
};
use navigant_actions::CallerContext;
use navigant_protocol::Action;
use serde::Deserialize;

use crate::{error::GatewayError, rest::authenticate, state::GatewayState};

#[derive(Debug, Deserialize)]
pub struct ExecuteRequest {
    #[serde(rename = "contextId")]
    pub context_id: String,
    pub action: Action,
}

pub async fn execute(
    State(state): State<Arc<GatewayState>>,
    headers: HeaderMap,
    Path(session_id): Path<String>,
    Json(body): Json<ExecuteRequest>,
) -> Result<Json<serde_json::Value>, GatewayError> {
    let identity = authenticate(&state, &headers).await?;
    state
        .sessions
        .check_access(&session_id, &identity.user_id, identity.is_admin())?;
    state
        .contexts
        .check_access(&body.context_id, &session_id, identity.is_admin())?;

    let ctx = CallerContext::new(session_id, body.context_id);
    let result = state.executor.execute(body.action, &ctx).await;
    Ok(Json(serde_json::to_value(result).unwrap_or_default()))
}

#[derive(Debug, Deserialize)]
pub struct ExecuteBatchRequest {
    #[serde(rename = "contextId")]
    pub context_id: String,
    pub actions: Vec<Action>,
}

pub async fn execute_batch(
    State(state): State<Arc<GatewayState>>,
    headers: HeaderMap,
    Path(session_id): Path<String>,
    Json(body): Json<ExecuteBatchRequest>,
) -> Result<Json<serde_json::Value>, GatewayError> {
    let identity = authenticate(&state, &headers).await?;
    state
        .sessions
        .check_access(&session_id, &identity.user_id, identity.is_admin())?;
    state
        .contexts
        .check_access(&body.context_id, &session_id, identity.is_admin())?;

    if body.actions.len() > state.config.action_max_batch {
        return Err(GatewayError::BatchTooLarge(
            body.actions.len(),
            state.config.action_max_batch,
        ));
    }

    let ctx = CallerContext::new(session_id, body.context_id);
    let results = state.executor.execute_batch(body.actions, &ctx).await?;
    Ok(Json(serde_json::to_value(results).unwrap_or_default()))
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    #[serde(rename = "contextId")]
    pub context_id: String,
    #[serde(default = "default_history_limit")]
    pub limit: usize,
}

fn default_history_limit() -> usize {
    50
}

pub async fn history(
    State(state): State<Arc<GatewayState>>,
    headers: HeaderMap,
    Path(session_id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<serde_json::Value>, GatewayError> {
    let identity = authenticate(&state, &headers).await?;
    state
        .sessions
        .check_access(&session_id, &identity.user_id, identity.is_admin())?;
    state
        .contexts
        .check_access(&query.context_id, &session_id, identity.is_admin())?;

    let entries = state
        .executor
        .history(&session_id, &query.context_id, query.limit)
        .await;
    let entries: Vec<_> = entries
        .into_iter()
        .map(|e| serde_json::json!({ "actionType": e.action_type, "result": e.result }))
        .collect();
    Ok(Json(serde_json::json!({ "entries": entries })))
}
