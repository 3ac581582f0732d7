//! Page CRUD (spec §6 "page CRUD under
//! `/sessions/{id}/contexts/{id}/pages`").

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::HeaderMap,
};
use navigant_pages::PageCreateOptions;
use serde::Deserialize;

use crate::{error::GatewayError, rest::authenticate, state::GatewayState};

pub async fn create(
    State(state): State<Arc<GatewayState>>,
    headers: HeaderMap,
    Path((session_id, context_id)): Path<(String, String)>,
    Json(options): Json<PageCreateOptions>,
) -> Result<Json<serde_json::Value>, GatewayError> {
    let identity = authenticate(&state, &headers).await?;
    state
        .sessions
        .check_access(&session_id, &identity.user_id, identity.is_admin())?;
    state
        .contexts
        .check_access(&context_id, &session_id, identity.is_admin())?;

    let browser_handle = state.pool.acquire(&session_id).await?;
    let info = state
        .pages
        .create_page(&context_id, &session_id, browser_handle, options)
        .await?;
    Ok(Json(serde_json::to_value(info).unwrap_or_default()))
}

pub async fn list(
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

    let ids = state.pages.list_by_context(&context_id);
    let mut infos = Vec::with_capacity(ids.len());
    for id in ids {
        if let Ok(info) = state.pages.get_info(&id, &session_id).await {
            infos.push(info);
        }
    }
    Ok(Json(serde_json::to_value(infos).unwrap_or_default()))
}

pub async fn get(
    State(state): State<Arc<GatewayState>>,
    headers: HeaderMap,
    Path((session_id, _context_id, page_id)): Path<(String, String, String)>,
) -> Result<Json<serde_json::Value>, GatewayError> {
    let identity = authenticate(&state, &headers).await?;
    state
        .sessions
        .check_access(&session_id, &identity.user_id, identity.is_admin())?;
    let info = state.pages.get_info(&page_id, &session_id).await?;
    Ok(Json(serde_json::to_value(info).unwrap_or_default()))
}

pub async fn delete(
    State(state): State<Arc<GatewayState>>,
    headers: HeaderMap,
    Path((session_id, _context_id, page_id)): Path<(String, String, String)>,
) -> Result<Json<serde_json::Value>, GatewayError> {
    let identity = authenticate(&state, &headers).await?;
    state
        .sessions
        .check_access(&session_id, &identity.user_id, identity.is_admin())?;
    state.pages.close(&page_id, &session_id).await?;
    Ok(Json(serde_json::json!({ "deleted": page_id })))
}

#[derive(Debug, Deserialize)]
pub struct NavigateRequest {
    pub url: String,
}

pub async fn navigate(
    State(state): State<Arc<GatewayState>>,
    headers: HeaderMap,
    Path((session_id, _context_id, page_id)): Path<(String, String, String)>,
    Json(body): Json<NavigateRequest>,
) -> Result<Json<serde_json::Value>, GatewayError> {
    let identity = authenticate(&state, &headers).await?;
    state
        .sessions
        .check_access(&session_id, &identity.user_id, identity.is_admin())?;
    let info = state.pages.navigate(&page_id, &body.url, &session_id).await?;
    Ok(Json(serde_json::to_value(info).unwrap_or_default()))
}
