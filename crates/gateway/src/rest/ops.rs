//! Ambient ops endpoints (SPEC_FULL §4 "Health/readiness endpoint"),
//! grounded on the teacher's `metrics_routes.rs`.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};

use crate::state::GatewayState;

pub async fn healthz(State(state): State<Arc<GatewayState>>) -> impl IntoResponse {
    let uptime_secs = (chrono::Utc::now() - state.started_at).num_seconds().max(0);
    let active_browsers = state.pool.active_count().await;
    axum::Json(serde_json::json!({
        "status": "ok",
        "uptimeSeconds": uptime_secs,
        "activeBrowsers": active_browsers,
        "activeConnections": state.ws.connection_count(),
    }))
}

pub async fn metrics(State(state): State<Arc<GatewayState>>) -> Response {
    match &state.metrics {
        Some(handle) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
            handle.render(),
        )
            .into_response(),
        None => (StatusCode::SERVICE_UNAVAILABLE, "metrics not enabled").into_response(),
    }
}
