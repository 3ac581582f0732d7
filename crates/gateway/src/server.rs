//! HTTP/WebSocket/gRPC server assembly and graceful shutdown sequencing
//! (SPEC_FULL §4 "Graceful shutdown sequencing"), grounded on the teacher's
//! `server.rs` middleware stack and `axum::serve` startup.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::{
    Router,
    extract::{State, WebSocketUpgrade},
    response::IntoResponse,
    routing::get,
};
use tonic::transport::Server as TonicServer;
use tower_http::{
    catch_panic::CatchPanicLayer,
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    sensitive_headers::SetSensitiveHeadersLayer,
    trace::{DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, info};

use crate::{grpc::ControlPlaneService, rest, state::GatewayState, ws};

/// Builds the REST + WebSocket router with the full middleware stack applied
/// (layer order mirrors the teacher's `apply_middleware_stack`: outermost
/// panic-catch down to innermost compression).
pub fn build_router(state: Arc<GatewayState>) -> Router {
    let router = rest::router()
        .route("/ws", get(ws_upgrade_handler))
        .with_state(state);

    let trace = TraceLayer::new_for_http()
        .on_request(DefaultOnRequest::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    router
        .layer(CompressionLayer::new())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .layer(trace)
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(SetSensitiveHeadersLayer::new([
            axum::http::header::AUTHORIZATION,
            axum::http::header::COOKIE,
        ]))
        .layer(CatchPanicLayer::new())
}

async fn ws_upgrade_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<GatewayState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| ws::handle_connection(socket, state))
}

/// Runs the REST/WebSocket listener on `config.port` and the gRPC listener on
/// `config.port + 1` concurrently until `shutdown` resolves, then drains in
/// the order spec §4.6/§4.1/§4.5 prescribe: stop accepting, flush sessions,
/// abort background tasks.
pub async fn serve(
    state: Arc<GatewayState>,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    state.spawn_event_bridges();

    let bind: std::net::IpAddr = state.config.bind.parse().unwrap_or(std::net::IpAddr::from([0, 0, 0, 0]));
    let http_addr = SocketAddr::new(bind, state.config.port);
    let grpc_addr = SocketAddr::new(bind, state.config.port + 1);

    let http_router = build_router(state.clone()).into_make_service();
    let http_listener = tokio::net::TcpListener::bind(http_addr).await?;
    info!(%http_addr, "gateway: REST/WebSocket listener bound");

    let grpc_service = ControlPlaneService::new(state.clone());
    info!(%grpc_addr, "gateway: gRPC listener bound");

    let (stop_tx, _) = tokio::sync::broadcast::channel::<()>(1);
    let mut http_stop = stop_tx.subscribe();
    let mut grpc_stop = stop_tx.subscribe();
    tokio::spawn(async move {
        shutdown.await;
        let _ = stop_tx.send(());
    });

    let http_task = tokio::spawn(async move {
        axum::serve(http_listener, http_router)
            .with_graceful_shutdown(async move {
                let _ = http_stop.recv().await;
            })
            .await
    });

    let grpc_task = tokio::spawn(async move {
        TonicServer::builder()
            .add_service(crate::grpc::pb::control_plane_server::ControlPlaneServer::new(
                grpc_service,
            ))
            .serve_with_shutdown(grpc_addr, async move {
                let _ = grpc_stop.recv().await;
            })
            .await
    });

    let (http_result, grpc_result) = tokio::join!(http_task, grpc_task);
    http_result??;
    grpc_result??;

    info!("gateway: listeners stopped, draining state");
    state.sessions.flush().await;
    let closed = ws_drain(&state).await;
    if closed > 0 {
        info!(closed, "gateway: drained remaining websocket connections");
    }
    state.pool.shutdown(false).await;
    info!("gateway: shutdown complete");
    Ok(())
}

async fn ws_drain(state: &Arc<GatewayState>) -> usize {
    let mut waited = 0;
    while state.ws.connection_count() > 0 && waited < 50 {
        tokio::time::sleep(Duration::from_millis(100)).await;
        waited += 1;
    }
    state.ws.connection_count()
}
