//! Per-connection state machine and message loop (spec §4.5 "connecting ->
//! connected -> authenticated -> (subscribed*) -> (terminating) -> closed").

use std::{collections::HashMap, sync::Arc};

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use navigant_protocol::wire::{self, WsEnvelope};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::{
    auth::Credential,
    state::GatewayState,
    ws::fabric::ConnectionState,
};

/// Pre-auth frames are queued up to this many before the connection is
/// dropped with `QUEUE_OVERFLOW` (spec §4.5).
const PRE_AUTH_QUEUE_CAP: usize = 32;

pub async fn handle_connection(socket: WebSocket, state: Arc<GatewayState>) {
    let conn_id = navigant_common::ids::new_id("conn");
    info!(conn_id = %conn_id, "ws: connection opened");

    let (mut ws_tx, mut ws_rx) = socket.split();
    let (client_tx, mut client_rx) = mpsc::unbounded_channel::<String>();

    let write_conn_id = conn_id.clone();
    let write_handle = tokio::spawn(async move {
        while let Some(frame) = client_rx.recv().await {
            if ws_tx.send(Message::Text(frame.into())).await.is_err() {
                debug!(conn_id = %write_conn_id, "ws: write loop closed");
                break;
            }
        }
    });

    state.ws.register(crate::ws::fabric::Connection {
        conn_id: conn_id.clone(),
        sender: client_tx.clone(),
        state: ConnectionState::Connected,
        user_id: None,
        is_admin: false,
        subscriptions: Vec::new(),
    });

    let mut pre_auth_queue: Vec<WsEnvelope> = Vec::new();
    let mut authenticated = false;

    while let Some(message) = ws_rx.next().await {
        let Ok(message) = message else {
            break;
        };
        let Message::Text(text) = message else {
            continue;
        };
        let Ok(envelope) = serde_json::from_str::<WsEnvelope>(&text) else {
            let _ = client_tx.send(json(&wire::frame::error("BAD_FRAME", "invalid JSON envelope")));
            continue;
        };

        if !authenticated && envelope.frame_type != "auth" {
            if pre_auth_queue.len() >= PRE_AUTH_QUEUE_CAP {
                let _ = client_tx.send(json(&wire::frame::error(
                    "QUEUE_OVERFLOW",
                    "too many messages received before authentication",
                )));
                break;
            }
            pre_auth_queue.push(envelope);
            continue;
        }

        match envelope.frame_type.as_str() {
            "auth" => {
                let payload: crate::auth::Credential = envelope
                    .payload
                    .as_ref()
                    .and_then(|p| {
                        let auth: wire::AuthPayload = serde_json::from_value(p.clone()).ok()?;
                        Some(Credential {
                            api_key: auth.api_key,
                            bearer: auth.bearer,
                        })
                    })
                    .unwrap_or_default();

                match state.authenticator.authenticate(&payload).await {
                    Ok(identity) => {
                        authenticated = true;
                        state
                            .ws
                            .set_authenticated(&conn_id, identity.user_id.clone(), identity.is_admin());
                        let _ = client_tx.send(json(&wire::frame::auth_success()));
                        info!(conn_id = %conn_id, user_id = %identity.user_id, "ws: authenticated");

                        let queued = std::mem::take(&mut pre_auth_queue);
                        for queued_envelope in queued {
                            handle_authenticated_frame(&state, &conn_id, &identity, queued_envelope, &client_tx);
                        }
                    },
                    Err(e) => {
                        let _ = client_tx.send(json(&wire::frame::auth_failed(e.to_string())));
                        warn!(conn_id = %conn_id, "ws: authentication failed");
                        break;
                    },
                }
            },
            _ if authenticated => {
                let identity = crate::auth::CallerIdentity {
                    user_id: state
                        .ws
                        .connection_user_id(&conn_id)
                        .unwrap_or_default(),
                    roles: if state.ws.connection_is_admin(&conn_id) {
                        std::collections::HashSet::from(["admin".to_string()])
                    } else {
                        std::collections::HashSet::new()
                    },
                };
                handle_authenticated_frame(&state, &conn_id, &identity, envelope, &client_tx);
            },
            _ => {},
        }
    }

    state.ws.set_state(&conn_id, ConnectionState::Terminating);
    state.ws.remove(&conn_id);
    write_handle.abort();
    info!(conn_id = %conn_id, "ws: connection closed");
}

fn handle_authenticated_frame(
    state: &Arc<GatewayState>,
    conn_id: &str,
    identity: &crate::auth::CallerIdentity,
    envelope: WsEnvelope,
    client_tx: &mpsc::UnboundedSender<String>,
) {
    match envelope.frame_type.as_str() {
        "subscribe" => {
            let Some(wire::WsPayload::Subscribe(sub)) = envelope.typed() else {
                let _ = client_tx.send(json(&wire::frame::error("BAD_FRAME", "invalid subscribe payload")));
                return;
            };
            if !channel_authorized(&sub, identity) {
                let _ = client_tx.send(json(&wire::frame::error(
                    "ACCESS_DENIED",
                    "subscription is not scoped to the caller's own user or session",
                )));
                return;
            }
            let filters: HashMap<String, serde_json::Value> = sub
                .filters
                .map(|m| m.into_iter().collect())
                .unwrap_or_default();
            state.ws.subscribe(conn_id, sub.channel.clone(), filters);
            let _ = client_tx.send(json(&wire::frame::subscribed(sub.channel)));
        },
        "unsubscribe" => {
            let Some(wire::WsPayload::Unsubscribe(sub)) = envelope.typed() else {
                return;
            };
            state.ws.unsubscribe(conn_id, &sub.channel);
            let _ = client_tx.send(json(&wire::frame::unsubscribed(sub.channel)));
        },
        other => {
            debug!(frame_type = other, "ws: ignoring unrecognized frame type");
        },
    }
}

/// A non-admin may only subscribe to channels whose `filters` scope the
/// subscription to its own `userId` (spec §4.5 "Each subscription is
/// authorized").
fn channel_authorized(sub: &wire::SubscribePayload, identity: &crate::auth::CallerIdentity) -> bool {
    if identity.is_admin() {
        return true;
    }
    sub.filters
        .as_ref()
        .and_then(|f| f.get("userId"))
        .and_then(|v| v.as_str())
        .is_some_and(|user_id| user_id == identity.user_id)
}

fn json(envelope: &WsEnvelope) -> String {
    serde_json::to_string(envelope).unwrap_or_default()
}
