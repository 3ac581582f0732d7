//! Shared gateway runtime state (spec §9 "constructors take every
//! collaborator explicitly; modules must not observe each other through
//! module-level imports").

use std::sync::Arc;

use chrono::Utc;
use navigant_actions::ActionExecutor;
use navigant_browser::BrowserPool;
use navigant_pages::{ContextRegistry, PageManager};
use navigant_sessions::SessionStore;
use tracing::info;

use crate::{
    auth::Authenticator,
    config::GatewayConfig,
    ws::{FabricEvent, WsFabric},
};

pub struct GatewayState {
    pub config: GatewayConfig,
    pub sessions: Arc<SessionStore>,
    pub contexts: Arc<ContextRegistry>,
    pub pages: Arc<PageManager>,
    pub pool: Arc<BrowserPool>,
    pub executor: Arc<ActionExecutor>,
    pub authenticator: Arc<dyn Authenticator>,
    pub ws: Arc<WsFabric>,
    pub metrics: Option<navigant_metrics::MetricsHandle>,
    pub started_at: chrono::DateTime<Utc>,
}

impl GatewayState {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: GatewayConfig,
        sessions: Arc<SessionStore>,
        contexts: Arc<ContextRegistry>,
        pages: Arc<PageManager>,
        pool: Arc<BrowserPool>,
        executor: Arc<ActionExecutor>,
        authenticator: Arc<dyn Authenticator>,
        metrics: Option<navigant_metrics::MetricsHandle>,
    ) -> Arc<Self> {
        Arc::new(Self {
            config,
            sessions,
            contexts,
            pages,
            pool,
            executor,
            authenticator,
            ws: Arc::new(WsFabric::new()),
            metrics,
            started_at: Utc::now(),
        })
    }

    /// Bridges session/page lifecycle events into the WebSocket fabric as
    /// `browser_event` frames (spec §4.5 "On each source event ... the
    /// fabric evaluates every subscription"). Spawned once at startup.
    pub fn spawn_event_bridges(self: &Arc<Self>) {
        self.pool.spawn_maintenance();
        self.sessions.spawn_maintenance(self.config.session_cleanup_interval);
        self.pages.spawn_maintenance(self.config.session_cleanup_interval, self.config.pool_idle_timeout);

        let state = self.clone();
        tokio::spawn(async move {
            let mut events = state.sessions.subscribe();
            loop {
                match events.recv().await {
                    Ok(event) => state.publish_session_event(event),
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                        info!(skipped, "ws bridge: session event receiver lagged");
                    },
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        let state = self.clone();
        tokio::spawn(async move {
            let mut events = state.pages.subscribe();
            loop {
                match events.recv().await {
                    Ok(event) => state.publish_page_event(event),
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                        info!(skipped, "ws bridge: page event receiver lagged");
                    },
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
        });
    }

    fn publish_session_event(&self, event: navigant_sessions::SessionEvent) {
        use navigant_sessions::SessionEvent;

        let (event_type, session_id, owner, payload) = match event {
            SessionEvent::Created(s) => ("session_created", s.id.clone(), Some(s.user_id.clone()), serde_json::to_value(&s)),
            SessionEvent::Updated(s) => ("session_updated", s.id.clone(), Some(s.user_id.clone()), serde_json::to_value(&s)),
            SessionEvent::Touched(id) => ("session_touched", id.clone(), None, Ok(serde_json::json!({"id": id}))),
            SessionEvent::Deleted(id) => ("session_deleted", id.clone(), None, Ok(serde_json::json!({"id": id}))),
        };
        let Ok(data) = payload else { return };

        let frame = navigant_protocol::wire::WsEnvelope::new(
            "browser_event",
            serde_json::to_value(navigant_protocol::wire::BrowserEventPayload {
                session_id: session_id.clone(),
                context_id: String::new(),
                page_id: None,
                event: event_type.to_string(),
                data,
                timestamp: Utc::now(),
            })
            .unwrap_or_default(),
        );

        self.ws.publish(&FabricEvent {
            channel: "session:events".to_string(),
            frame: serde_json::to_string(&frame).unwrap_or_default(),
            fields: std::collections::HashMap::from([(
                "sessionId".to_string(),
                serde_json::Value::String(session_id),
            )]),
            owner_user_id: owner,
        });
    }

    fn publish_page_event(&self, event: navigant_pages::PageEvent) {
        use navigant_pages::PageEvent;

        let (event_type, info) = match event {
            PageEvent::Created(info) => ("page_created", Some(info)),
            PageEvent::Navigated(info) => ("page_navigated", Some(info)),
            PageEvent::StateChanged(info) => ("page_state_changed", Some(info)),
            PageEvent::Error(info) => ("page_error", Some(info)),
            PageEvent::Closed(_) => ("page_closed", None),
        };
        let Some(info) = info else { return };

        let frame = navigant_protocol::wire::WsEnvelope::new(
            "browser_event",
            serde_json::to_value(navigant_protocol::wire::BrowserEventPayload {
                session_id: info.session_id.clone(),
                context_id: info.context_id.clone(),
                page_id: Some(info.id.clone()),
                event: event_type.to_string(),
                data: serde_json::to_value(&info).unwrap_or_default(),
                timestamp: Utc::now(),
            })
            .unwrap_or_default(),
        );

        self.ws.publish(&FabricEvent {
            channel: "browser:navigation".to_string(),
            frame: serde_json::to_string(&frame).unwrap_or_default(),
            fields: std::collections::HashMap::from([
                ("sessionId".to_string(), serde_json::Value::String(info.session_id.clone())),
                ("pageId".to_string(), serde_json::Value::String(info.id)),
            ]),
            owner_user_id: None,
        });
    }
}
