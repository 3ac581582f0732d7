//! `ControlPlane` service implementation (spec §6 "gRPC surface").

use std::{pin::Pin, sync::Arc};

use futures::Stream;
use navigant_actions::CallerContext;
use navigant_pages::ContextType;
use navigant_protocol::Action;
use tokio_stream::{StreamExt, wrappers::BroadcastStream};
use tonic::{Request, Response, Status};

use crate::{
    auth::Credential,
    grpc::pb::{
        self,
        control_plane_server::ControlPlane,
    },
    state::GatewayState,
};

pub struct ControlPlaneService {
    state: Arc<GatewayState>,
}

impl ControlPlaneService {
    #[must_use]
    pub fn new(state: Arc<GatewayState>) -> Self {
        Self { state }
    }

    async fn authenticate<T>(&self, request: &Request<T>) -> Result<crate::auth::CallerIdentity, Status> {
        let credential = Credential::from_grpc_metadata(request.metadata());
        self.state
            .authenticator
            .authenticate(&credential)
            .await
            .map_err(Status::from)
    }
}

#[tonic::async_trait]
impl ControlPlane for ControlPlaneService {
    async fn create_session(
        &self,
        request: Request<pb::CreateSessionRequest>,
    ) -> Result<Response<pb::SessionReply>, Status> {
        let identity = self.authenticate(&request).await?;
        let req = request.into_inner();
        let user_id = if identity.is_admin() && !req.user_id.is_empty() {
            req.user_id
        } else {
            identity.user_id
        };
        let ttl = req.ttl_seconds.map(|s| chrono::Duration::seconds(s as i64));
        let session = self
            .state
            .sessions
            .create(user_id, req.username, ttl)
            .await
            .map_err(crate::error::GatewayError::from)?;
        Ok(Response::new(session_reply(&session)))
    }

    async fn get_session(
        &self,
        request: Request<pb::SessionIdRequest>,
    ) -> Result<Response<pb::SessionReply>, Status> {
        let identity = self.authenticate(&request).await?;
        let req = request.into_inner();
        self.state
            .sessions
            .check_access(&req.session_id, &identity.user_id, identity.is_admin())
            .map_err(crate::error::GatewayError::from)?;
        let session = self
            .state
            .sessions
            .get(&req.session_id)
            .map_err(crate::error::GatewayError::from)?;
        Ok(Response::new(session_reply(&session)))
    }

    async fn delete_session(
        &self,
        request: Request<pb::SessionIdRequest>,
    ) -> Result<Response<pb::Empty>, Status> {
        let identity = self.authenticate(&request).await?;
        let req = request.into_inner();
        self.state
            .sessions
            .check_access(&req.session_id, &identity.user_id, identity.is_admin())
            .map_err(crate::error::GatewayError::from)?;
        self.state.contexts.destroy_by_session(&req.session_id);
        self.state.pages.close_by_session(&req.session_id).await;
        self.state
            .sessions
            .delete(&req.session_id)
            .await
            .map_err(crate::error::GatewayError::from)?;
        Ok(Response::new(pb::Empty {}))
    }

    async fn list_sessions(
        &self,
        request: Request<pb::ListSessionsRequest>,
    ) -> Result<Response<pb::ListSessionsReply>, Status> {
        let identity = self.authenticate(&request).await?;
        let req = request.into_inner();
        let filter = navigant_sessions::SessionFilter {
            user_id: if identity.is_admin() {
                req.user_id
            } else {
                Some(identity.user_id)
            },
            ids: None,
            status: req.status.as_deref().and_then(parse_status),
        };
        let sessions = self.state.sessions.list(&filter);
        Ok(Response::new(pb::ListSessionsReply {
            sessions: sessions.iter().map(session_reply).collect(),
        }))
    }

    async fn create_context(
        &self,
        request: Request<pb::CreateContextRequest>,
    ) -> Result<Response<pb::ContextReply>, Status> {
        let identity = self.authenticate(&request).await?;
        let req = request.into_inner();
        self.state
            .sessions
            .check_access(&req.session_id, &identity.user_id, identity.is_admin())
            .map_err(crate::error::GatewayError::from)?;
        let context_type = match req.context_type.as_str() {
            "incognito" => ContextType::Incognito,
            _ => ContextType::Default,
        };
        let context = self.state.contexts.create(req.session_id, context_type);
        Ok(Response::new(pb::ContextReply {
            id: context.id,
            session_id: context.session_id,
            context_type: req.context_type,
        }))
    }

    async fn create_page(
        &self,
        request: Request<pb::CreatePageRequest>,
    ) -> Result<Response<pb::PageReply>, Status> {
        let identity = self.authenticate(&request).await?;
        let req = request.into_inner();
        self.state
            .sessions
            .check_access(&req.session_id, &identity.user_id, identity.is_admin())
            .map_err(crate::error::GatewayError::from)?;
        self.state
            .contexts
            .check_access(&req.context_id, &req.session_id, identity.is_admin())
            .map_err(crate::error::GatewayError::from)?;

        let browser_handle = self
            .state
            .pool
            .acquire(&req.session_id)
            .await
            .map_err(crate::error::GatewayError::from)?;
        let info = self
            .state
            .pages
            .create_page(&req.context_id, &req.session_id, browser_handle, Default::default())
            .await
            .map_err(crate::error::GatewayError::from)?;
        Ok(Response::new(pb::PageReply {
            id: info.id,
            context_id: info.context_id,
            session_id: info.session_id,
            browser_id: info.browser_id,
            state: format!("{:?}", info.state).to_lowercase(),
        }))
    }

    async fn execute_action(
        &self,
        request: Request<pb::ExecuteActionRequest>,
    ) -> Result<Response<pb::ActionResultReply>, Status> {
        let identity = self.authenticate(&request).await?;
        let req = request.into_inner();
        self.state
            .sessions
            .check_access(&req.session_id, &identity.user_id, identity.is_admin())
            .map_err(crate::error::GatewayError::from)?;
        self.state
            .contexts
            .check_access(&req.context_id, &req.session_id, identity.is_admin())
            .map_err(crate::error::GatewayError::from)?;

        let action: Action = serde_json::from_str(&req.action_json)
            .map_err(|e| Status::invalid_argument(format!("invalid action_json: {e}")))?;
        let ctx = CallerContext::new(req.session_id, req.context_id);
        let result = self.state.executor.execute(action, &ctx).await;
        Ok(Response::new(pb::ActionResultReply {
            success: result.success,
            action_type: result.action_type.clone(),
            result_json: serde_json::to_string(&result).unwrap_or_default(),
        }))
    }

    type StreamSessionEventsStream =
        Pin<Box<dyn Stream<Item = Result<pb::SessionEvent, Status>> + Send + 'static>>;

    async fn stream_session_events(
        &self,
        request: Request<pb::StreamSessionEventsRequest>,
    ) -> Result<Response<Self::StreamSessionEventsStream>, Status> {
        let identity = self.authenticate(&request).await?;
        let req = request.into_inner();
        let is_admin = identity.is_admin();
        let caller_user_id = identity.user_id;

        let receiver = self.state.sessions.subscribe();
        let stream = BroadcastStream::new(receiver).filter_map(move |event| {
            let event = event.ok()?;
            let (event_type, session) = match &event {
                navigant_sessions::SessionEvent::Created(s) => ("session_created", Some(s.clone())),
                navigant_sessions::SessionEvent::Updated(s) => ("session_updated", Some(s.clone())),
                navigant_sessions::SessionEvent::Touched(_) => ("session_touched", None),
                navigant_sessions::SessionEvent::Deleted(_) => ("session_deleted", None),
            };

            if let Some(want_type) = &req.event_type {
                if want_type != event_type {
                    return None;
                }
            }

            let owner = session.as_ref().map(|s| s.user_id.clone());
            if !is_admin && owner.as_deref().is_some_and(|o| o != caller_user_id) {
                return None;
            }
            if let Some(want_user) = &req.user_id {
                if owner.as_deref() != Some(want_user.as_str()) {
                    return None;
                }
            }
            let session_id = session.as_ref().map(|s| s.id.clone()).unwrap_or_default();
            if let Some(want_session) = &req.session_id {
                if &session_id != want_session {
                    return None;
                }
            }

            let data_json = session
                .map(|s| serde_json::to_string(&s).unwrap_or_default())
                .unwrap_or_default();
            Some(Ok(pb::SessionEvent {
                channel: req.channel.clone().unwrap_or_else(|| "session:events".to_string()),
                event_type: event_type.to_string(),
                session_id,
                data_json,
                timestamp: chrono::Utc::now().to_rfc3339(),
            }))
        });

        Ok(Response::new(Box::pin(stream)))
    }
}

fn session_reply(session: &navigant_sessions::Session) -> pb::SessionReply {
    pb::SessionReply {
        id: session.id.clone(),
        user_id: session.user_id.clone(),
        username: session.username.clone(),
        state: format!("{:?}", session.state).to_lowercase(),
        created_at: session.created_at.to_rfc3339(),
        expires_at: session.expires_at.to_rfc3339(),
    }
}

fn parse_status(s: &str) -> Option<navigant_sessions::SessionState> {
    use navigant_sessions::SessionState::*;
    match s {
        "creating" => Some(Creating),
        "active" => Some(Active),
        "idle" => Some(Idle),
        "expiring" => Some(Expiring),
        "terminated" => Some(Terminated),
        _ => None,
    }
}
