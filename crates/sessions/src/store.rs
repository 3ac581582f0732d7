//! Session Store (C3): in-memory authoritative table of [`Session`] records
//! with batched durable persistence (spec §4.3, §4.6).

use std::{sync::Arc, time::Duration};

use chrono::Duration as ChronoDuration;
use dashmap::DashMap;
use tokio::sync::{Mutex, broadcast};
use tracing::{info, warn};

use crate::{
    error::SessionError,
    types::{Session, SessionEvent, SessionFilter, SessionState},
};

#[cfg(feature = "metrics")]
use navigant_metrics::session as session_metrics;

/// Durable persistence backend the store batches writes to. Treated as an
/// external collaborator (spec §1 "the durable session store backend");
/// this crate only defines the boundary and a no-op default.
#[async_trait::async_trait]
pub trait SessionPersistence: Send + Sync {
    async fn save_batch(&self, sessions: Vec<Session>) -> Result<(), SessionError>;
    async fn load_all(&self) -> Result<Vec<Session>, SessionError>;
}

/// Default persistence that discards writes; used when `SESSION_PERSIST=false`.
pub struct NoopPersistence;

#[async_trait::async_trait]
impl SessionPersistence for NoopPersistence {
    async fn save_batch(&self, _sessions: Vec<Session>) -> Result<(), SessionError> {
        Ok(())
    }

    async fn load_all(&self) -> Result<Vec<Session>, SessionError> {
        Ok(Vec::new())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SessionStoreConfig {
    pub default_ttl: ChronoDuration,
    pub max_per_user: usize,
    pub batch_size: usize,
    pub flush_interval: Duration,
}

impl Default for SessionStoreConfig {
    fn default() -> Self {
        Self {
            default_ttl: ChronoDuration::hours(1),
            max_per_user: 10,
            batch_size: 10,
            flush_interval: Duration::from_secs(5),
        }
    }
}

pub struct SessionStore {
    config: SessionStoreConfig,
    sessions: DashMap<String, Session>,
    pending: Mutex<Vec<Session>>,
    persistence: Arc<dyn SessionPersistence>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionStore {
    pub fn new(config: SessionStoreConfig, persistence: Arc<dyn SessionPersistence>) -> Self {
        let (events, _) = broadcast::channel(1024);
        Self {
            config,
            sessions: DashMap::new(),
            pending: Mutex::new(Vec::new()),
            persistence,
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: SessionEvent) {
        let _ = self.events.send(event);
    }

    /// Restores sessions from the durable backend at startup (spec §9 open
    /// question: recovery-on-startup is optional; this store performs it
    /// when persistence is enabled).
    pub async fn restore(&self) -> Result<usize, SessionError> {
        let restored = self.persistence.load_all().await?;
        let count = restored.len();
        for session in restored {
            self.sessions.insert(session.id.clone(), session);
        }
        Ok(count)
    }

    pub async fn create(
        &self,
        user_id: impl Into<String>,
        username: impl Into<String>,
        ttl: Option<ChronoDuration>,
    ) -> Result<Session, SessionError> {
        let user_id = user_id.into();
        let active_for_user = self
            .sessions
            .iter()
            .filter(|entry| entry.user_id == user_id && entry.state != SessionState::Terminated)
            .count();
        if active_for_user >= self.config.max_per_user {
            return Err(SessionError::LimitExceeded(user_id, self.config.max_per_user));
        }

        let mut session = Session::new(user_id, username, ttl.unwrap_or(self.config.default_ttl));
        session.state = SessionState::Active;
        self.sessions.insert(session.id.clone(), session.clone());
        self.queue_persist(session.clone()).await;
        self.emit(SessionEvent::Created(session.clone()));

        #[cfg(feature = "metrics")]
        navigant_metrics::counter!(session_metrics::CREATED_TOTAL).increment(1);

        Ok(session)
    }

    pub fn get(&self, id: &str) -> Result<Session, SessionError> {
        let entry = self
            .sessions
            .get(id)
            .ok_or_else(|| SessionError::NotFound(id.to_string()))?;
        if entry.is_expired() {
            return Err(SessionError::Expired(id.to_string()));
        }
        Ok(entry.clone())
    }

    pub async fn update(
        &self,
        id: &str,
        f: impl FnOnce(&mut Session),
    ) -> Result<Session, SessionError> {
        let updated = {
            let mut entry = self
                .sessions
                .get_mut(id)
                .ok_or_else(|| SessionError::NotFound(id.to_string()))?;
            f(&mut entry);
            entry.updated_at = chrono::Utc::now();
            entry.clone()
        };
        self.queue_persist(updated.clone()).await;
        self.emit(SessionEvent::Updated(updated.clone()));
        Ok(updated)
    }

    pub async fn touch(&self, id: &str) -> Result<Session, SessionError> {
        let updated = self
            .update(id, |s| s.touch())
            .await?;
        self.emit(SessionEvent::Touched(id.to_string()));
        Ok(updated)
    }

    pub async fn refresh(&self, id: &str, ttl: ChronoDuration) -> Result<Session, SessionError> {
        self.update(id, move |s| s.refresh(ttl)).await
    }

    pub async fn delete(&self, id: &str) -> Result<(), SessionError> {
        let removed = self.sessions.remove(id);
        if removed.is_none() {
            return Err(SessionError::NotFound(id.to_string()));
        }
        self.emit(SessionEvent::Deleted(id.to_string()));
        #[cfg(feature = "metrics")]
        navigant_metrics::counter!(session_metrics::TERMINATED_TOTAL).increment(1);
        Ok(())
    }

    pub fn list(&self, filter: &SessionFilter) -> Vec<Session> {
        self.sessions
            .iter()
            .map(|entry| entry.value().clone())
            .filter(|s| filter.user_id.as_deref().is_none_or(|u| s.user_id == u))
            .filter(|s| filter.ids.as_ref().is_none_or(|ids| ids.contains(&s.id)))
            .filter(|s| filter.status.is_none_or(|st| s.state == st))
            .collect()
    }

    /// Enforces ownership (spec §4.3 "Access enforcement"): the caller may
    /// operate on `session_id` iff it owns it or holds the admin role.
    pub fn check_access(
        &self,
        session_id: &str,
        caller_user_id: &str,
        caller_is_admin: bool,
    ) -> Result<(), SessionError> {
        let session = self.get(session_id)?;
        if caller_is_admin || session.user_id == caller_user_id {
            Ok(())
        } else {
            Err(SessionError::AccessDenied(session_id.to_string()))
        }
    }

    /// Sweeps every session: expires those past ttl, flips active/idle based
    /// on connection count already tracked by mutation sites (spec §4.3).
    pub async fn sweep_expiry(&self) -> usize {
        let mut terminated = 0;
        let ids: Vec<String> = self.sessions.iter().map(|e| e.id.clone()).collect();
        for id in ids {
            let should_terminate = {
                if let Some(mut entry) = self.sessions.get_mut(&id) {
                    entry.reevaluate_expiry(self.config.default_ttl);
                    if entry.is_expired() {
                        entry.terminate();
                        true
                    } else {
                        false
                    }
                } else {
                    false
                }
            };
            if should_terminate {
                if let Err(e) = self.delete(&id).await {
                    warn!(session_id = id, error = %e, "failed to remove expired session");
                } else {
                    terminated += 1;
                }
            }
        }
        terminated
    }

    async fn queue_persist(&self, session: Session) {
        let mut pending = self.pending.lock().await;
        pending.push(session);
        if pending.len() >= self.config.batch_size {
            let batch = std::mem::take(&mut *pending);
            drop(pending);
            self.flush_batch(batch).await;
        }
    }

    async fn flush_batch(&self, batch: Vec<Session>) {
        if batch.is_empty() {
            return;
        }
        if let Err(e) = self.persistence.save_batch(batch).await {
            warn!(error = %e, "session persistence batch failed");
        }
    }

    /// Flushes any pending writes synchronously (spec §4.6 "On stop, pending
    /// sessions are flushed synchronously").
    pub async fn flush(&self) {
        let batch = std::mem::take(&mut *self.pending.lock().await);
        self.flush_batch(batch).await;
    }

    /// Spawns the periodic flush + expiry-sweep loop. Returns a handle the
    /// caller can abort on shutdown.
    pub fn spawn_maintenance(self: &Arc<Self>, cleanup_interval: Duration) -> tokio::task::JoinHandle<()> {
        let store = self.clone();
        let flush_interval = self.config.flush_interval;
        tokio::spawn(async move {
            let mut flush_ticker = tokio::time::interval(flush_interval);
            let mut cleanup_ticker = tokio::time::interval(cleanup_interval);
            loop {
                tokio::select! {
                    _ = flush_ticker.tick() => {
                        store.flush().await;
                    }
                    _ = cleanup_ticker.tick() => {
                        let n = store.sweep_expiry().await;
                        if n > 0 {
                            info!(terminated = n, "session expiry sweep");
                        }
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> Arc<SessionStore> {
        Arc::new(SessionStore::new(
            SessionStoreConfig::default(),
            Arc::new(NoopPersistence),
        ))
    }

    #[tokio::test]
    async fn create_touch_get_reflects_updated_last_accessed() {
        let store = store();
        let session = store.create("u1", "alice", None).await.unwrap();
        let before = session.last_accessed_at;

        tokio::time::sleep(Duration::from_millis(5)).await;
        store.touch(&session.id).await.unwrap();

        let fetched = store.get(&session.id).unwrap();
        assert!(fetched.last_accessed_at > before);
    }

    #[tokio::test]
    async fn refresh_extends_expiry_strictly_forward() {
        let store = store();
        let session = store.create("u1", "alice", Some(ChronoDuration::seconds(60))).await.unwrap();
        let before = session.expires_at;

        store.refresh(&session.id, ChronoDuration::seconds(120)).await.unwrap();
        let fetched = store.get(&session.id).unwrap();
        assert!(fetched.expires_at > before);
    }

    #[tokio::test]
    async fn session_limit_per_user_is_enforced() {
        let mut config = SessionStoreConfig::default();
        config.max_per_user = 1;
        let store = SessionStore::new(config, Arc::new(NoopPersistence));

        store.create("u1", "alice", None).await.unwrap();
        let err = store.create("u1", "alice", None).await.unwrap_err();
        assert!(matches!(err, SessionError::LimitExceeded(_, 1)));
    }

    #[tokio::test]
    async fn non_owner_non_admin_access_is_denied() {
        let store = store();
        let session = store.create("u1", "alice", None).await.unwrap();

        assert!(store.check_access(&session.id, "u1", false).is_ok());
        assert!(matches!(
            store.check_access(&session.id, "u2", false).unwrap_err(),
            SessionError::AccessDenied(_)
        ));
        assert!(store.check_access(&session.id, "u2", true).is_ok());
    }

    #[tokio::test]
    async fn delete_is_idempotent_failure_on_second_call() {
        let store = store();
        let session = store.create("u1", "alice", None).await.unwrap();
        store.delete(&session.id).await.unwrap();
        assert!(matches!(
            store.delete(&session.id).await.unwrap_err(),
            SessionError::NotFound(_)
        ));
    }
}
