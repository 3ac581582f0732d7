//! Page Manager (C2): authoritative `pageId` -> (live handle, metadata) map
//! with session-ownership enforcement (spec §4.2).

use std::{sync::Arc, time::Duration};

use dashmap::DashMap;
use navigant_browser::{BrowserHandle, BrowserPool, DriverPage, PageOptions};
use tokio::sync::{Mutex, broadcast};
use tracing::{info, warn};

use crate::{
    error::PageError,
    types::{PageCreateOptions, PageEvent, PageInfo, PageState},
};

#[cfg(feature = "metrics")]
use navigant_metrics::page as page_metrics;

/// One entry in the page table: the driver handle plus mutable metadata.
pub struct PageEntry {
    pub handle: Box<dyn DriverPage>,
    pub browser_handle: BrowserHandle,
    pub info: Mutex<PageInfo>,
}

pub struct PageManager {
    pool: Arc<BrowserPool>,
    pages: DashMap<String, Arc<PageEntry>>,
    events: broadcast::Sender<PageEvent>,
    nav_history_max: usize,
}

impl PageManager {
    pub fn new(pool: Arc<BrowserPool>, nav_history_max: usize) -> Self {
        let (events, _) = broadcast::channel(1024);
        Self {
            pool,
            pages: DashMap::new(),
            events,
            nav_history_max,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PageEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: PageEvent) {
        let _ = self.events.send(event);
    }

    /// `createPage(contextId, sessionId, browserId, options?) -> PageInfo`
    /// (spec §4.2). `browser_handle` must already belong to `session_id`;
    /// context/session agreement is checked by [`crate::registry::ContextRegistry`]
    /// before this is called.
    pub async fn create_page(
        &self,
        context_id: &str,
        session_id: &str,
        browser_handle: BrowserHandle,
        options: PageCreateOptions,
    ) -> Result<PageInfo, PageError> {
        let page_options = PageOptions {
            viewport: options.viewport,
            user_agent: options.user_agent,
            extra_headers: options.extra_headers,
            java_script_enabled: options.java_script_enabled.unwrap_or(true),
            bypass_csp: options.bypass_csp,
            offline_mode: options.offline_mode,
            cache_enabled: options.cache_enabled.unwrap_or(true),
        };

        let (_driver_page_id, driver_page) = self
            .pool
            .create_page(&browser_handle, &page_options)
            .await?;

        let info = PageInfo::new(context_id, session_id, browser_handle.instance_id.clone());
        let entry = Arc::new(PageEntry {
            handle: driver_page,
            browser_handle,
            info: Mutex::new(info.clone()),
        });
        self.pages.insert(info.id.clone(), entry);
        self.emit(PageEvent::Created(info.clone()));

        #[cfg(feature = "metrics")]
        navigant_metrics::counter!(page_metrics::CREATED_TOTAL).increment(1);

        info!(page_id = %info.id, context_id, session_id, "page created");
        Ok(info)
    }

    fn get_page(&self, page_id: &str) -> Result<Arc<PageEntry>, PageError> {
        self.pages
            .get(page_id)
            .map(|e| e.clone())
            .ok_or_else(|| PageError::NotFound(page_id.to_string()))
    }

    /// `getPage(pageId, sessionId) -> handle | undefined`; rejects
    /// `OWNERSHIP_VIOLATION` on mismatch (spec §4.2).
    pub async fn get_page_owned(
        &self,
        page_id: &str,
        session_id: &str,
    ) -> Result<Arc<PageEntry>, PageError> {
        let entry = self.get_page(page_id)?;
        let info = entry.info.lock().await;
        if info.session_id != session_id {
            return Err(PageError::OwnershipViolation(page_id.to_string()));
        }
        if info.state == PageState::Closed {
            return Err(PageError::Gone(page_id.to_string()));
        }
        Ok(entry.clone())
    }

    pub async fn get_info(&self, page_id: &str, session_id: &str) -> Result<PageInfo, PageError> {
        let entry = self.get_page_owned(page_id, session_id).await?;
        Ok(entry.info.lock().await.clone())
    }

    pub fn list_by_context(&self, context_id: &str) -> Vec<String> {
        self.pages
            .iter()
            .filter(|e| context_id_matches(e.value(), context_id))
            .map(|e| e.key().clone())
            .collect()
    }

    pub fn list_by_session(&self, session_id: &str) -> Vec<String> {
        self.pages
            .iter()
            .filter(|e| session_id_matches(e.value(), session_id))
            .map(|e| e.key().clone())
            .collect()
    }

    /// `navigate(pageId, url, sessionId, options?)` (spec §4.2): appends
    /// `url` to history, flips state `navigating -> active` on success,
    /// increments `errorCount` on failure.
    pub async fn navigate(
        &self,
        page_id: &str,
        url: &str,
        session_id: &str,
    ) -> Result<PageInfo, PageError> {
        let entry = self.get_page_owned(page_id, session_id).await?;
        {
            let mut info = entry.info.lock().await;
            info.state = PageState::Navigating;
        }

        let result = entry.handle.navigate(url).await;
        self.apply_navigation_outcome(&entry, url, result).await
    }

    /// Applies the bookkeeping half of `navigate` (history append, state
    /// flip, error-count increment, event emission) without re-issuing the
    /// driver call. Used by [`Self::navigate`] and by the Action Executor
    /// (C8), which dispatches `navigate` through the action pipeline's own
    /// retry loop and only needs the resulting page state reconciled
    /// (spec §4.2 invariants apply regardless of which caller triggered
    /// the navigation).
    pub async fn apply_navigation_outcome(
        &self,
        entry: &Arc<PageEntry>,
        url: &str,
        result: Result<(), navigant_browser::BrowserError>,
    ) -> Result<PageInfo, PageError> {
        let info = {
            let mut info = entry.info.lock().await;
            match result {
                Ok(()) => {
                    info.record_navigation(url.to_string(), self.nav_history_max);
                },
                Err(e) => {
                    info.record_error();
                    drop(info);
                    self.emit(PageEvent::Error(entry.info.lock().await.clone()));
                    return Err(PageError::Browser(e));
                },
            }
            info.clone()
        };
        self.emit(PageEvent::Navigated(info.clone()));
        Ok(info)
    }

    /// `close(pageId, sessionId)` (spec §4.2): best-effort; pool close
    /// errors are swallowed, store entry removed unconditionally.
    pub async fn close(&self, page_id: &str, session_id: &str) -> Result<(), PageError> {
        let entry = self.get_page_owned(page_id, session_id).await?;
        if let Err(e) = entry.handle.close().await {
            warn!(page_id, error = %e, "best-effort page close failed");
        }
        if let Err(e) = self.pool.close_page(&entry.browser_handle, page_id).await {
            warn!(page_id, error = %e, "pool close_page failed");
        }
        self.pages.remove(page_id);
        self.emit(PageEvent::Closed(page_id.to_string()));
        #[cfg(feature = "metrics")]
        navigant_metrics::counter!(page_metrics::CLOSED_TOTAL).increment(1);
        Ok(())
    }

    pub async fn close_by_context(&self, context_id: &str) -> usize {
        let ids = self.list_by_context(context_id);
        let mut closed = 0;
        for id in ids {
            if let Some(entry) = self.pages.get(&id) {
                let session_id = entry.info.lock().await.session_id.clone();
                drop(entry);
                if self.close(&id, &session_id).await.is_ok() {
                    closed += 1;
                }
            }
        }
        closed
    }

    pub async fn close_by_session(&self, session_id: &str) -> usize {
        let ids = self.list_by_session(session_id);
        let mut closed = 0;
        for id in ids {
            if self.close(&id, session_id).await.is_ok() {
                closed += 1;
            }
        }
        closed
    }

    /// `reapIdle(maxIdleMs) -> count` (spec §4.2): closes pages whose
    /// `state=idle` and `lastActivityAt` older than threshold.
    pub async fn reap_idle(&self, max_idle: Duration) -> usize {
        let mut to_close: Vec<(String, String)> = Vec::new();
        for entry in self.pages.iter() {
            let info = entry.info.lock().await;
            if info.state == PageState::Idle
                && (chrono::Utc::now() - info.last_activity_at)
                    .to_std()
                    .unwrap_or_default()
                    > max_idle
            {
                to_close.push((info.id.clone(), info.session_id.clone()));
            }
        }
        let mut reaped = 0;
        for (page_id, session_id) in to_close {
            if self.close(&page_id, &session_id).await.is_ok() {
                reaped += 1;
            }
        }
        #[cfg(feature = "metrics")]
        if reaped > 0 {
            navigant_metrics::counter!(page_metrics::REAPED_IDLE_TOTAL).increment(reaped as u64);
        }
        reaped
    }

    /// Spawns the periodic idle-page reap loop. Returns a handle the caller
    /// can abort on shutdown.
    pub fn spawn_maintenance(self: &Arc<Self>, interval: Duration, max_idle: Duration) -> tokio::task::JoinHandle<()> {
        let manager = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let reaped = manager.reap_idle(max_idle).await;
                if reaped > 0 {
                    info!(reaped, "page idle reap sweep");
                }
            }
        })
    }
}

fn session_id_matches(entry: &Arc<PageEntry>, session_id: &str) -> bool {
    entry
        .info
        .try_lock()
        .map(|info| info.session_id == session_id)
        .unwrap_or(false)
}

fn context_id_matches(entry: &Arc<PageEntry>, context_id: &str) -> bool {
    entry
        .info
        .try_lock()
        .map(|info| info.context_id == context_id)
        .unwrap_or(false)
}

