//! A single pooled browser process plus its live pages (spec §3 "Browser
//! Instance", §5 "each Browser Instance has an exclusive Mutex guarding its
//! process handle; operations on different instances proceed fully in
//! parallel").

use std::{
    collections::HashMap,
    sync::atomic::{AtomicU32, Ordering},
    time::Instant,
};

use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
    driver::DriverProcess,
    error::BrowserError,
    types::{BrowserState, HealthSample, PageOptions},
};

/// One launched browser process tracked by the pool. The `Mutex` here is the
/// exclusive lock spec §5 calls out: only one action touches this instance's
/// pages at a time, but different instances never contend with each other.
pub struct BrowserInstance {
    pub id: String,
    process: Mutex<Box<dyn DriverProcess>>,
    pages: Mutex<HashMap<String, String>>,
    state: Mutex<BrowserState>,
    created_at: Instant,
    last_used: Mutex<Instant>,
    use_count: AtomicU32,
    consecutive_failures: AtomicU32,
}

impl BrowserInstance {
    pub fn new(process: Box<dyn DriverProcess>) -> Self {
        let now = Instant::now();
        Self {
            id: format!("br_{}", Uuid::new_v4().simple()),
            process: Mutex::new(process),
            pages: Mutex::new(HashMap::new()),
            state: Mutex::new(BrowserState::Idle),
            created_at: now,
            last_used: Mutex::new(now),
            use_count: AtomicU32::new(0),
            consecutive_failures: AtomicU32::new(0),
        }
    }

    pub async fn state(&self) -> BrowserState {
        *self.state.lock().await
    }

    pub async fn set_state(&self, state: BrowserState) {
        *self.state.lock().await = state;
    }

    pub async fn touch(&self) {
        *self.last_used.lock().await = Instant::now();
        self.use_count.fetch_add(1, Ordering::Relaxed);
    }

    pub async fn idle_for(&self) -> std::time::Duration {
        self.last_used.lock().await.elapsed()
    }

    pub fn age(&self) -> std::time::Duration {
        self.created_at.elapsed()
    }

    pub fn use_count(&self) -> u32 {
        self.use_count.load(Ordering::Relaxed)
    }

    pub fn record_failure(&self) {
        self.consecutive_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_success(&self) {
        self.consecutive_failures.store(0, Ordering::Relaxed);
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures.load(Ordering::Relaxed)
    }

    pub async fn page_count(&self) -> usize {
        self.pages.lock().await.len()
    }

    /// Opens a new page through the driver and registers its opaque id
    /// against this instance, enforcing the per-browser page cap (spec §4.1
    /// "pages per browser" / §5 "each Browser Instance caps concurrent
    /// pages").
    pub async fn open_page(
        &self,
        options: &PageOptions,
        max_pages: usize,
    ) -> Result<(String, Box<dyn crate::driver::DriverPage>), BrowserError> {
        let mut pages = self.pages.lock().await;
        if pages.len() >= max_pages {
            return Err(BrowserError::PageCap);
        }
        let process = self.process.lock().await;
        let page = process.new_page(options).await?;
        let page_id = format!("pg_{}", Uuid::new_v4().simple());
        pages.insert(page_id.clone(), page_id.clone());
        Ok((page_id, page))
    }

    pub async fn close_page(&self, page_id: &str) {
        self.pages.lock().await.remove(page_id);
    }

    pub async fn health_check(&self) -> Result<HealthSample, BrowserError> {
        let process = self.process.lock().await;
        let sample = process.health_check().await?;
        if sample.reachable {
            self.record_success();
        } else {
            self.record_failure();
        }
        Ok(sample)
    }

    pub async fn close(&self) -> Result<(), BrowserError> {
        self.set_state(BrowserState::Destroyed).await;
        let process = self.process.lock().await;
        process.close().await
    }
}
