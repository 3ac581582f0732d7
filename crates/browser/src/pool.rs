//! Bounded pool of browser processes: acquire/release with a strict FIFO
//! waiter queue, idle reaping, health checks and recycling (spec §4.1, C1).

use std::{collections::VecDeque, sync::Arc, time::Duration};

use tokio::sync::{Mutex, Notify, RwLock};
use tracing::{debug, info, warn};

use crate::{
    driver::BrowserDriver,
    error::BrowserError,
    instance::BrowserInstance,
    recycle::{self, RecyclePolicy, RecycleSignals},
    types::{BrowserConfig, BrowserHandle, BrowserState, PageOptions},
};

#[cfg(feature = "metrics")]
use navigant_metrics::pool as pool_metrics;

struct WaiterQueue {
    waiters: Mutex<VecDeque<Arc<Notify>>>,
}

impl WaiterQueue {
    fn new() -> Self {
        Self {
            waiters: Mutex::new(VecDeque::new()),
        }
    }

    /// Joins the queue and returns a token to wait on. FIFO: the caller
    /// that joined first is notified first (spec §4.1 "Waiter queue is
    /// strict FIFO").
    async fn join(&self) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        self.waiters.lock().await.push_back(notify.clone());
        notify
    }

    /// Wakes exactly the head of the queue, if any.
    async fn notify_one(&self) {
        if let Some(notify) = self.waiters.lock().await.pop_front() {
            notify.notify_one();
        }
    }

    async fn cancel(&self, token: &Arc<Notify>) {
        let mut waiters = self.waiters.lock().await;
        waiters.retain(|w| !Arc::ptr_eq(w, token));
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PoolMode {
    Running,
    Draining,
    Shutdown,
}

/// Owns every [`BrowserInstance`] exclusively (spec §3 "Browser Pool
/// exclusively owns BrowserInstances").
pub struct BrowserPool {
    config: BrowserConfig,
    recycle_policy: RecyclePolicy,
    driver: Box<dyn BrowserDriver>,
    instances: RwLock<Vec<Arc<BrowserInstance>>>,
    mode: RwLock<PoolMode>,
    waiters: WaiterQueue,
    last_recycle: Mutex<std::collections::HashMap<String, tokio::time::Instant>>,
}

impl BrowserPool {
    pub fn new(config: BrowserConfig, driver: Box<dyn BrowserDriver>) -> Self {
        Self {
            config,
            recycle_policy: RecyclePolicy::default(),
            driver,
            instances: RwLock::new(Vec::new()),
            mode: RwLock::new(PoolMode::Running),
            waiters: WaiterQueue::new(),
            last_recycle: Mutex::new(std::collections::HashMap::new()),
        }
    }

    /// Hands out an available instance, or launches one if below cap, or
    /// joins the FIFO waiter queue if at cap (spec §4.1 "acquire").
    pub async fn acquire(&self, session_id: &str) -> Result<BrowserHandle, BrowserError> {
        let deadline = tokio::time::Instant::now() + self.config.acquisition_timeout;

        loop {
            if *self.mode.read().await != PoolMode::Running {
                return Err(BrowserError::PoolShuttingDown);
            }

            if let Some(instance) = self.find_idle_instance().await {
                instance.set_state(BrowserState::Active).await;
                instance.touch().await;
                return Ok(BrowserHandle {
                    instance_id: instance.id.clone(),
                    session_id: session_id.to_string(),
                });
            }

            // Exclusive raise of instance count: only one acquirer launches
            // at a time (spec §4.1 "instance count is raised under
            // exclusive update").
            let mut instances = self.instances.write().await;
            if instances.len() < self.config.max_browsers {
                let process = self.driver.launch(&self.config.launch_options).await?;
                let instance = Arc::new(BrowserInstance::new(process));
                instance.set_state(BrowserState::Active).await;
                instance.touch().await;
                let handle = BrowserHandle {
                    instance_id: instance.id.clone(),
                    session_id: session_id.to_string(),
                };
                instances.push(instance);
                drop(instances);
                #[cfg(feature = "metrics")]
                {
                    navigant_metrics::gauge!(pool_metrics::BROWSERS_ACTIVE)
                        .set(self.active_count().await as f64);
                    navigant_metrics::counter!(pool_metrics::BROWSERS_CREATED_TOTAL).increment(1);
                }
                info!(session_id, instance_id = %handle.instance_id, "launched new browser instance");
                return Ok(handle);
            }
            drop(instances);

            let token = self.waiters.join().await;
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            if remaining.is_zero() {
                self.waiters.cancel(&token).await;
                return Err(BrowserError::AcquireTimeout);
            }
            if tokio::time::timeout(remaining, token.notified()).await.is_err() {
                self.waiters.cancel(&token).await;
                return Err(BrowserError::AcquireTimeout);
            }
            // Woken: loop again to re-check for an idle instance. Another
            // waiter may have raced us to it, in which case we loop again.
        }
    }

    async fn find_idle_instance(&self) -> Option<Arc<BrowserInstance>> {
        let instances = self.instances.read().await;
        for instance in instances.iter() {
            if instance.state().await == BrowserState::Idle {
                return Some(instance.clone());
            }
        }
        None
    }

    /// Releases an instance back to `idle` and wakes the head waiter (spec
    /// §4.1 "release").
    pub async fn release(&self, handle: &BrowserHandle) -> Result<(), BrowserError> {
        let instance = self.get_instance(&handle.instance_id).await?;
        instance.set_state(BrowserState::Idle).await;
        self.waiters.notify_one().await;
        Ok(())
    }

    pub async fn create_page(
        &self,
        handle: &BrowserHandle,
        options: &PageOptions,
    ) -> Result<(String, Box<dyn crate::driver::DriverPage>), BrowserError> {
        let instance = self.get_instance(&handle.instance_id).await?;
        instance
            .open_page(options, self.config.max_pages_per_browser)
            .await
    }

    pub async fn close_page(&self, handle: &BrowserHandle, page_id: &str) -> Result<(), BrowserError> {
        let instance = self.get_instance(&handle.instance_id).await?;
        instance.close_page(page_id).await;
        Ok(())
    }

    /// Destroys and relaunches one instance in place, preserving its `id`
    /// (spec §4.1 "recycle").
    pub async fn recycle(&self, instance_id: &str) -> Result<(), BrowserError> {
        let mut instances = self.instances.write().await;
        let idx = instances
            .iter()
            .position(|i| i.id == instance_id)
            .ok_or_else(|| BrowserError::PageNotFound(instance_id.to_string()))?;

        let _ = instances[idx].close().await;
        let process = self.driver.launch(&self.config.launch_options).await?;
        let fresh = Arc::new(BrowserInstance::new(process));
        // Preserve the external id while swapping the live process.
        let preserved_id = instances[idx].id.clone();
        instances[idx] = fresh;
        // BrowserInstance::new assigns a fresh random id; overwrite the
        // public one so waiters referencing the old id keep working.
        let ptr = Arc::get_mut(&mut instances[idx]);
        if let Some(inst) = ptr {
            inst.id = preserved_id;
        }

        self.last_recycle
            .lock()
            .await
            .insert(instance_id.to_string(), tokio::time::Instant::now());
        self.waiters.notify_one().await;
        info!(instance_id, "recycled browser instance");
        Ok(())
    }

    /// Probes every instance's connectivity; unhealthy ones are transitioned
    /// `draining` and queued for recycling (spec §4.1 "healthCheck").
    pub async fn health_check(&self) -> Vec<String> {
        let instances = self.instances.read().await.clone();
        let mut recycled = Vec::new();
        for instance in instances {
            match instance.health_check().await {
                Ok(sample) if sample.reachable => {},
                _ => {
                    instance.set_state(BrowserState::Draining).await;
                    warn!(instance_id = %instance.id, "instance unhealthy, flagged for recycle");
                    recycled.push(instance.id.clone());
                },
            }
        }
        for instance_id in &recycled {
            if let Err(e) = self.recycle(instance_id).await {
                warn!(instance_id, error = %e, "failed to recycle unhealthy instance");
            }
        }
        recycled
    }

    /// Scores every idle instance and recycles the worst offenders over
    /// threshold, respecting cooldown and the batch cap (spec §4.1
    /// "Recycling decision").
    pub async fn run_recycling_sweep(&self) {
        let instances = self.instances.read().await.clone();
        let mut scored = Vec::new();
        let last_recycle = self.last_recycle.lock().await.clone();

        for instance in &instances {
            if instance.state().await != BrowserState::Idle {
                continue;
            }
            let signals = RecycleSignals {
                age: instance.age(),
                idle_for: instance.idle_for().await,
                use_count: instance.use_count(),
                page_count: instance.page_count().await,
                consecutive_failures: instance.consecutive_failures(),
                memory_percent: None,
            };
            let s = recycle::score(&signals, &self.recycle_policy);
            let since_last = last_recycle
                .get(&instance.id)
                .map(|t| t.elapsed())
                .unwrap_or(Duration::from_secs(u64::MAX));
            if recycle::should_recycle(s, since_last, &self.recycle_policy) {
                scored.push((instance.id.as_str(), s));
            }
        }

        let batch = recycle::select_batch(scored, &self.recycle_policy);
        for instance_id in batch {
            if let Err(e) = self.recycle(instance_id).await {
                warn!(instance_id, error = %e, "recycling sweep failed for instance");
            }
        }
    }

    /// Reaps instances idle beyond `idleTimeout`, keeping at least one live
    /// instance (spec §4.1 "cleanupIdle").
    pub async fn cleanup_idle(&self) {
        let instances = self.instances.read().await.clone();
        if instances.len() <= 1 {
            return;
        }

        let mut to_remove = Vec::new();
        for instance in &instances {
            if instance.state().await == BrowserState::Idle
                && instance.idle_for().await > self.config.idle_timeout
                && instances.len() - to_remove.len() > 1
            {
                to_remove.push(instance.id.clone());
            }
        }

        if to_remove.is_empty() {
            return;
        }

        let mut instances = self.instances.write().await;
        for instance_id in &to_remove {
            if let Some(pos) = instances.iter().position(|i| &i.id == instance_id) {
                let removed = instances.remove(pos);
                let _ = removed.close().await;
                debug!(instance_id, "reaped idle browser instance");
            }
        }
        #[cfg(feature = "metrics")]
        navigant_metrics::gauge!(pool_metrics::BROWSERS_ACTIVE).set(instances.len() as f64);
    }

    /// Rejects new acquisitions, then drains (waits for active instances to
    /// go idle) or destroys immediately if `force` (spec §4.1 "shutdown").
    pub async fn shutdown(&self, force: bool) {
        *self.mode.write().await = if force {
            PoolMode::Shutdown
        } else {
            PoolMode::Draining
        };

        if !force {
            let deadline = tokio::time::Instant::now() + Duration::from_secs(30);
            loop {
                let all_idle = {
                    let instances = self.instances.read().await;
                    let mut idle = true;
                    for i in instances.iter() {
                        if i.state().await == BrowserState::Active {
                            idle = false;
                            break;
                        }
                    }
                    idle
                };
                if all_idle || tokio::time::Instant::now() >= deadline {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
        }

        let mut instances = self.instances.write().await;
        for instance in instances.drain(..) {
            let _ = instance.close().await;
        }
        info!("browser pool shut down");
    }

    pub async fn active_count(&self) -> usize {
        self.instances.read().await.len()
    }

    /// Spawns the periodic health-check, recycling and idle-reap loop
    /// (spec §4.1 "Runs on a timer at `healthCheckInterval`"). Returns a
    /// handle the caller can abort on shutdown.
    pub fn spawn_maintenance(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let pool = self.clone();
        let interval = self.config.health_check_interval;
        tokio::spawn(async move {
            let mut health_ticker = tokio::time::interval(interval);
            let mut recycle_ticker = tokio::time::interval(interval.max(Duration::from_secs(1)));
            let mut idle_ticker = tokio::time::interval(pool.config.idle_timeout.max(Duration::from_secs(1)));
            loop {
                tokio::select! {
                    _ = health_ticker.tick() => {
                        pool.health_check().await;
                    }
                    _ = recycle_ticker.tick() => {
                        pool.run_recycling_sweep().await;
                    }
                    _ = idle_ticker.tick() => {
                        pool.cleanup_idle().await;
                    }
                }
            }
        })
    }

    async fn get_instance(&self, instance_id: &str) -> Result<Arc<BrowserInstance>, BrowserError> {
        self.instances
            .read()
            .await
            .iter()
            .find(|i| i.id == instance_id)
            .cloned()
            .ok_or_else(|| BrowserError::PageNotFound(instance_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use serde_json::Value;

    use super::*;
    use crate::{
        driver::DriverProcess,
        types::{HealthSample, LaunchOptions, Viewport},
    };

    struct FakeDriver;

    #[async_trait]
    impl BrowserDriver for FakeDriver {
        async fn launch(
            &self,
            _options: &LaunchOptions,
        ) -> Result<Box<dyn DriverProcess>, BrowserError> {
            Ok(Box::new(FakeProcess))
        }
    }

    struct FakeProcess;

    #[async_trait]
    impl DriverProcess for FakeProcess {
        async fn new_page(
            &self,
            _options: &PageOptions,
        ) -> Result<Box<dyn crate::driver::DriverPage>, BrowserError> {
            Ok(Box::new(FakePage))
        }

        async fn health_check(&self) -> Result<HealthSample, BrowserError> {
            Ok(HealthSample {
                reachable: true,
                ..Default::default()
            })
        }

        async fn close(&self) -> Result<(), BrowserError> {
            Ok(())
        }
    }

    struct FakePage;

    #[async_trait]
    impl crate::driver::DriverPage for FakePage {
        async fn navigate(&self, _url: &str) -> Result<(), BrowserError> {
            Ok(())
        }
        async fn current_url(&self) -> Result<String, BrowserError> {
            Ok(String::new())
        }
        async fn title(&self) -> Result<String, BrowserError> {
            Ok(String::new())
        }
        async fn click(&self, _selector: &str) -> Result<(), BrowserError> {
            Ok(())
        }
        async fn type_text(&self, _selector: &str, _text: &str) -> Result<(), BrowserError> {
            Ok(())
        }
        async fn select(&self, _selector: &str, _values: &[String]) -> Result<(), BrowserError> {
            Ok(())
        }
        async fn press_key(&self, _key: &str) -> Result<(), BrowserError> {
            Ok(())
        }
        async fn mouse_move_and_click(
            &self,
            _x: f64,
            _y: f64,
            _click: bool,
        ) -> Result<(), BrowserError> {
            Ok(())
        }
        async fn scroll(&self, _selector: Option<&str>, _x: f64, _y: f64) -> Result<(), BrowserError> {
            Ok(())
        }
        async fn screenshot(
            &self,
            _full_page: bool,
            _selector: Option<&str>,
        ) -> Result<Vec<u8>, BrowserError> {
            Ok(Vec::new())
        }
        async fn pdf(&self, _landscape: bool) -> Result<Vec<u8>, BrowserError> {
            Ok(Vec::new())
        }
        async fn wait_for_selector(&self, _selector: &str, _timeout_ms: u64) -> Result<(), BrowserError> {
            Ok(())
        }
        async fn wait_for_navigation(&self, _timeout_ms: u64) -> Result<(), BrowserError> {
            Ok(())
        }
        async fn wait_for_function(&self, _function: &str, _timeout_ms: u64) -> Result<(), BrowserError> {
            Ok(())
        }
        async fn evaluate(&self, _script: &str) -> Result<Value, BrowserError> {
            Ok(Value::Null)
        }
        async fn inject_script(&self, _script: &str) -> Result<(), BrowserError> {
            Ok(())
        }
        async fn inject_css(&self, _css: &str) -> Result<(), BrowserError> {
            Ok(())
        }
        async fn upload_files(&self, _selector: &str, _paths: &[String]) -> Result<(), BrowserError> {
            Ok(())
        }
        async fn set_cookie(
            &self,
            _name: &str,
            _value: &str,
            _domain: Option<&str>,
            _path: Option<&str>,
        ) -> Result<(), BrowserError> {
            Ok(())
        }
        async fn get_cookies(&self, _name: Option<&str>) -> Result<Value, BrowserError> {
            Ok(Value::Array(Vec::new()))
        }
        async fn delete_cookie(&self, _name: &str) -> Result<(), BrowserError> {
            Ok(())
        }
        async fn clear_cookies(&self) -> Result<(), BrowserError> {
            Ok(())
        }
        async fn go_back(&self) -> Result<(), BrowserError> {
            Ok(())
        }
        async fn go_forward(&self) -> Result<(), BrowserError> {
            Ok(())
        }
        async fn refresh(&self) -> Result<(), BrowserError> {
            Ok(())
        }
        async fn set_viewport(&self, _viewport: Viewport) -> Result<(), BrowserError> {
            Ok(())
        }
        async fn close(&self) -> Result<(), BrowserError> {
            Ok(())
        }
    }

    fn test_config(max_browsers: usize) -> BrowserConfig {
        BrowserConfig {
            max_browsers,
            max_pages_per_browser: 2,
            acquisition_timeout: Duration::from_millis(500),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn acquire_respects_pool_cap() {
        let pool = BrowserPool::new(test_config(2), Box::new(FakeDriver));
        let a = pool.acquire("sess1").await.unwrap();
        let _b = pool.acquire("sess2").await.unwrap();
        assert_eq!(pool.active_count().await, 2);

        // S1: pool is at cap; sess3 must queue, not launch a third instance.
        let pool = Arc::new(pool);
        let pool2 = pool.clone();
        let waiter = tokio::spawn(async move { pool2.acquire("sess3").await });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(pool.active_count().await, 2);

        pool.release(&a).await.unwrap();
        let c = waiter.await.unwrap().unwrap();
        assert_eq!(c.instance_id, a.instance_id);
        assert_eq!(pool.active_count().await, 2);
    }

    #[tokio::test]
    async fn acquire_times_out_when_queue_never_drains() {
        let pool = BrowserPool::new(test_config(1), Box::new(FakeDriver));
        let _a = pool.acquire("sess1").await.unwrap();

        let err = pool.acquire("sess2").await.unwrap_err();
        assert!(matches!(err, BrowserError::AcquireTimeout));
    }

    #[tokio::test]
    async fn fifo_waiters_are_served_in_arrival_order() {
        let pool = Arc::new(BrowserPool::new(test_config(1), Box::new(FakeDriver)));
        let a = pool.acquire("sess1").await.unwrap();

        let p1 = pool.clone();
        let first = tokio::spawn(async move { p1.acquire("sess2").await });
        tokio::time::sleep(Duration::from_millis(20)).await;
        let p2 = pool.clone();
        let second = tokio::spawn(async move { p2.acquire("sess3").await });
        tokio::time::sleep(Duration::from_millis(20)).await;

        pool.release(&a).await.unwrap();
        let first_result = first.await.unwrap();
        assert!(first_result.is_ok(), "first waiter should be served first");

        pool.release(&first_result.unwrap()).await.unwrap();
        let second_result = second.await.unwrap();
        assert!(second_result.is_ok(), "second waiter should be served next");
    }

    #[tokio::test]
    async fn create_page_enforces_page_cap() {
        let pool = BrowserPool::new(test_config(1), Box::new(FakeDriver));
        let handle = pool.acquire("sess1").await.unwrap();
        let opts = PageOptions::default();

        let _p1 = pool.create_page(&handle, &opts).await.unwrap();
        let _p2 = pool.create_page(&handle, &opts).await.unwrap();
        let err = pool.create_page(&handle, &opts).await.unwrap_err();
        assert!(matches!(err, BrowserError::PageCap));
    }
}
