//! Configuration and per-page option structs (spec §4.1, §4.2).

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Pool-wide configuration (spec §4.1 "Configuration (enumerated)").
#[derive(Debug, Clone)]
pub struct BrowserConfig {
    pub max_browsers: usize,
    pub max_pages_per_browser: usize,
    pub idle_timeout: Duration,
    pub acquisition_timeout: Duration,
    pub health_check_interval: Duration,
    pub recycle_after_uses: u32,
    pub launch_options: LaunchOptions,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            max_browsers: 5,
            max_pages_per_browser: 10,
            idle_timeout: Duration::from_secs(300),
            acquisition_timeout: Duration::from_secs(30),
            health_check_interval: Duration::from_secs(60),
            recycle_after_uses: 1_000,
            launch_options: LaunchOptions::default(),
        }
    }
}

/// Opaque struct forwarded verbatim to the browser driver on launch; the
/// pool never interprets its contents (spec §4.1: "forwarded to browser
/// driver").
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LaunchOptions {
    pub headless: bool,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub executable_path: Option<String>,
}

/// Options accepted by `createPage` (spec §4.2).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageOptions {
    #[serde(default)]
    pub viewport: Option<Viewport>,
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(default)]
    pub extra_headers: std::collections::HashMap<String, String>,
    #[serde(default = "default_true")]
    pub java_script_enabled: bool,
    #[serde(default)]
    pub bypass_csp: bool,
    #[serde(default)]
    pub offline_mode: bool,
    #[serde(default = "default_true")]
    pub cache_enabled: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub device_scale_factor: Option<f64>,
}

/// Lifecycle state of one pooled browser instance (spec §3 "Browser Instance").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrowserState {
    Launching,
    Idle,
    Active,
    Draining,
    Destroyed,
}

/// An opaque handle returned by [`crate::pool::BrowserPool::acquire`].
/// Carries no behavior itself — all operations go back through the pool,
/// keeping the driver an external collaborator behind the pool's API
/// (spec §1 "treated as external collaborators").
#[derive(Debug, Clone)]
pub struct BrowserHandle {
    pub instance_id: String,
    pub session_id: String,
}

/// What `health_check` samples per instance (spec §4.1 "health protocol").
#[derive(Debug, Clone, Default)]
pub struct HealthSample {
    pub reachable: bool,
    pub consecutive_failures: u32,
    pub memory_bytes: Option<u64>,
    pub cpu_percent: Option<f32>,
}
