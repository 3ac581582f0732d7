//! The trait boundary between the pool and the concrete browser-driving
//! library (spec §1: "the concrete browser-driving library" is an external
//! collaborator, "reached only via the interfaces"). [`crate::chromium`]
//! provides the default `chromiumoxide`-backed implementation; tests use a
//! fake driver that never spawns a real process.

use async_trait::async_trait;
use serde_json::Value;

use crate::{
    error::BrowserError,
    types::{HealthSample, LaunchOptions, PageOptions, Viewport},
};

/// Factory for new browser processes. One implementation is installed in
/// the pool at construction time.
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    async fn launch(
        &self,
        options: &LaunchOptions,
    ) -> Result<Box<dyn DriverProcess>, BrowserError>;
}

/// One live browser process, as seen by the pool. Tracks nothing about
/// sessions or ownership — that's [`crate::pool::BrowserPool`]'s job.
#[async_trait]
pub trait DriverProcess: Send + Sync {
    async fn new_page(&self, options: &PageOptions) -> Result<Box<dyn DriverPage>, BrowserError>;

    /// Cheap liveness probe plus whatever resource signals the driver can
    /// report, feeding the recycling scorer (spec §4.1 "health protocol").
    async fn health_check(&self) -> Result<HealthSample, BrowserError>;

    /// Terminates the process. Idempotent.
    async fn close(&self) -> Result<(), BrowserError>;
}

/// A live page inside a [`DriverProcess`]. Every `Action` variant's handler
/// (navigant-actions) eventually calls one of these.
#[async_trait]
pub trait DriverPage: Send + Sync {
    async fn navigate(&self, url: &str) -> Result<(), BrowserError>;
    async fn current_url(&self) -> Result<String, BrowserError>;
    async fn title(&self) -> Result<String, BrowserError>;

    async fn click(&self, selector: &str) -> Result<(), BrowserError>;
    async fn type_text(&self, selector: &str, text: &str) -> Result<(), BrowserError>;
    async fn select(&self, selector: &str, values: &[String]) -> Result<(), BrowserError>;
    async fn press_key(&self, key: &str) -> Result<(), BrowserError>;
    async fn mouse_move_and_click(
        &self,
        x: f64,
        y: f64,
        click: bool,
    ) -> Result<(), BrowserError>;
    async fn scroll(&self, selector: Option<&str>, x: f64, y: f64) -> Result<(), BrowserError>;

    async fn screenshot(
        &self,
        full_page: bool,
        selector: Option<&str>,
    ) -> Result<Vec<u8>, BrowserError>;
    async fn pdf(&self, landscape: bool) -> Result<Vec<u8>, BrowserError>;

    async fn wait_for_selector(&self, selector: &str, timeout_ms: u64) -> Result<(), BrowserError>;
    async fn wait_for_navigation(&self, timeout_ms: u64) -> Result<(), BrowserError>;
    async fn wait_for_function(&self, function: &str, timeout_ms: u64) -> Result<(), BrowserError>;

    async fn evaluate(&self, script: &str) -> Result<Value, BrowserError>;
    async fn inject_script(&self, script: &str) -> Result<(), BrowserError>;
    async fn inject_css(&self, css: &str) -> Result<(), BrowserError>;

    async fn upload_files(&self, selector: &str, paths: &[String]) -> Result<(), BrowserError>;

    async fn set_cookie(
        &self,
        name: &str,
        value: &str,
        domain: Option<&str>,
        path: Option<&str>,
    ) -> Result<(), BrowserError>;
    async fn get_cookies(&self, name: Option<&str>) -> Result<Value, BrowserError>;
    async fn delete_cookie(&self, name: &str) -> Result<(), BrowserError>;
    async fn clear_cookies(&self) -> Result<(), BrowserError>;

    async fn go_back(&self) -> Result<(), BrowserError>;
    async fn go_forward(&self) -> Result<(), BrowserError>;
    async fn refresh(&self) -> Result<(), BrowserError>;
    async fn set_viewport(&self, viewport: Viewport) -> Result<(), BrowserError>;

    async fn close(&self) -> Result<(), BrowserError>;
}
