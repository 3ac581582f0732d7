//! Gateway: wires the core (Browser Pool, Session Store, Context Registry,
//! Page Manager, Action Executor) to the REST, gRPC and WebSocket transport
//! surfaces (spec §6). The hosting binary (`crates/cli`) is the only caller
//! of [`build_state`] and [`server::serve`]; this crate never reaches for
//! global state on its own (spec §9 "Global state ... explicit constructor
//! injection").

pub mod auth;
pub mod config;
pub mod error;
pub mod grpc;
pub mod rest;
pub mod server;
pub mod state;
pub mod ws;

use std::sync::Arc;

use navigant_actions::ActionExecutor;
use navigant_browser::{BrowserPool, ChromiumDriver};
use navigant_pages::{ContextRegistry, PageManager};
use navigant_sessions::{NoopPersistence, SessionStore};

pub use config::GatewayConfig;
pub use state::GatewayState;

/// Assembles every core collaborator from a [`GatewayConfig`] and returns
/// the shared [`GatewayState`] the transport surfaces are built on. Kept
/// separate from `main` so tests and alternate binaries can reuse it with a
/// different [`auth::Authenticator`] or driver.
#[must_use]
pub fn build_state(
    config: GatewayConfig,
    authenticator: Arc<dyn auth::Authenticator>,
    metrics: Option<navigant_metrics::MetricsHandle>,
) -> Arc<GatewayState> {
    let pool = Arc::new(BrowserPool::new(
        config.browser_config(),
        Box::new(ChromiumDriver),
    ));
    let sessions = Arc::new(SessionStore::new(
        config.session_store_config(),
        Arc::new(NoopPersistence),
    ));
    let contexts = Arc::new(ContextRegistry::new());
    let pages = Arc::new(PageManager::new(pool.clone(), config.nav_history_max));
    let executor = Arc::new(ActionExecutor::new(pages.clone()));

    GatewayState::new(config, sessions, contexts, pages, pool, executor, authenticator, metrics)
}
