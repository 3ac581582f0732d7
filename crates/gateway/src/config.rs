//! Env-style layered configuration (spec §6 "Configuration (env-style,
//! enumerated)"). Each field corresponds 1:1 to one `NAVIGANT_*` variable;
//! the hosting binary (`navigant-server`, crates/cli) is responsible for
//! reading the process environment and `clap`-overriding before handing a
//! [`GatewayConfig`] to [`crate::build_state`].

use std::time::Duration;

use chrono::Duration as ChronoDuration;
use navigant_browser::{BrowserConfig, LaunchOptions};
use navigant_sessions::SessionStoreConfig;

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub bind: String,
    pub port: u16,

    // Pool (BROWSER_*).
    pub pool_max_size: usize,
    pub pool_max_pages_per_browser: usize,
    pub pool_idle_timeout: Duration,
    pub pool_acquire_timeout: Duration,
    pub pool_health_check_interval: Duration,
    pub pool_headless: bool,

    // Sessions (SESSION_*).
    pub session_ttl_default: Duration,
    pub session_max_per_user: usize,
    pub session_cleanup_interval: Duration,
    pub session_persist: bool,
    pub session_flush_interval: Duration,
    pub session_batch_size: usize,

    // Limits.
    pub action_max_batch: usize,
    pub nav_history_max: usize,

    // Security (TLS is terminated outside this core per spec §1; kept as
    // booleans/paths so the hosting binary can wire a terminator).
    pub tls_enabled: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 8443,
            pool_max_size: 5,
            pool_max_pages_per_browser: 10,
            pool_idle_timeout: Duration::from_secs(300),
            pool_acquire_timeout: Duration::from_secs(30),
            pool_health_check_interval: Duration::from_secs(60),
            pool_headless: true,
            session_ttl_default: Duration::from_secs(3600),
            session_max_per_user: 10,
            session_cleanup_interval: Duration::from_secs(60),
            session_persist: false,
            session_flush_interval: Duration::from_secs(5),
            session_batch_size: 10,
            action_max_batch: 100,
            nav_history_max: 50,
            tls_enabled: false,
        }
    }
}

impl GatewayConfig {
    /// Loads config from the process environment, falling back to
    /// [`Default`] for anything unset. `.env` loading (`dotenvy`) is the
    /// binary's responsibility, run before this is called.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(v) = std::env::var("NAVIGANT_BIND") {
            config.bind = v;
        }
        if let Some(v) = env_parsed("NAVIGANT_PORT") {
            config.port = v;
        }
        if let Some(v) = env_parsed("BROWSER_POOL_MAX_SIZE") {
            config.pool_max_size = v;
        }
        if let Some(v) = env_parsed("BROWSER_MAX_PAGES_PER_BROWSER") {
            config.pool_max_pages_per_browser = v;
        }
        if let Some(v) = env_millis("BROWSER_IDLE_TIMEOUT") {
            config.pool_idle_timeout = v;
        }
        if let Some(v) = env_millis("BROWSER_ACQUIRE_TIMEOUT") {
            config.pool_acquire_timeout = v;
        }
        if let Some(v) = env_millis("BROWSER_HEALTH_CHECK_INTERVAL") {
            config.pool_health_check_interval = v;
        }
        if let Some(v) = env_millis("SESSION_TTL_DEFAULT") {
            config.session_ttl_default = v;
        }
        if let Some(v) = env_parsed("SESSION_MAX_PER_USER") {
            config.session_max_per_user = v;
        }
        if let Some(v) = env_millis("SESSION_CLEANUP_INTERVAL") {
            config.session_cleanup_interval = v;
        }
        if let Some(v) = env_parsed::<bool>("SESSION_PERSIST") {
            config.session_persist = v;
        }
        if let Some(v) = env_millis("SESSION_FLUSH_INTERVAL") {
            config.session_flush_interval = v;
        }
        if let Some(v) = env_parsed("SESSION_BATCH_SIZE") {
            config.session_batch_size = v;
        }
        if let Some(v) = env_parsed("ACTION_MAX_BATCH") {
            config.action_max_batch = v;
        }
        if let Some(v) = env_parsed("NAV_HISTORY_MAX") {
            config.nav_history_max = v;
        }
        if let Some(v) = env_parsed::<bool>("TLS_ENABLED") {
            config.tls_enabled = v;
        }

        config
    }

    #[must_use]
    pub fn browser_config(&self) -> BrowserConfig {
        BrowserConfig {
            max_browsers: self.pool_max_size,
            max_pages_per_browser: self.pool_max_pages_per_browser,
            idle_timeout: self.pool_idle_timeout,
            acquisition_timeout: self.pool_acquire_timeout,
            health_check_interval: self.pool_health_check_interval,
            recycle_after_uses: 1_000,
            launch_options: LaunchOptions {
                headless: self.pool_headless,
                ..Default::default()
            },
        }
    }

    #[must_use]
    pub fn session_store_config(&self) -> SessionStoreConfig {
        SessionStoreConfig {
            default_ttl: ChronoDuration::from_std(self.session_ttl_default).unwrap_or_else(|_| ChronoDuration::hours(1)),
            max_per_user: self.session_max_per_user,
            batch_size: self.session_batch_size,
            flush_interval: self.session_flush_interval,
        }
    }
}

fn env_parsed<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

fn env_millis(key: &str) -> Option<Duration> {
    env_parsed::<u64>(key).map(Duration::from_millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_table() {
        let config = GatewayConfig::default();
        assert_eq!(config.pool_max_size, 5);
        assert_eq!(config.pool_max_pages_per_browser, 10);
        assert_eq!(config.session_max_per_user, 10);
        assert_eq!(config.action_max_batch, 100);
    }
}
