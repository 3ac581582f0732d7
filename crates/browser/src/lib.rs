//! Browser Pool (C1): a bounded set of browser processes handed out under
//! session tags, with FIFO acquisition, idle reaping, health checks and
//! weighted recycling.

pub mod chromium;
pub mod driver;
pub mod error;
pub mod instance;
pub mod pool;
pub mod recycle;
pub mod types;

pub use chromium::ChromiumDriver;
pub use driver::{BrowserDriver, DriverPage, DriverProcess};
pub use error::BrowserError;
pub use instance::BrowserInstance;
pub use pool::BrowserPool;
pub use recycle::{RecyclePolicy, RecycleSignals, RecycleWeights};
pub use types::{
    BrowserConfig, BrowserHandle, BrowserState, HealthSample, LaunchOptions, PageOptions, Viewport,
};
