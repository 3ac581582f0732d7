//! Metrics collection and export for the control plane.
//!
//! This crate provides a unified metrics interface using the `metrics` crate
//! facade. When the `prometheus` feature is enabled, metrics are exported in
//! Prometheus text format via [`MetricsHandle::render`].
//!
//! ```rust,ignore
//! use navigant_metrics::{counter, gauge, histogram};
//!
//! counter!(navigant_metrics::pool::BROWSERS_CREATED_TOTAL).increment(1);
//! gauge!(navigant_metrics::pool::UTILIZATION).set(0.4);
//! histogram!(navigant_metrics::pool::ACQUIRE_WAIT_SECONDS).record(0.012);
//! ```

mod definitions;
mod recorder;

pub use definitions::*;
pub use recorder::{MetricsHandle, MetricsRecorderConfig, init_metrics};

pub use metrics::{counter, gauge, histogram};
