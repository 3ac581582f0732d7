//! Metric name and label definitions, grouped by the component that emits them.
//! Centralizing these avoids typo'd metric names scattered through the codebase.

/// Browser Pool (C1) metrics.
pub mod pool {
    pub const BROWSERS_CREATED_TOTAL: &str = "navigant_pool_browsers_created_total";
    pub const BROWSERS_DESTROYED_TOTAL: &str = "navigant_pool_browsers_destroyed_total";
    pub const BROWSERS_RECYCLED_TOTAL: &str = "navigant_pool_browsers_recycled_total";
    pub const BROWSERS_ACTIVE: &str = "navigant_pool_browsers_active";
    pub const BROWSERS_IDLE: &str = "navigant_pool_browsers_idle";
    pub const UTILIZATION: &str = "navigant_pool_utilization_ratio";
    pub const QUEUE_LENGTH: &str = "navigant_pool_queue_length";
    pub const ACQUIRE_WAIT_SECONDS: &str = "navigant_pool_acquire_wait_seconds";
    pub const ACQUIRE_TIMEOUTS_TOTAL: &str = "navigant_pool_acquire_timeouts_total";
    pub const HEALTH_CHECK_FAILURES_TOTAL: &str = "navigant_pool_health_check_failures_total";
    pub const INSTANCE_LIFETIME_SECONDS: &str = "navigant_pool_instance_lifetime_seconds";
}

/// Session Store (C3) metrics.
pub mod session {
    pub const CREATED_TOTAL: &str = "navigant_sessions_created_total";
    pub const TERMINATED_TOTAL: &str = "navigant_sessions_terminated_total";
    pub const ACTIVE: &str = "navigant_sessions_active";
    pub const EXPIRED_TOTAL: &str = "navigant_sessions_expired_total";
}

/// Page Manager (C2) / Context Registry (C4) metrics.
pub mod page {
    pub const CREATED_TOTAL: &str = "navigant_pages_created_total";
    pub const CLOSED_TOTAL: &str = "navigant_pages_closed_total";
    pub const NAVIGATION_ERRORS_TOTAL: &str = "navigant_pages_navigation_errors_total";
    pub const REAPED_IDLE_TOTAL: &str = "navigant_pages_reaped_idle_total";
}

/// Action Executor pipeline (C5–C8) metrics.
pub mod action {
    pub const EXECUTIONS_TOTAL: &str = "navigant_action_executions_total";
    pub const EXECUTION_DURATION_SECONDS: &str = "navigant_action_execution_duration_seconds";
    pub const VALIDATION_REJECTIONS_TOTAL: &str = "navigant_action_validation_rejections_total";
    pub const RETRIES_TOTAL: &str = "navigant_action_retries_total";
    pub const RETRY_EXHAUSTED_TOTAL: &str = "navigant_action_retry_exhausted_total";
}

/// WebSocket Fabric (C9) metrics.
pub mod websocket {
    pub const CONNECTIONS_TOTAL: &str = "navigant_websocket_connections_total";
    pub const CONNECTIONS_ACTIVE: &str = "navigant_websocket_connections_active";
    pub const SUBSCRIPTIONS_ACTIVE: &str = "navigant_websocket_subscriptions_active";
    pub const EVENTS_FANNED_OUT_TOTAL: &str = "navigant_websocket_events_fanned_out_total";
    pub const EVENTS_DROPPED_TOTAL: &str = "navigant_websocket_events_dropped_total";
}

/// HTTP (REST surface) metrics.
pub mod http {
    pub const REQUESTS_TOTAL: &str = "navigant_http_requests_total";
    pub const REQUEST_DURATION_SECONDS: &str = "navigant_http_request_duration_seconds";
}

/// Histogram bucket presets, mirrored into the Prometheus exporter at init time.
pub mod buckets {
    pub const DURATION_SECONDS: &[f64] = &[
        0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
    ];
}
