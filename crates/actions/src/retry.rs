//! Retry/Error Engine (C7): classifies errors and computes exponential
//! backoff delays (spec §4.4 "Error taxonomy and retry classification").

use std::time::Duration;

use crate::error::ActionError;

const NON_RETRYABLE_SUBSTRINGS: &[&str] = &[
    "page closed",
    "browser closed",
    "session closed",
    "invalid selector",
    "invalid argument",
    "security error",
    "permission denied",
    "not supported",
];

const RETRYABLE_SUBSTRINGS: &[&str] = &[
    "timeout",
    "network error",
    "connection refused",
    "element not found",
    "element not visible",
    "element not interactable",
    "waiting for",
    "navigation failed",
];

/// Classifies whether `error` should be retried, combining the error kind's
/// default classification with the message-substring overrides from spec
/// §4.4. Unknown messages default to retryable (conservative).
#[must_use]
pub fn is_retryable(error: &ActionError) -> bool {
    if error.never_retry() {
        return false;
    }

    let message = error.to_string().to_lowercase();
    for pattern in NON_RETRYABLE_SUBSTRINGS {
        if message.contains(pattern) {
            return false;
        }
    }
    for pattern in RETRYABLE_SUBSTRINGS {
        if message.contains(pattern) {
            return true;
        }
    }

    error.kind().retryable_by_default()
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub backoff_multiplier: f64,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            backoff_multiplier: 2.0,
            max_delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// `delay = baseDelay * backoff^(attempt-1)`, clamped by `maxDelay`
    /// (spec §4.4). `attempt` is 1-indexed (the first retry is attempt 1).
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1) as i32;
        let raw = self.base_delay.as_secs_f64() * self.backoff_multiplier.powi(exponent);
        Duration::from_secs_f64(raw).min(self.max_delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn element_not_found_message_is_retryable_even_for_browser_kind() {
        let err = ActionError::Browser(navigant_browser::BrowserError::ElementNotFound("#btn".into()));
        assert!(is_retryable(&err));
    }

    #[test]
    fn page_closed_message_overrides_to_non_retryable() {
        let err = ActionError::Browser(navigant_browser::BrowserError::PageClosed);
        assert!(!is_retryable(&err));
    }

    #[test]
    fn validation_errors_are_never_retried() {
        let err = ActionError::validation("bad input");
        assert!(!is_retryable(&err));
    }

    #[test]
    fn backoff_delays_grow_then_clamp_at_max() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for_attempt(1), Duration::from_secs(1));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_secs(2));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_secs(4));
        assert_eq!(policy.delay_for_attempt(4), Duration::from_secs(5));
        assert_eq!(policy.delay_for_attempt(10), Duration::from_secs(5));
    }
}
