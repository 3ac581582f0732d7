//! Action Executor (C8): the fixed validate -> resolve page -> dispatch+retry
//! -> record pipeline (spec §4.4 "the hard part"). Phases execute in strict
//! order and are not reorderable by callers (spec §9 "Handler wiring").

use std::time::{Duration, Instant};

use navigant_pages::PageManager;
use navigant_protocol::{Action, ActionKind, ActionResult, ErrorKind, ProtocolError};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    dispatcher::ActionDispatcher,
    error::ActionError,
    history::{ActionHistory, HistoryEntry},
    retry::{self, RetryPolicy},
    validator,
};

#[cfg(feature = "metrics")]
use navigant_metrics::action as action_metrics;

const DEFAULT_ACTION_TIMEOUT_MS: u64 = 30_000;
const MAX_BATCH_SIZE: usize = 100;

/// Identity and addressing the caller supplies alongside an [`Action`]
/// (spec §4.4 `execute(action, callerCtx)`).
#[derive(Debug, Clone)]
pub struct CallerContext {
    pub session_id: String,
    pub context_id: String,
    pub request_id: String,
}

impl CallerContext {
    pub fn new(session_id: impl Into<String>, context_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            context_id: context_id.into(),
            request_id: format!("req_{}", Uuid::new_v4().simple()),
        }
    }
}

pub struct ActionExecutor {
    pages: std::sync::Arc<PageManager>,
    dispatcher: ActionDispatcher,
    history: ActionHistory,
    retry_policy: RetryPolicy,
}

impl ActionExecutor {
    pub fn new(pages: std::sync::Arc<PageManager>) -> Self {
        Self {
            pages,
            dispatcher: ActionDispatcher::new(),
            history: ActionHistory::new(),
            retry_policy: RetryPolicy::default(),
        }
    }

    pub fn dispatcher_mut(&mut self) -> &mut ActionDispatcher {
        &mut self.dispatcher
    }

    /// `execute(action, callerCtx) -> ActionResult` (spec §4.4).
    pub async fn execute(&self, action: Action, ctx: &CallerContext) -> ActionResult {
        let start = Instant::now();

        // Phase 1: audit start.
        info!(
            session_id = %ctx.session_id,
            context_id = %ctx.context_id,
            page_id = %action.page_id,
            action_type = action.type_tag(),
            request_id = %ctx.request_id,
            "command executed (start)"
        );

        let result = self.run_pipeline(&action, ctx, start).await;

        // Phase 6 (terminal half): audit outcome, record to history.
        info!(
            session_id = %ctx.session_id,
            context_id = %ctx.context_id,
            page_id = %action.page_id,
            action_type = action.type_tag(),
            request_id = %ctx.request_id,
            success = result.success,
            duration_ms = result.duration_ms,
            "command executed (end)"
        );
        self.history
            .record(&ctx.session_id, &ctx.context_id, result.clone())
            .await;

        #[cfg(feature = "metrics")]
        {
            navigant_metrics::histogram!(action_metrics::EXECUTION_DURATION_SECONDS)
                .record(result.duration_ms as f64 / 1000.0);
            navigant_metrics::counter!(action_metrics::EXECUTIONS_TOTAL).increment(1);
        }

        result
    }

    async fn run_pipeline(&self, action: &Action, ctx: &CallerContext, start: Instant) -> ActionResult {
        // Phase 2: validate.
        let outcome = match validator::validate(action) {
            Ok(outcome) => outcome,
            Err(e) => {
                #[cfg(feature = "metrics")]
                navigant_metrics::counter!(action_metrics::VALIDATION_REJECTIONS_TOTAL).increment(1);
                return self.error_result(action, e, start);
            },
        };

        // Phase 3: resolve page.
        let page = match self.pages.get_page_owned(&action.page_id, &ctx.session_id).await {
            Ok(page) => page,
            Err(e) => return self.error_result(action, ActionError::from(e), start),
        };

        // Phase 4 + 5: setup scoped timeout, dispatch + retry.
        let effective_timeout = Duration::from_millis(action.timeout_ms.unwrap_or(DEFAULT_ACTION_TIMEOUT_MS));
        let mut attempt = 0u32;
        let result = loop {
            attempt += 1;
            let dispatch = tokio::time::timeout(
                effective_timeout,
                self.dispatcher.dispatch(action.clone(), page.clone()),
            )
            .await;

            let outcome_result = match dispatch {
                Ok(inner) => inner,
                Err(_) => Err(ActionError::Browser(navigant_browser::BrowserError::Timeout(
                    format!("{} exceeded {}ms", action.type_tag(), effective_timeout.as_millis()),
                ))),
            };

            match outcome_result {
                Ok(mut result) => {
                    if attempt > 1 {
                        result = result.with_metadata(
                            "retryAttempts",
                            serde_json::json!(attempt),
                        );
                    }
                    break Ok(result);
                },
                Err(e) => {
                    let retryable = retry::is_retryable(&e);
                    if !retryable || attempt > self.retry_policy.max_retries {
                        #[cfg(feature = "metrics")]
                        if retryable {
                            navigant_metrics::counter!(action_metrics::RETRY_EXHAUSTED_TOTAL).increment(1);
                        }
                        break Err(e);
                    }
                    #[cfg(feature = "metrics")]
                    navigant_metrics::counter!(action_metrics::RETRIES_TOTAL).increment(1);
                    let delay = self.retry_policy.delay_for_attempt(attempt);
                    warn!(
                        action_type = action.type_tag(),
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "retrying action"
                    );
                    tokio::time::sleep(delay).await;
                },
            }
        };

        // Navigate dispatches through the driver directly (to re-navigate on
        // each retry attempt); reconcile the Page Manager's own history/state
        // bookkeeping here so it stays correct regardless of entry point
        // (spec §4.2 invariants apply whether navigation was triggered via
        // the dedicated endpoint or the action pipeline).
        if let ActionKind::Navigate { url, .. } = &action.kind {
            let outcome = match &result {
                Ok(_) => Ok(()),
                Err(e) => Err(navigant_browser::BrowserError::NavigationFailed(e.to_string())),
            };
            if let Err(e) = self.pages.apply_navigation_outcome(&page, url, outcome).await {
                warn!(error = %e, "failed to reconcile page state after navigate action");
            }
        }

        // Phase 6 (error half).
        match result {
            Ok(mut ok) => {
                if !outcome.advisories.is_empty() {
                    ok = ok.with_metadata("advisories", serde_json::json!(outcome.advisories));
                }
                ok
            },
            Err(e) => self.error_result(action, e, start),
        }
    }

    fn error_result(&self, action: &Action, error: ActionError, start: Instant) -> ActionResult {
        let kind = error.kind();
        let code = error_code(kind);
        let protocol_error = ProtocolError::new(kind, code, error.to_string());
        ActionResult::failed(
            action.type_tag(),
            protocol_error,
            start.elapsed().as_millis() as u64,
        )
    }

    /// `execute_batch` (SPEC_FULL §4): submits up to `MAX_BATCH_SIZE`
    /// actions, running them concurrently, returning results in submission
    /// order.
    pub async fn execute_batch(
        &self,
        actions: Vec<Action>,
        ctx: &CallerContext,
    ) -> Result<Vec<ActionResult>, ActionError> {
        if actions.len() > MAX_BATCH_SIZE {
            return Err(ActionError::validation(format!(
                "batch size {} exceeds maximum {MAX_BATCH_SIZE}",
                actions.len()
            )));
        }
        let futures = actions.into_iter().map(|action| self.execute(action, ctx));
        Ok(futures::future::join_all(futures).await)
    }

    /// `history(sessionId, contextId, limit)` (SPEC_FULL §4 supplemented
    /// feature).
    pub async fn history(&self, session_id: &str, context_id: &str, limit: usize) -> Vec<HistoryEntry> {
        self.history.query(session_id, context_id, limit).await
    }
}

fn error_code(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::ValidationFailed => "VALIDATION_FAILED",
        ErrorKind::Unauthenticated => "UNAUTHENTICATED",
        ErrorKind::AccessDenied => "ACCESS_DENIED",
        ErrorKind::NotFound => "NOT_FOUND",
        ErrorKind::Conflict => "CONFLICT",
        ErrorKind::RateLimited => "RATE_LIMITED",
        ErrorKind::Transient => "TRANSIENT",
        ErrorKind::Timeout => "TIMEOUT",
        ErrorKind::ElementNotFound => "ELEMENT_NOT_FOUND",
        ErrorKind::NavigationFailed => "NAVIGATION_FAILED",
        ErrorKind::InteractionFailed => "INTERACTION_FAILED",
        ErrorKind::EvaluationFailed => "EVALUATION_FAILED",
        ErrorKind::FileUploadFailed => "FILE_UPLOAD_FAILED",
        ErrorKind::PageClosed => "PAGE_CLOSED",
        ErrorKind::BrowserClosed => "BROWSER_CLOSED",
        ErrorKind::SecurityError => "SECURITY_ERROR",
        ErrorKind::NotSupported => "NOT_SUPPORTED",
        ErrorKind::Cancelled => "CANCELLED",
        ErrorKind::Internal => "INTERNAL",
    }
}
