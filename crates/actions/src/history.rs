//! Per-(session,context) ring buffer of executed actions (spec §4.4 step 6,
//! §6 "Ring-buffer history is non-persistent by design").

use std::{collections::VecDeque, sync::Arc};

use dashmap::DashMap;
use navigant_protocol::ActionResult;
use tokio::sync::Mutex;

const RING_CAPACITY: usize = 1000;

#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub action_type: String,
    pub result: ActionResult,
}

/// `history(sessionId, contextId, limit)` query surface, keyed by
/// `(sessionId, contextId)`. Trim happens inline on append (spec §5 "trim
/// happens inline on append").
#[derive(Default)]
pub struct ActionHistory {
    buffers: DashMap<(String, String), Arc<Mutex<VecDeque<HistoryEntry>>>>,
}

impl ActionHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn record(&self, session_id: &str, context_id: &str, result: ActionResult) {
        let key = (session_id.to_string(), context_id.to_string());
        let buffer = self
            .buffers
            .entry(key)
            .or_insert_with(|| Arc::new(Mutex::new(VecDeque::with_capacity(RING_CAPACITY))))
            .clone();
        let mut buffer = buffer.lock().await;
        let action_type = result.action_type.clone();
        buffer.push_back(HistoryEntry { action_type, result });
        while buffer.len() > RING_CAPACITY {
            buffer.pop_front();
        }
    }

    /// `history(sessionId, contextId, limit)`: most recent entries first.
    pub async fn query(&self, session_id: &str, context_id: &str, limit: usize) -> Vec<HistoryEntry> {
        let key = (session_id.to_string(), context_id.to_string());
        let Some(buffer) = self.buffers.get(&key) else {
            return Vec::new();
        };
        let buffer = buffer.lock().await;
        buffer.iter().rev().take(limit).cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result() -> ActionResult {
        ActionResult::ok("navigate", serde_json::json!({}), 1)
    }

    #[tokio::test]
    async fn history_evicts_oldest_entries_past_ring_capacity() {
        let history = ActionHistory::new();
        for _ in 0..(RING_CAPACITY + 10) {
            history.record("s1", "c1", result()).await;
        }
        let all = history.query("s1", "c1", RING_CAPACITY + 10).await;
        assert_eq!(all.len(), RING_CAPACITY);
    }

    #[tokio::test]
    async fn query_respects_limit_and_recency_order() {
        let history = ActionHistory::new();
        history.record("s1", "c1", ActionResult::ok("navigate", serde_json::json!({"n": 1}), 1)).await;
        history.record("s1", "c1", ActionResult::ok("click", serde_json::json!({"n": 2}), 1)).await;

        let recent = history.query("s1", "c1", 1).await;
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].action_type, "click");
    }
}
