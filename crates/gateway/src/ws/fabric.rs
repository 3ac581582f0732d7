//! WebSocket Fabric (C9): connection registry, subscription matching and
//! event fan-out (spec §4.5, §6 wire table).

use std::{collections::HashMap, sync::atomic::{AtomicU64, Ordering}};

use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::debug;

use navigant_metrics::websocket as ws_metrics;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Connected,
    Authenticated,
    Terminating,
    Closed,
}

/// One subscription a connection holds (spec §3 "Subscription").
#[derive(Debug, Clone)]
pub struct Subscription {
    pub channel: String,
    pub filters: HashMap<String, Value>,
}

impl Subscription {
    /// `browser:navigation*` matches `browser:navigation` and anything with
    /// that prefix plus `:` (spec §4.5 "A trailing `*` subscribes to a prefix").
    fn channel_matches(&self, channel: &str) -> bool {
        match self.channel.strip_suffix('*') {
            Some(prefix) => channel.starts_with(prefix),
            None => self.channel == channel,
        }
    }

    fn filters_match(&self, fields: &HashMap<String, Value>) -> bool {
        self.filters
            .iter()
            .all(|(k, v)| fields.get(k).is_some_and(|actual| actual == v))
    }
}

/// A connected client's registry entry. The live socket write half is not
/// stored here — `sender` forwards serialized frames to the single write-loop
/// task owning it (spec §4.5, mirroring the teacher's per-connection mpsc
/// channel pattern).
pub struct Connection {
    pub conn_id: String,
    pub sender: mpsc::UnboundedSender<String>,
    pub state: ConnectionState,
    pub user_id: Option<String>,
    pub is_admin: bool,
    pub subscriptions: Vec<Subscription>,
}

impl Connection {
    pub fn send(&self, frame: &str) -> bool {
        self.sender.send(frame.to_string()).is_ok()
    }
}

/// One event published into the fabric for fan-out evaluation.
pub struct FabricEvent {
    pub channel: String,
    pub frame: String,
    /// Fields available for subscription `filters` matching (e.g.
    /// `sessionId`, `userId`, `pageId`).
    pub fields: HashMap<String, Value>,
    /// Owning user id; non-admin subscribers may only receive events they
    /// themselves own (spec §4.5 "owner match").
    pub owner_user_id: Option<String>,
}

pub struct WsFabric {
    connections: DashMap<String, Connection>,
    seq: AtomicU64,
}

impl Default for WsFabric {
    fn default() -> Self {
        Self::new()
    }
}

impl WsFabric {
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
            seq: AtomicU64::new(0),
        }
    }

    pub fn next_request_id(&self) -> String {
        format!("evt_{}", self.seq.fetch_add(1, Ordering::Relaxed))
    }

    pub fn register(&self, conn: Connection) {
        self.connections.insert(conn.conn_id.clone(), conn);
        navigant_metrics::counter!(ws_metrics::CONNECTIONS_TOTAL).increment(1);
        self.update_active_gauge();
    }

    pub fn remove(&self, conn_id: &str) {
        self.connections.remove(conn_id);
        self.update_active_gauge();
    }

    pub fn set_state(&self, conn_id: &str, state: ConnectionState) {
        if let Some(mut entry) = self.connections.get_mut(conn_id) {
            entry.state = state;
        }
    }

    pub fn set_authenticated(&self, conn_id: &str, user_id: String, is_admin: bool) {
        if let Some(mut entry) = self.connections.get_mut(conn_id) {
            entry.state = ConnectionState::Authenticated;
            entry.user_id = Some(user_id);
            entry.is_admin = is_admin;
        }
    }

    /// Adds a subscription after authorization has already been checked by
    /// the caller (spec §4.5 "Each subscription is authorized").
    pub fn subscribe(&self, conn_id: &str, channel: String, filters: HashMap<String, Value>) {
        if let Some(mut entry) = self.connections.get_mut(conn_id) {
            entry.subscriptions.push(Subscription { channel, filters });
        }
        navigant_metrics::gauge!(ws_metrics::SUBSCRIPTIONS_ACTIVE).increment(1.0);
    }

    pub fn unsubscribe(&self, conn_id: &str, channel: &str) {
        if let Some(mut entry) = self.connections.get_mut(conn_id) {
            entry.subscriptions.retain(|s| s.channel != channel);
        }
        navigant_metrics::gauge!(ws_metrics::SUBSCRIPTIONS_ACTIVE).decrement(1.0);
    }

    /// Evaluates every live subscription against `event` and delivers to
    /// matches exactly once (spec §4.5 "Event fan-out"). Delivery is
    /// best-effort: a closed connection's send failure is swallowed, the
    /// write-loop task's own disconnect handling removes the registry entry.
    pub fn publish(&self, event: &FabricEvent) {
        let mut delivered = 0u64;
        for entry in self.connections.iter() {
            if entry.state != ConnectionState::Authenticated {
                continue;
            }
            if !entry.is_admin {
                match (&entry.user_id, &event.owner_user_id) {
                    (Some(conn_user), Some(owner)) if conn_user != owner => continue,
                    (None, Some(_)) => continue,
                    _ => {},
                }
            }
            let matches = entry
                .subscriptions
                .iter()
                .any(|s| s.channel_matches(&event.channel) && s.filters_match(&event.fields));
            if matches && entry.send(&event.frame) {
                delivered += 1;
            }
        }
        if delivered > 0 {
            debug!(channel = %event.channel, delivered, "fanned out event");
        }
        if delivered > 0 {
            navigant_metrics::counter!(ws_metrics::EVENTS_FANNED_OUT_TOTAL).increment(delivered);
        }
    }

    fn update_active_gauge(&self) {
        navigant_metrics::gauge!(ws_metrics::CONNECTIONS_ACTIVE).set(self.connections.len() as f64);
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub fn connection_user_id(&self, conn_id: &str) -> Option<String> {
        self.connections.get(conn_id).and_then(|c| c.user_id.clone())
    }

    pub fn connection_is_admin(&self, conn_id: &str) -> bool {
        self.connections.get(conn_id).is_some_and(|c| c.is_admin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conn(id: &str, user: Option<&str>, admin: bool) -> (Connection, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Connection {
                conn_id: id.to_string(),
                sender: tx,
                state: ConnectionState::Authenticated,
                user_id: user.map(str::to_string),
                is_admin: admin,
                subscriptions: Vec::new(),
            },
            rx,
        )
    }

    #[test]
    fn subscription_with_filters_delivers_exactly_one_match() {
        let fabric = WsFabric::new();
        let (c1, mut rx1) = conn("c1", Some("u1"), false);
        fabric.register(c1);
        fabric.subscribe(
            "c1",
            "session:events".to_string(),
            HashMap::from([("sessionId".to_string(), Value::String("S".to_string()))]),
        );

        let event_s = FabricEvent {
            channel: "session:events".to_string(),
            frame: "frame-for-S".to_string(),
            fields: HashMap::from([("sessionId".to_string(), Value::String("S".to_string()))]),
            owner_user_id: Some("u1".to_string()),
        };
        let event_s_prime = FabricEvent {
            channel: "session:events".to_string(),
            frame: "frame-for-Sprime".to_string(),
            fields: HashMap::from([("sessionId".to_string(), Value::String("S2".to_string()))]),
            owner_user_id: Some("u1".to_string()),
        };
        fabric.publish(&event_s_prime);
        fabric.publish(&event_s);

        assert_eq!(rx1.try_recv().unwrap(), "frame-for-S");
        assert!(rx1.try_recv().is_err());
    }

    #[test]
    fn wildcard_channel_matches_prefix() {
        let sub = Subscription {
            channel: "browser:*".to_string(),
            filters: HashMap::new(),
        };
        assert!(sub.channel_matches("browser:navigation"));
        assert!(!sub.channel_matches("session:events"));
    }

    #[test]
    fn non_admin_never_receives_other_users_events() {
        let fabric = WsFabric::new();
        let (c1, mut rx1) = conn("c1", Some("u1"), false);
        fabric.register(c1);
        fabric.subscribe("c1", "session:events".to_string(), HashMap::new());

        fabric.publish(&FabricEvent {
            channel: "session:events".to_string(),
            frame: "other-user-frame".to_string(),
            fields: HashMap::new(),
            owner_user_id: Some("u2".to_string()),
        });
        assert!(rx1.try_recv().is_err());
    }
}
