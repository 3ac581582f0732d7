//! Session record and lifecycle state (spec §3 "Session", §4.3 state machine).

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Creating,
    Active,
    Idle,
    Expiring,
    Terminated,
}

impl SessionState {
    /// Whether `self -> next` is a legal transition per the state machine
    /// diagram in spec §4.3.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        use SessionState::*;
        matches!(
            (self, next),
            (Creating, Active)
                | (Active, Idle)
                | (Idle, Active)
                | (Active, Expiring)
                | (Idle, Expiring)
                | (Expiring, Active)
                | (Creating, Terminated)
                | (Active, Terminated)
                | (Idle, Terminated)
                | (Expiring, Terminated)
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub user_id: String,
    pub username: String,
    pub roles: HashSet<String>,
    pub scopes: HashSet<String>,
    pub metadata: HashMap<String, Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_accessed_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub state: SessionState,
    pub connections: HashSet<String>,
}

impl Session {
    pub fn new(user_id: impl Into<String>, username: impl Into<String>, ttl: ChronoDuration) -> Self {
        let now = Utc::now();
        Self {
            id: navigant_common::ids::new_id("sess"),
            user_id: user_id.into(),
            username: username.into(),
            roles: HashSet::new(),
            scopes: HashSet::new(),
            metadata: HashMap::new(),
            created_at: now,
            updated_at: now,
            last_accessed_at: now,
            expires_at: now + ttl,
            state: SessionState::Creating,
            connections: HashSet::new(),
        }
    }

    #[must_use]
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.roles.contains("admin")
    }

    /// `touch()` bumps `lastAccessedAt` without extending `expiresAt` (spec
    /// §3 invariant).
    pub fn touch(&mut self) {
        let now = Utc::now();
        self.last_accessed_at = now;
        self.updated_at = now;
        if self.state == SessionState::Expiring {
            self.state = SessionState::Active;
        }
    }

    /// `refresh()` extends `expiresAt` strictly forward (spec §3, property
    /// 9 "Round-trip session").
    pub fn refresh(&mut self, ttl: ChronoDuration) {
        self.touch();
        self.expires_at = self.expires_at.max(Utc::now() + ttl);
    }

    pub fn bind_connection(&mut self, connection_id: impl Into<String>) {
        self.connections.insert(connection_id.into());
        if self.state == SessionState::Creating {
            self.state = SessionState::Active;
        } else if self.state == SessionState::Idle {
            self.state = SessionState::Active;
        }
        self.updated_at = Utc::now();
    }

    pub fn unbind_connection(&mut self, connection_id: &str) {
        self.connections.remove(connection_id);
        if self.connections.is_empty() && self.state == SessionState::Active {
            self.state = SessionState::Idle;
        }
        self.updated_at = Utc::now();
    }

    /// Re-evaluates the time-based transition to `expiring` (spec §4.3 "any
    /// -> expiring when age > 0.9*ttl").
    pub fn reevaluate_expiry(&mut self, ttl: ChronoDuration) {
        if self.state == SessionState::Terminated {
            return;
        }
        let age = Utc::now() - self.created_at;
        let threshold = ChronoDuration::milliseconds((ttl.num_milliseconds() as f64 * 0.9) as i64);
        if age > threshold && self.state != SessionState::Expiring {
            self.state = SessionState::Expiring;
            self.updated_at = Utc::now();
        }
    }

    pub fn terminate(&mut self) {
        self.state = SessionState::Terminated;
        self.updated_at = Utc::now();
    }
}

#[derive(Debug, Clone, Default)]
pub struct SessionFilter {
    pub user_id: Option<String>,
    pub ids: Option<Vec<String>>,
    pub status: Option<SessionState>,
}

#[derive(Debug, Clone)]
pub enum SessionEvent {
    Created(Session),
    Updated(Session),
    Touched(String),
    Deleted(String),
}
