//! Context and Page records (spec §3 "Context", "Page").

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextType {
    Default,
    Incognito,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextStatus {
    Active,
    Destroyed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Context {
    pub id: String,
    pub session_id: String,
    pub r#type: ContextType,
    pub status: ContextStatus,
    pub created_at: DateTime<Utc>,
}

impl Context {
    pub fn new(session_id: impl Into<String>, r#type: ContextType) -> Self {
        Self {
            id: navigant_common::ids::new_id("ctx"),
            session_id: session_id.into(),
            r#type,
            status: ContextStatus::Active,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageState {
    New,
    Active,
    Navigating,
    Idle,
    Closed,
    Errored,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageCreateOptions {
    #[serde(default)]
    pub viewport: Option<navigant_browser::Viewport>,
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(default)]
    pub extra_headers: std::collections::HashMap<String, String>,
    #[serde(default)]
    pub java_script_enabled: Option<bool>,
    #[serde(default)]
    pub bypass_csp: bool,
    #[serde(default)]
    pub offline_mode: bool,
    #[serde(default)]
    pub cache_enabled: Option<bool>,
}

/// Authoritative metadata the Page Manager keeps about one live page. The
/// driver-backed handle itself lives alongside this in `PageManager`'s table
/// (kept out of this struct so it stays `Serialize`-able for diagnostics).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageInfo {
    pub id: String,
    pub context_id: String,
    pub session_id: String,
    pub browser_id: String,
    pub url: String,
    pub title: String,
    pub state: PageState,
    pub error_count: u32,
    pub created_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
    #[serde(skip)]
    pub navigation_history: VecDeque<String>,
}

impl PageInfo {
    pub fn new(context_id: impl Into<String>, session_id: impl Into<String>, browser_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: navigant_common::ids::new_id("pg"),
            context_id: context_id.into(),
            session_id: session_id.into(),
            browser_id: browser_id.into(),
            url: String::from("about:blank"),
            title: String::new(),
            state: PageState::New,
            error_count: 0,
            created_at: now,
            last_activity_at: now,
            navigation_history: VecDeque::new(),
        }
    }

    pub fn record_navigation(&mut self, url: String, max_history: usize) {
        self.navigation_history.push_back(url.clone());
        while self.navigation_history.len() > max_history {
            self.navigation_history.pop_front();
        }
        self.url = url;
        self.state = PageState::Active;
        self.last_activity_at = Utc::now();
    }

    pub fn record_error(&mut self) {
        self.error_count += 1;
        self.state = PageState::Errored;
        self.last_activity_at = Utc::now();
    }

    pub fn touch(&mut self) {
        self.last_activity_at = Utc::now();
    }
}

#[derive(Debug, Clone)]
pub enum PageEvent {
    Created(PageInfo),
    Navigated(PageInfo),
    StateChanged(PageInfo),
    Error(PageInfo),
    Closed(String),
}
