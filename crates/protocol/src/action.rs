//! The `Action`/`ActionResult` data model (spec §3). `Action` is a tagged
//! union — one variant per supported action type — dispatched by tag string,
//! never by inheritance (spec §9 "Polymorphism over Action").

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One submitted unit of work against a page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    pub page_id: String,
    /// Per-action timeout override in milliseconds; falls back to the
    /// handler's default when absent (spec §5 "effective timeout").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    #[serde(flatten)]
    pub kind: ActionKind,
}

impl Action {
    #[must_use]
    pub fn type_tag(&self) -> &'static str {
        self.kind.type_tag()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ActionKind {
    Navigate {
        url: String,
        #[serde(default)]
        wait_until: Option<String>,
    },
    Click {
        selector: String,
        #[serde(default)]
        button: Option<String>,
    },
    Type {
        selector: String,
        text: String,
        #[serde(default)]
        delay_ms: Option<u64>,
    },
    Select {
        selector: String,
        values: Vec<String>,
    },
    Keyboard {
        key: String,
        #[serde(default)]
        modifiers: Vec<String>,
    },
    Mouse {
        x: f64,
        y: f64,
        #[serde(default)]
        action: Option<String>,
    },
    Screenshot {
        #[serde(default)]
        full_page: bool,
        #[serde(default)]
        selector: Option<String>,
    },
    Pdf {
        #[serde(default)]
        landscape: bool,
    },
    Wait {
        #[serde(flatten)]
        condition: WaitCondition,
    },
    Scroll {
        #[serde(default)]
        selector: Option<String>,
        #[serde(default)]
        x: f64,
        #[serde(default)]
        y: f64,
    },
    Evaluate {
        script: String,
    },
    InjectScript {
        script: String,
    },
    InjectCss {
        css: String,
    },
    Upload {
        selector: String,
        file_paths: Vec<String>,
    },
    Cookie {
        #[serde(flatten)]
        op: CookieOp,
    },
    GoBack {},
    GoForward {},
    Refresh {},
    SetViewport {
        width: u32,
        height: u32,
        #[serde(default)]
        device_scale_factor: Option<f64>,
    },
}

impl ActionKind {
    #[must_use]
    pub fn type_tag(&self) -> &'static str {
        match self {
            Self::Navigate { .. } => "navigate",
            Self::Click { .. } => "click",
            Self::Type { .. } => "type",
            Self::Select { .. } => "select",
            Self::Keyboard { .. } => "keyboard",
            Self::Mouse { .. } => "mouse",
            Self::Screenshot { .. } => "screenshot",
            Self::Pdf { .. } => "pdf",
            Self::Wait { .. } => "wait",
            Self::Scroll { .. } => "scroll",
            Self::Evaluate { .. } => "evaluate",
            Self::InjectScript { .. } => "injectScript",
            Self::InjectCss { .. } => "injectCSS",
            Self::Upload { .. } => "upload",
            Self::Cookie { .. } => "cookie",
            Self::GoBack {} => "goBack",
            Self::GoForward {} => "goForward",
            Self::Refresh {} => "refresh",
            Self::SetViewport { .. } => "setViewport",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "wait_for", rename_all = "camelCase")]
pub enum WaitCondition {
    Selector { selector: String },
    Navigation {},
    Timeout { duration_ms: u64 },
    Function { function: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "cookie_op", rename_all = "camelCase")]
pub enum CookieOp {
    Set {
        name: String,
        value: String,
        #[serde(default)]
        domain: Option<String>,
        #[serde(default)]
        path: Option<String>,
    },
    Get {
        #[serde(default)]
        name: Option<String>,
    },
    Delete {
        name: String,
    },
    Clear {},
}

/// Outcome of executing one [`Action`] (spec §3). Exactly one of `data`/
/// `error` is populated — enforced by [`ActionResult::ok`]/[`ActionResult::failed`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionResult {
    pub success: bool,
    pub action_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<crate::error::ProtocolError>,
    pub duration_ms: u64,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl ActionResult {
    #[must_use]
    pub fn ok(action_type: &str, data: serde_json::Value, duration_ms: u64) -> Self {
        Self {
            success: true,
            action_type: action_type.to_string(),
            data: Some(data),
            error: None,
            duration_ms,
            timestamp: Utc::now(),
            metadata: serde_json::Map::new(),
        }
    }

    #[must_use]
    pub fn failed(
        action_type: &str,
        error: crate::error::ProtocolError,
        duration_ms: u64,
    ) -> Self {
        Self {
            success: false,
            action_type: action_type.to_string(),
            data: None,
            error: Some(error),
            duration_ms,
            timestamp: Utc::now(),
            metadata: serde_json::Map::new(),
        }
    }

    #[must_use]
    pub fn with_metadata(mut self, key: &str, value: serde_json::Value) -> Self {
        self.metadata.insert(key.to_string(), value);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn navigate_round_trips_through_json() {
        let action = Action {
            page_id: "page_1".into(),
            timeout_ms: Some(5000),
            kind: ActionKind::Navigate {
                url: "https://example.com".into(),
                wait_until: None,
            },
        };
        let json = serde_json::to_value(&action).expect("serialize");
        assert_eq!(json["type"], "navigate");
        assert_eq!(json["url"], "https://example.com");
        let back: Action = serde_json::from_value(json).expect("deserialize");
        assert_eq!(back.type_tag(), "navigate");
    }

    #[test]
    fn result_carries_exactly_one_of_data_or_error() {
        let ok = ActionResult::ok("click", serde_json::json!({"clicked": true}), 10);
        assert!(ok.data.is_some() && ok.error.is_none());

        let err = ActionResult::failed(
            "click",
            crate::error::ProtocolError::new(
                crate::error::ErrorKind::ElementNotFound,
                "ELEMENT_NOT_FOUND",
                "no such element",
            ),
            10,
        );
        assert!(err.data.is_none() && err.error.is_some());
    }
}
