//! WebSocket wire frames (spec §6). Every frame is a JSON object
//! `{type, payload, timestamp, requestId?}`; `type` selects how `payload`
//! is interpreted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The outer envelope every frame is wrapped in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WsEnvelope {
    #[serde(rename = "type")]
    pub frame_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "requestId", skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl WsEnvelope {
    #[must_use]
    pub fn new(frame_type: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            frame_type: frame_type.into(),
            payload: Some(payload),
            timestamp: Utc::now(),
            request_id: None,
        }
    }

    #[must_use]
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    /// Decode `payload` into the typed payload matching `frame_type`, or
    /// `None` if the type is unrecognized.
    #[must_use]
    pub fn typed(&self) -> Option<WsPayload> {
        let payload = self.payload.clone().unwrap_or(serde_json::Value::Null);
        match self.frame_type.as_str() {
            "auth" => serde_json::from_value(payload).ok().map(WsPayload::Auth),
            "subscribe" => serde_json::from_value(payload)
                .ok()
                .map(WsPayload::Subscribe),
            "unsubscribe" => serde_json::from_value(payload)
                .ok()
                .map(WsPayload::Unsubscribe),
            _ => None,
        }
    }
}

/// Strongly-typed client→server payloads, decoded on demand from the
/// envelope's untyped JSON (keeps the envelope itself schema-agnostic so
/// unknown frame types never fail to parse at the outer layer).
#[derive(Clone)]
pub enum WsPayload {
    Auth(AuthPayload),
    Subscribe(SubscribePayload),
    Unsubscribe(UnsubscribePayload),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bearer: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscribePayload {
    pub channel: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<serde_json::Map<String, serde_json::Value>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnsubscribePayload {
    pub channel: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResultPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscribedPayload {
    pub channel: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserEventPayload {
    pub session_id: String,
    pub context_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_id: Option<String>,
    pub event: String,
    pub data: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceMetricPayload {
    pub metric: String,
    pub value: f64,
    pub page_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub code: String,
    pub message: String,
}

/// Builders for the fixed server→client frame types in the spec §6 table.
pub mod frame {
    use super::{AuthResultPayload, ErrorPayload, SubscribedPayload, WsEnvelope};

    #[must_use]
    pub fn auth_success() -> WsEnvelope {
        WsEnvelope::new(
            "auth_success",
            serde_json::to_value(AuthResultPayload { reason: None }).unwrap_or_default(),
        )
    }

    #[must_use]
    pub fn auth_failed(reason: impl Into<String>) -> WsEnvelope {
        WsEnvelope::new(
            "auth_failed",
            serde_json::to_value(AuthResultPayload {
                reason: Some(reason.into()),
            })
            .unwrap_or_default(),
        )
    }

    #[must_use]
    pub fn subscribed(channel: impl Into<String>) -> WsEnvelope {
        WsEnvelope::new(
            "subscribed",
            serde_json::to_value(SubscribedPayload {
                channel: channel.into(),
            })
            .unwrap_or_default(),
        )
    }

    #[must_use]
    pub fn unsubscribed(channel: impl Into<String>) -> WsEnvelope {
        WsEnvelope::new(
            "unsubscribed",
            serde_json::to_value(SubscribedPayload {
                channel: channel.into(),
            })
            .unwrap_or_default(),
        )
    }

    #[must_use]
    pub fn error(code: impl Into<String>, message: impl Into<String>) -> WsEnvelope {
        WsEnvelope::new(
            "error",
            serde_json::to_value(ErrorPayload {
                code: code.into(),
                message: message.into(),
            })
            .unwrap_or_default(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_round_trips() {
        let env = WsEnvelope::new(
            "subscribe",
            serde_json::json!({"channel": "session:events"}),
        )
        .with_request_id("req-1");
        let json = serde_json::to_string(&env).expect("serialize");
        let back: WsEnvelope = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back.frame_type, "subscribe");
        assert_eq!(back.request_id.as_deref(), Some("req-1"));
        match back.typed() {
            Some(WsPayload::Subscribe(p)) => assert_eq!(p.channel, "session:events"),
            other => panic!("unexpected payload: {other:?}"),
        }
    }
}

impl std::fmt::Debug for WsPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Auth(_) => write!(f, "Auth"),
            Self::Subscribe(p) => write!(f, "Subscribe({})", p.channel),
            Self::Unsubscribe(p) => write!(f, "Unsubscribe({})", p.channel),
        }
    }
}
