use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Event envelope delivered to subscribers (`spec.md` §4.8):
/// `{type, data, timestamp}` with an ISO-8601 UTC timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: Value,
    pub timestamp: DateTime<Utc>,
}

impl Envelope {
    pub fn new(event_type: impl Into<String>, data: Value) -> Self {
        Self {
            event_type: event_type.into(),
            data,
            timestamp: Utc::now(),
        }
    }

    pub fn pong() -> Self {
        Self::new("pong", Value::Null)
    }

    pub fn subscription_confirmed(event_types: &[String]) -> Self {
        Self::new(
            "subscription_confirmed",
            serde_json::json!({ "event_types": event_types }),
        )
    }
}

/// Inbound client frames the bus understands (`spec.md` §4.8): a heartbeat
/// ping and a subscription request. Anything else is ignored by
/// [`super::bus::EventBus::handle_inbound`] — unknown frame shapes are not
/// an error, they're simply not acted upon.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundFrame {
    Ping,
    Subscribe {
        #[serde(default)]
        event_types: Vec<String>,
    },
}

/// Predefined event families from `spec.md` §4.8.
pub mod families {
    pub const CRAWLER: &str = "crawler";
    pub const INGEST: &str = "ingest";
    pub const REVIEW: &str = "review";
    pub const CHECK: &str = "check";
    pub const ADMIN: &str = "admin";
}
