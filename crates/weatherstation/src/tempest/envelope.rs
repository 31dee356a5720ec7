use serde::{Deserialize, Serialize};

use super::events::EventType;

/// Minimal shape of every inbound message, used only to route it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub station_id: Option<i64>,
}

impl Envelope {
    pub fn decode(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    /// The known event type, `None` for discriminators this crate does not model.
    pub fn event(&self) -> Option<EventType> {
        self.event_type.parse().ok()
    }
}
