//! WebSocket frame types.
//!
//! Both directions use JSON text frames named after the event they carry:
//!
//! ```json
//! { "event": "bet", "data": { "roulette": "r1", "bet": { ... } } }
//! ```
//!
//! Server frames additionally carry an RFC 3339 `timestamp`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::OutboundEvent;

/// Event name of frames reporting a protocol error to the client.
pub const ERROR_EVENT: &str = "error";

/// Frame sent by a client.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientFrame {
    /// Event name, e.g. `bet`.
    pub event: String,
    /// Event body.
    #[serde(default)]
    pub data: serde_json::Value,
}

/// Frame sent to a client.
#[derive(Debug, Clone, Serialize)]
pub struct ServerFrame {
    /// Event name.
    pub event: String,
    /// Event body.
    pub data: serde_json::Value,
    /// Server-side emission time.
    pub timestamp: DateTime<Utc>,
}

impl ServerFrame {
    /// Frame carrying an event emitted to the session's rooms.
    #[must_use]
    pub fn from_event(event: &OutboundEvent) -> Self {
        Self {
            event: event.event.as_str().to_string(),
            data: event.data.clone(),
            timestamp: event.timestamp,
        }
    }

    /// Protocol error frame.
    #[must_use]
    pub fn error(code: u16, message: &str) -> Self {
        Self {
            event: ERROR_EVENT.to_string(),
            data: serde_json::json!({ "code": code, "message": message }),
            timestamp: Utc::now(),
        }
    }

    /// Encodes the frame as JSON text.
    #[must_use]
    pub fn encode(&self) -> Option<String> {
        serde_json::to_string(self).ok()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::SocketEvent;

    #[test]
    fn client_frame_without_data_defaults_to_null() {
        let Ok(frame) = serde_json::from_str::<ClientFrame>(r#"{"event":"bet"}"#) else {
            panic!("frame should parse");
        };
        assert_eq!(frame.event, "bet");
        assert!(frame.data.is_null());
    }

    #[test]
    fn server_frame_uses_wire_event_name() {
        let event = OutboundEvent::bet_error("Round closed");
        let Some(json) = ServerFrame::from_event(&event).encode() else {
            panic!("frame should encode");
        };
        let Ok(value) = serde_json::from_str::<serde_json::Value>(&json) else {
            panic!("frame should be JSON");
        };
        assert_eq!(value["event"], SocketEvent::BetError.as_str());
        assert_eq!(value["data"]["error"], "Round closed");
        assert!(value["timestamp"].is_string());
    }

    #[test]
    fn error_frame_shape() {
        let frame = ServerFrame::error(400, "malformed JSON");
        assert_eq!(frame.event, "error");
        assert_eq!(frame.data["code"], 400);
        assert_eq!(frame.data["message"], "malformed JSON");
    }
}
