//! Raw message received from the pub/sub bus.

/// A payload delivered on a named bus channel.
///
/// Payloads are kept as the raw string published by the sender; decoding is
/// up to whoever consumes the channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusMessage {
    /// Channel the message was published on.
    pub channel: String,
    /// Raw payload (JSON by convention).
    pub payload: String,
}

impl BusMessage {
    /// Creates a message from borrowed parts.
    #[must_use]
    pub fn new(channel: &str, payload: &str) -> Self {
        Self {
            channel: channel.to_string(),
            payload: payload.to_string(),
        }
    }
}
