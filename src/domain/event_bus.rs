//! Broadcast feed for inbound bus messages.
//!
//! [`EventBus`] wraps a [`tokio::sync::broadcast`] channel. Transports push
//! every [`BusMessage`] received on a subscribed channel into the bus, and
//! the RPC client's receive loop (plus any fake worker in tests) consumes it.

use tokio::sync::broadcast;

use super::BusMessage;

/// Broadcast feed of [`BusMessage`]s.
///
/// Backed by a `tokio::broadcast` channel with a configurable capacity
/// (default 10 000). When the ring buffer is full, the oldest messages are
/// dropped for lagging receivers.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<BusMessage>,
}

impl EventBus {
    /// Creates a new `EventBus` with the given channel capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publishes a message to all receivers.
    ///
    /// Returns the number of receivers that got the message. With no active
    /// receivers the message is silently dropped.
    pub fn publish(&self, message: BusMessage) -> usize {
        self.sender.send(message).unwrap_or(0)
    }

    /// Creates a new receiver that will see all future messages.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<BusMessage> {
        self.sender.subscribe()
    }
}
