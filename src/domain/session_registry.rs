//! Connected sessions and the room index.
//!
//! [`SessionRegistry`] is the only owner of the connected-session set and of
//! room membership. Both are mutated exclusively through
//! [`SessionRegistry::connect`] and [`SessionRegistry::disconnect`]; every
//! other operation is a read.

use std::collections::{HashMap, HashSet};

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{RwLock, mpsc};

use super::session::{ClientSession, Handshake};
use super::{OutboundEvent, SessionId};

/// Events buffered per session before new ones are dropped.
pub const SESSION_QUEUE_CAPACITY: usize = 256;

/// Outbound half of a session: events pushed here are written to the socket.
pub type SessionSender = mpsc::Sender<OutboundEvent>;

#[derive(Debug)]
struct SessionEntry {
    session: ClientSession,
    sender: SessionSender,
}

#[derive(Debug, Default)]
struct Inner {
    sessions: HashMap<SessionId, SessionEntry>,
    rooms: HashMap<String, HashSet<SessionId>>,
}

/// Registry of connected sessions and the rooms they joined.
///
/// A single [`RwLock`] guards both maps so that membership and the session
/// set never disagree. Emission only takes the read lock.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    inner: RwLock<Inner>,
}

impl SessionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new session and joins its derived rooms.
    pub async fn connect(&self, handshake: Handshake, sender: SessionSender) -> ClientSession {
        let session = ClientSession::new(handshake);
        let session_id = session.session_id;

        let mut inner = self.inner.write().await;
        for room in session.rooms.all() {
            inner
                .rooms
                .entry(room.to_string())
                .or_default()
                .insert(session_id);
        }
        inner.sessions.insert(
            session_id,
            SessionEntry {
                session: session.clone(),
                sender,
            },
        );
        let connected = inner.sessions.len();
        drop(inner);

        tracing::info!(
            %session_id,
            user_id = %session.user_id,
            roulette_id = %session.roulette_id,
            connected,
            "client connected"
        );
        session
    }

    /// Removes a session and releases its room memberships.
    ///
    /// Returns the removed session, or `None` if it was not connected.
    pub async fn disconnect(&self, session_id: SessionId) -> Option<ClientSession> {
        let mut inner = self.inner.write().await;
        let entry = inner.sessions.remove(&session_id)?;
        for room in entry.session.rooms.all() {
            if let Some(members) = inner.rooms.get_mut(room) {
                members.remove(&session_id);
                if members.is_empty() {
                    inner.rooms.remove(room);
                }
            }
        }
        let connected = inner.sessions.len();
        drop(inner);

        tracing::info!(%session_id, connected, "client disconnected");
        Some(entry.session)
    }

    /// Sends an event to every session in `room`.
    ///
    /// Returns the number of sessions the event was queued for. Sessions
    /// whose socket task already ended are skipped, and so are sessions whose
    /// outbound queue is full: a client that stops reading loses events
    /// instead of growing its queue.
    pub async fn emit_to_room(&self, room: &str, event: &OutboundEvent) -> usize {
        let inner = self.inner.read().await;
        let Some(members) = inner.rooms.get(room) else {
            tracing::debug!(room, event = %event.event, "emit to empty room");
            return 0;
        };
        members
            .iter()
            .filter_map(|id| inner.sessions.get(id))
            .filter(|entry| match entry.sender.try_send(event.clone()) {
                Ok(()) => true,
                Err(TrySendError::Full(_)) => {
                    tracing::warn!(
                        session_id = %entry.session.session_id,
                        room,
                        event = %event.event,
                        "session lagging, dropping event"
                    );
                    false
                }
                Err(TrySendError::Closed(_)) => false,
            })
            .count()
    }

    /// Number of sessions currently in `room`.
    pub async fn room_size(&self, room: &str) -> usize {
        self.inner
            .read()
            .await
            .rooms
            .get(room)
            .map_or(0, HashSet::len)
    }

    /// Number of connected sessions.
    pub async fn connected_count(&self) -> usize {
        self.inner.read().await.sessions.len()
    }

    /// Rooms the session currently belongs to.
    pub async fn rooms_of(&self, session_id: SessionId) -> Vec<String> {
        let inner = self.inner.read().await;
        inner
            .rooms
            .iter()
            .filter(|(_, members)| members.contains(&session_id))
            .map(|(room, _)| room.clone())
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::SocketEvent;

    fn handshake(user: &str, table: &str) -> Handshake {
        Handshake {
            user_id: user.to_string(),
            roulette_id: table.to_string(),
            operator_id: "op".to_string(),
        }
    }

    #[tokio::test]
    async fn connect_joins_all_rooms() {
        let registry = SessionRegistry::new();
        let (tx, _rx) = mpsc::channel(SESSION_QUEUE_CAPACITY);
        let session = registry.connect(handshake("u1", "r1"), tx).await;

        assert_eq!(registry.connected_count().await, 1);
        let mut rooms = registry.rooms_of(session.session_id).await;
        rooms.sort();
        let mut expected = vec![
            "r1".to_string(),
            "u1-r1".to_string(),
            "u1".to_string(),
            session.session_id.to_string(),
        ];
        expected.sort();
        assert_eq!(rooms, expected);
    }

    #[tokio::test]
    async fn disconnect_releases_rooms() {
        let registry = SessionRegistry::new();
        let (tx, _rx) = mpsc::channel(SESSION_QUEUE_CAPACITY);
        let session = registry.connect(handshake("u1", "r1"), tx).await;

        let removed = registry.disconnect(session.session_id).await;
        assert_eq!(removed.map(|s| s.session_id), Some(session.session_id));
        assert_eq!(registry.connected_count().await, 0);
        assert_eq!(registry.room_size("r1").await, 0);
        assert!(registry.rooms_of(session.session_id).await.is_empty());

        assert!(registry.disconnect(session.session_id).await.is_none());
    }

    #[tokio::test]
    async fn room_size_counts_table_occupancy() {
        let registry = SessionRegistry::new();
        let (tx1, _rx1) = mpsc::channel(SESSION_QUEUE_CAPACITY);
        let (tx2, _rx2) = mpsc::channel(SESSION_QUEUE_CAPACITY);
        let (tx3, _rx3) = mpsc::channel(SESSION_QUEUE_CAPACITY);
        let _ = registry.connect(handshake("u1", "r1"), tx1).await;
        let _ = registry.connect(handshake("u2", "r1"), tx2).await;
        let _ = registry.connect(handshake("u3", "r2"), tx3).await;

        assert_eq!(registry.room_size("r1").await, 2);
        assert_eq!(registry.room_size("r2").await, 1);
        assert_eq!(registry.room_size("u2-r1").await, 1);
    }

    #[tokio::test]
    async fn emit_reaches_only_room_members() {
        let registry = SessionRegistry::new();
        let (tx1, mut rx1) = mpsc::channel(SESSION_QUEUE_CAPACITY);
        let (tx2, mut rx2) = mpsc::channel(SESSION_QUEUE_CAPACITY);
        let _ = registry.connect(handshake("u1", "r1"), tx1).await;
        let _ = registry.connect(handshake("u2", "r2"), tx2).await;

        let event = OutboundEvent::new(SocketEvent::RoundStart, serde_json::json!({"round": 1}));
        assert_eq!(registry.emit_to_room("r1", &event).await, 1);

        let Some(received) = rx1.recv().await else {
            panic!("u1 should receive the event");
        };
        assert_eq!(received.event, SocketEvent::RoundStart);
        assert!(rx2.try_recv().is_err());
    }

    #[tokio::test]
    async fn emit_skips_closed_sessions() {
        let registry = SessionRegistry::new();
        let (tx, rx) = mpsc::channel(SESSION_QUEUE_CAPACITY);
        let _ = registry.connect(handshake("u1", "r1"), tx).await;
        drop(rx);

        let event = OutboundEvent::bet_error("x");
        assert_eq!(registry.emit_to_room("r1", &event).await, 0);
        assert_eq!(registry.emit_to_room("nobody", &event).await, 0);
    }

    #[tokio::test]
    async fn full_session_queue_drops_instead_of_growing() {
        let registry = SessionRegistry::new();
        let (slow_tx, mut slow_rx) = mpsc::channel(2);
        let (fast_tx, mut fast_rx) = mpsc::channel(SESSION_QUEUE_CAPACITY);
        let _ = registry.connect(handshake("slow", "r1"), slow_tx).await;
        let _ = registry.connect(handshake("fast", "r1"), fast_tx).await;

        for n in 0..3 {
            let event = OutboundEvent::new(SocketEvent::RoundStart, serde_json::json!({"n": n}));
            let delivered = registry.emit_to_room("r1", &event).await;
            assert_eq!(delivered, if n < 2 { 2 } else { 1 });
        }

        for n in 0..2 {
            let Some(event) = slow_rx.recv().await else {
                panic!("slow session should keep its buffered events");
            };
            assert_eq!(event.data["n"], n);
        }
        assert!(slow_rx.try_recv().is_err());
        for n in 0..3 {
            let Some(event) = fast_rx.recv().await else {
                panic!("fast session should receive every event");
            };
            assert_eq!(event.data["n"], n);
        }
    }
}
