//! Bus-to-room relay of worker events.
//!
//! Workers publish lifecycle and result events on the bus; the relay turns
//! each one into a socket event for the room the payload names. Round start
//! and end are also enriched with the table's occupancy and re-published on
//! [`OBSERVER_CHANNEL`] for other instances and dashboards.

use std::sync::Arc;

use serde_json::{Map, Value, json};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::domain::socket_event::{Addressing, OBSERVER_CHANNEL};
use crate::domain::{BusMessage, OutboundEvent, SessionRegistry, SocketEvent};
use crate::error::GatewayError;
use crate::rpc::Broker;

/// Relays bus events into session rooms.
#[derive(Debug, Clone)]
pub struct EventRelay {
    broker: Arc<dyn Broker>,
    sessions: Arc<SessionRegistry>,
}

impl EventRelay {
    /// Creates a new `EventRelay`.
    #[must_use]
    pub fn new(broker: Arc<dyn Broker>, sessions: Arc<SessionRegistry>) -> Self {
        Self { broker, sessions }
    }

    /// Subscribes to every relayed channel and spawns the relay loop.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Rpc`] if a subscription fails.
    pub async fn start(self) -> Result<JoinHandle<()>, GatewayError> {
        let (sink, inbox) = mpsc::unbounded_channel();
        for event in SocketEvent::RELAYED {
            self.broker.subscribe(event.as_str(), sink.clone()).await?;
        }
        tracing::info!(channels = SocketEvent::RELAYED.len(), "event relay started");
        Ok(tokio::spawn(self.run(inbox)))
    }

    async fn run(self, mut inbox: mpsc::UnboundedReceiver<BusMessage>) {
        while let Some(message) = inbox.recv().await {
            if let Err(e) = self.relay(&message).await {
                tracing::warn!(channel = %message.channel, error = %e, "dropping bus event");
            }
        }
        tracing::info!("event relay stopped");
    }

    /// Relays one bus message, returning how many sessions received it.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Serialization`] for a non-JSON payload and
    /// [`GatewayError::Internal`] for an unknown channel or a payload that
    /// names no room.
    pub async fn relay(&self, message: &BusMessage) -> Result<usize, GatewayError> {
        let event: SocketEvent = message
            .channel
            .parse()
            .map_err(|e| GatewayError::Internal(format!("{e}")))?;
        let payload: Value = serde_json::from_str(&message.payload)?;

        let (room, body) = match event.addressing() {
            Addressing::Channel => {
                let Value::Object(mut fields) = payload else {
                    return Err(missing_room(event));
                };
                let room = fields
                    .remove("channel")
                    .as_ref()
                    .and_then(room_name)
                    .ok_or_else(|| missing_room(event))?;
                if event.carries_occupancy() {
                    let users_online = self.sessions.room_size(&room).await;
                    fields.insert("usersOnline".to_string(), json!(users_online));
                    self.notify_observers(event, &room, &fields).await;
                }
                (room, Value::Object(fields))
            }
            Addressing::Room => {
                let room = payload
                    .get("room")
                    .and_then(room_name)
                    .ok_or_else(|| missing_room(event))?;
                let body = payload
                    .get("data")
                    .cloned()
                    .unwrap_or_else(|| Value::Object(Map::new()));
                (room, body)
            }
        };

        let delivered = self
            .sessions
            .emit_to_room(&room, &OutboundEvent::new(event, body))
            .await;
        tracing::debug!(%event, %room, delivered, "bus event relayed");
        Ok(delivered)
    }

    async fn notify_observers(&self, event: SocketEvent, room: &str, fields: &Map<String, Value>) {
        let mut data = fields.clone();
        data.insert("channel".to_string(), json!(room));
        let notice = json!({ "event": event, "data": data, "room": room });
        if let Err(e) = self
            .broker
            .publish(OBSERVER_CHANNEL, &notice.to_string())
            .await
        {
            tracing::warn!(%event, room, error = %e, "failed to publish observer event");
        }
    }
}

fn room_name(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn missing_room(event: SocketEvent) -> GatewayError {
    GatewayError::Internal(format!("{event} payload names no room"))
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::{Handshake, SESSION_QUEUE_CAPACITY};
    use crate::service::testing::FakeBroker;

    struct Harness {
        broker: Arc<FakeBroker>,
        sessions: Arc<SessionRegistry>,
        relay: EventRelay,
    }

    fn harness() -> Harness {
        let broker = Arc::new(FakeBroker::default());
        let sessions = Arc::new(SessionRegistry::new());
        let relay = EventRelay::new(
            Arc::clone(&broker) as Arc<dyn Broker>,
            Arc::clone(&sessions),
        );
        Harness {
            broker,
            sessions,
            relay,
        }
    }

    async fn join(
        sessions: &SessionRegistry,
        user: &str,
        table: &str,
    ) -> mpsc::Receiver<OutboundEvent> {
        let (tx, rx) = mpsc::channel(SESSION_QUEUE_CAPACITY);
        let _ = sessions
            .connect(
                Handshake {
                    user_id: user.to_string(),
                    roulette_id: table.to_string(),
                    operator_id: "op".to_string(),
                },
                tx,
            )
            .await;
        rx
    }

    #[tokio::test]
    async fn start_subscribes_to_every_relayed_channel() {
        let h = harness();
        let Ok(handle) = h.relay.clone().start().await else {
            panic!("relay should start");
        };
        let subscribed = h.broker.subscribed();
        for event in SocketEvent::RELAYED {
            assert!(subscribed.iter().any(|c| c == event.as_str()), "{event}");
        }
        handle.abort();
    }

    #[tokio::test]
    async fn round_start_is_enriched_and_observed() {
        let h = harness();
        let mut alice = join(&h.sessions, "alice", "r1").await;
        let _bob = join(&h.sessions, "bob", "r1").await;
        let _carol = join(&h.sessions, "carol", "r2").await;

        let message = BusMessage::new(
            "round:start",
            r#"{"channel":"r1","msg":"Round started","round":{"id":"x"}}"#,
        );
        let delivered = h.relay.relay(&message).await;
        assert_eq!(delivered.ok(), Some(2));

        let Some(event) = alice.recv().await else {
            panic!("alice should receive round:start");
        };
        assert_eq!(event.event, SocketEvent::RoundStart);
        assert_eq!(event.data["usersOnline"], 2);
        assert_eq!(event.data["round"]["id"], "x");
        assert!(event.data.get("channel").is_none());

        let observed = h.broker.published();
        let Some(notice) = observed.first() else {
            panic!("observer event expected");
        };
        assert_eq!(notice.channel, OBSERVER_CHANNEL);
        let Ok(notice) = serde_json::from_str::<Value>(&notice.payload) else {
            panic!("observer event should be JSON");
        };
        assert_eq!(notice["event"], "round:start");
        assert_eq!(notice["room"], "r1");
        assert_eq!(notice["data"]["usersOnline"], 2);
        assert_eq!(notice["data"]["channel"], "r1");
    }

    #[tokio::test]
    async fn bet_success_strips_the_channel() {
        let h = harness();
        let mut alice = join(&h.sessions, "alice", "r1").await;

        let message = BusMessage::new(
            "bet:success",
            r#"{"channel":"alice-r1","msg":"Bet placed","totalAmount":10}"#,
        );
        assert_eq!(h.relay.relay(&message).await.ok(), Some(1));

        let Some(event) = alice.recv().await else {
            panic!("alice should receive bet:success");
        };
        assert_eq!(event.event, SocketEvent::BetSuccess);
        assert_eq!(event.data, json!({"msg": "Bet placed", "totalAmount": 10}));
        assert!(h.broker.published().is_empty());
    }

    #[tokio::test]
    async fn winner_is_room_addressed() {
        let h = harness();
        let mut alice = join(&h.sessions, "alice", "r1").await;

        let message = BusMessage::new(
            "winner",
            r#"{"room":"alice","data":{"amount":360,"number":17}}"#,
        );
        assert_eq!(h.relay.relay(&message).await.ok(), Some(1));

        let Some(event) = alice.recv().await else {
            panic!("alice should receive winner");
        };
        assert_eq!(event.event, SocketEvent::Winner);
        assert_eq!(event.data, json!({"amount": 360, "number": 17}));
    }

    #[tokio::test]
    async fn payload_without_room_is_an_error() {
        let h = harness();
        let message = BusMessage::new("bet:err", r#"{"msg":"nope"}"#);
        assert!(matches!(
            h.relay.relay(&message).await,
            Err(GatewayError::Internal(_))
        ));
    }

    #[tokio::test]
    async fn non_json_payload_is_an_error() {
        let h = harness();
        let message = BusMessage::new("round:end", "not json");
        assert!(matches!(
            h.relay.relay(&message).await,
            Err(GatewayError::Serialization(_))
        ));
    }

    #[tokio::test]
    async fn empty_room_delivers_nothing() {
        let h = harness();
        let message = BusMessage::new("jackpot-values", r#"{"channel":"r9","jackpot_values":[]}"#);
        assert_eq!(h.relay.relay(&message).await.ok(), Some(0));
    }
}
