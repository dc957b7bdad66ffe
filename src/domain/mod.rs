//! Domain layer: sessions, rooms, rounds, and event names.
//!
//! This module contains the server-side domain model: session identity and
//! room derivation, the session registry that owns room membership, the
//! round snapshot used to gate bets, and the event bus that carries raw
//! pub/sub traffic inside the process.

pub mod bus_message;
pub mod event_bus;
pub mod round;
pub mod session;
pub mod session_id;
pub mod session_registry;
pub mod socket_event;

pub use bus_message::BusMessage;
pub use event_bus::EventBus;
pub use round::Round;
pub use session::{ClientSession, Handshake, SessionRooms};
pub use session_id::SessionId;
pub use session_registry::{SESSION_QUEUE_CAPACITY, SessionRegistry};
pub use socket_event::{OutboundEvent, SocketEvent};
