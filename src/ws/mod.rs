//! WebSocket layer: upgrade handling, connection loop, frame types.
//!
//! The endpoint at `/ws` carries bet submissions from clients and room
//! events (round lifecycle, bet results, payouts) back to them.

pub mod connection;
pub mod handler;
pub mod messages;
