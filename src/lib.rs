//! # roulette-gateway
//!
//! Realtime gateway of a multiplayer roulette backend.
//!
//! Players connect over WebSocket, submit bets and receive round lifecycle
//! and payout events for the rooms they belong to. The gateway owns no game
//! state: rounds come from a round service reached through an RPC protocol
//! layered on pub/sub, accepted bets go to a work queue for settlement, and
//! worker events arrive on the bus to be relayed into rooms.
//!
//! ## Architecture
//!
//! ```text
//! Clients (WebSocket)            Workers (pub/sub, queue)
//!     │                               ▲        │
//!     ├── WS Handler (ws/)            │        │
//!     │                               │        │
//!     ├── BetService ─── WorkQueue (queue/)    │
//!     │      │                                 │
//!     │      └── RoundResolver ── cache/       │
//!     │                │                       │
//!     ├── EventRelay ──┴── Broker / RpcClient (rpc/)
//!     │                          │
//!     ├── SessionRegistry        └── Transport (transport/): Redis | memory
//!     │   (domain/)
//!     └── Bet validator (bet/)
//! ```

pub mod api;
pub mod app_state;
pub mod bet;
pub mod cache;
pub mod config;
pub mod domain;
pub mod error;
pub mod queue;
pub mod rpc;
pub mod service;
pub mod transport;
pub mod ws;
