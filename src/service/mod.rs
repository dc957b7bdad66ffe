//! Service layer: bet intake and bus event relay.
//!
//! [`BetService`] validates and gates bets against the current round, then
//! enqueues them. [`EventRelay`] fans worker events out to session rooms.
//! Both talk to the bus through [`crate::rpc::Broker`].

pub mod bet_service;
pub mod event_relay;
pub mod round_resolver;

#[cfg(test)]
pub(crate) mod testing;

pub use bet_service::BetService;
pub use event_relay::EventRelay;
pub use round_resolver::RoundResolver;
