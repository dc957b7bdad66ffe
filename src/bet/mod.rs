//! Bet model and anti-cheat validation.
//!
//! Pure code: no I/O, no shared state. The gateway validates every inbound
//! wager with [`validate`] before it resolves the round or touches the
//! work queue.

pub mod validator;
pub mod wager;

pub use validator::{BetRejection, compute_total_stake, is_valid, validate};
pub use wager::{GroupedFamily, NumberBet, Wager};
