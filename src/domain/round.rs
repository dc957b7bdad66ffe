//! Round snapshot as returned by the round service and cached per table.

use serde::{Deserialize, Serialize};

/// Prefix of the cache key holding the current round of a table.
pub const ROUND_CACHE_PREFIX: &str = "round-roulette:";

/// Current round of a roulette table.
///
/// Only `open` is interpreted by the gateway; every other field is carried
/// through untouched so the settlement worker receives the full round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Round {
    /// Whether the round still accepts bets.
    #[serde(default)]
    pub open: bool,
    /// Remaining round fields.
    #[serde(flatten)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

impl Round {
    /// Cache key of the current round for `roulette_id`.
    #[must_use]
    pub fn cache_key(roulette_id: &str) -> String {
        format!("{ROUND_CACHE_PREFIX}{roulette_id}")
    }
}
