//! Current-round lookup through the shared cache.

use std::sync::Arc;

use serde_json::{Value, json};

use crate::cache;
use crate::domain::Round;
use crate::error::GatewayError;
use crate::rpc::Broker;

/// RPC pattern answered by the round service.
pub const GET_ROUND: &str = "get-round";

/// Default time-to-live of a cached round, in seconds.
pub const ROUND_CACHE_TTL_SECS: u64 = 35;

/// Resolves the current round of a table, cache first.
#[derive(Debug, Clone)]
pub struct RoundResolver {
    broker: Arc<dyn Broker>,
    ttl_secs: u64,
}

impl RoundResolver {
    /// Creates a resolver caching rounds for `ttl_secs`.
    #[must_use]
    pub fn new(broker: Arc<dyn Broker>, ttl_secs: u64) -> Self {
        Self { broker, ttl_secs }
    }

    /// Looks up the round of `roulette_id`.
    ///
    /// On a cache miss the round service is asked for the round matching
    /// `identifier_number`, and a found round is cached under
    /// `round-roulette:{roulette_id}`. An unreadable cache entry counts as a
    /// miss.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Rpc`] if the cache read or the round request
    /// fails.
    pub async fn resolve(
        &self,
        roulette_id: &str,
        identifier_number: &Value,
    ) -> Result<Option<Round>, GatewayError> {
        let key = Round::cache_key(roulette_id);
        cache::resolve(
            || self.read(&key),
            || self.fetch(identifier_number),
            |round| self.write(&key, round),
        )
        .await
    }

    async fn read(&self, key: &str) -> Result<Option<Round>, GatewayError> {
        let Some(raw) = self.broker.get(key).await? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(round) => Ok(Some(round)),
            Err(e) => {
                tracing::warn!(key, error = %e, "ignoring unreadable cached round");
                Ok(None)
            }
        }
    }

    async fn fetch(&self, identifier_number: &Value) -> Result<Option<Round>, GatewayError> {
        let filter = json!({ "filter": { "identifierNumber": identifier_number } });
        Ok(self.broker.send::<Option<Round>>(GET_ROUND, filter).await?)
    }

    async fn write(&self, key: &str, round: Round) -> Result<(), GatewayError> {
        let raw = serde_json::to_string(&round)?;
        self.broker.set(key, &raw, self.ttl_secs).await?;
        Ok(())
    }
}
