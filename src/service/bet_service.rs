//! Bet intake: validation, round gating and enqueueing.
//!
//! Every inbound `bet` goes through [`BetService::submit`]:
//!
//! 1. the pre-check extracts and validates the wager;
//! 2. the table's current round is resolved through the cache;
//! 3. a missing or closed round stops the bet;
//! 4. otherwise the original message, plus the round, is enqueued for
//!    settlement.
//!
//! Any failure is logged and reported to the submitting player's
//! user-at-table room as a `bet:err` event. Nothing propagates to the socket.

use std::sync::Arc;

use serde_json::{Map, Value};

use super::RoundResolver;
use crate::bet::{self, BetRejection, Wager};
use crate::domain::{ClientSession, OutboundEvent, SessionRegistry};
use crate::error::GatewayError;
use crate::queue::{JobId, WorkQueue};

/// Job name the settlement workers consume.
pub const BET_JOB_NAME: &str = "bet";

/// Handles bets submitted over the WebSocket.
#[derive(Debug, Clone)]
pub struct BetService {
    rounds: RoundResolver,
    queue: Arc<dyn WorkQueue>,
    sessions: Arc<SessionRegistry>,
}

impl BetService {
    /// Creates a new `BetService`.
    #[must_use]
    pub fn new(
        rounds: RoundResolver,
        queue: Arc<dyn WorkQueue>,
        sessions: Arc<SessionRegistry>,
    ) -> Self {
        Self {
            rounds,
            queue,
            sessions,
        }
    }

    /// Runs the full bet pipeline for one inbound message.
    ///
    /// On failure a `bet:err` carrying [`GatewayError::client_message`] has
    /// already been emitted when this returns.
    ///
    /// # Errors
    ///
    /// Returns the [`GatewayError`] that stopped the bet.
    pub async fn submit(&self, session: &ClientSession, data: Value) -> Result<JobId, GatewayError> {
        match self.place(session, data).await {
            Ok(job_id) => {
                tracing::info!(session_id = %session.session_id, %job_id, "bet enqueued");
                Ok(job_id)
            }
            Err(e) => {
                match &e {
                    GatewayError::InvalidBet(_)
                    | GatewayError::RoundNotFound
                    | GatewayError::RoundClosed => {
                        tracing::info!(session_id = %session.session_id, error = %e, "bet rejected");
                    }
                    _ => {
                        tracing::error!(session_id = %session.session_id, error = %e, "bet failed");
                    }
                }
                let event = OutboundEvent::bet_error(&e.client_message());
                self.sessions
                    .emit_to_room(&session.rooms.user_at_table, &event)
                    .await;
                Err(e)
            }
        }
    }

    async fn place(&self, session: &ClientSession, data: Value) -> Result<JobId, GatewayError> {
        let (mut message, wager) = precheck(data)?;
        tracing::debug!(
            session_id = %session.session_id,
            total_stake = bet::compute_total_stake(&wager),
            "bet passed validation"
        );

        let roulette_id = message
            .get("roulette")
            .and_then(id_string)
            .unwrap_or_else(|| session.roulette_id.clone());
        let identifier_number = message
            .get("identifierNumber")
            .cloned()
            .unwrap_or(Value::Null);

        let round = self
            .rounds
            .resolve(&roulette_id, &identifier_number)
            .await?
            .ok_or(GatewayError::RoundNotFound)?;
        if !round.open {
            return Err(GatewayError::RoundClosed);
        }

        message.insert("round".to_string(), serde_json::to_value(&round)?);
        self.queue
            .enqueue(BET_JOB_NAME, Value::Object(message))
            .await
            .map_err(|e| GatewayError::Queue(e.to_string()))
    }
}

/// Checks that the message carries a valid wager before any I/O happens.
///
/// Returns the message body and its decoded wager.
///
/// # Errors
///
/// Returns [`GatewayError::InvalidBet`] if the `bet` field is missing, does
/// not decode, or fails [`bet::validate`].
pub fn precheck(data: Value) -> Result<(Map<String, Value>, Wager), GatewayError> {
    let Value::Object(message) = data else {
        return Err(BetRejection::Missing.into());
    };
    let raw = match message.get("bet") {
        None | Some(Value::Null) => return Err(BetRejection::Missing.into()),
        Some(raw) => raw.clone(),
    };
    let wager: Wager =
        serde_json::from_value(raw).map_err(|e| BetRejection::Malformed(e.to_string()))?;
    bet::validate(&wager)?;
    Ok((message, wager))
}

fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
