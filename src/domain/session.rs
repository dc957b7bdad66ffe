//! Client session and deterministic room derivation.

use std::collections::HashMap;

use serde::Serialize;

use super::SessionId;
use crate::error::GatewayError;

/// Handshake parameters a client must present when connecting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handshake {
    /// Player identifier.
    pub user_id: String,
    /// Table the player sits at.
    pub roulette_id: String,
    /// Operator (brand) the player belongs to.
    pub operator_id: String,
}

impl Handshake {
    /// Builds a handshake from the upgrade request's query string.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidHandshake`] if `userId`, `rouletteId`
    /// or `operator` is missing or blank.
    pub fn from_query(query: &HashMap<String, String>) -> Result<Self, GatewayError> {
        let required = |key: &str| {
            query
                .get(key)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .ok_or_else(|| GatewayError::InvalidHandshake(format!("missing {key}")))
        };
        Ok(Self {
            user_id: required("userId")?,
            roulette_id: required("rouletteId")?,
            operator_id: required("operator")?,
        })
    }
}

/// Rooms a session joins on connect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionRooms {
    /// Everyone at the table: `{rouletteId}`.
    pub table: String,
    /// This player at this table: `{userId}-{rouletteId}`.
    pub user_at_table: String,
    /// This player at any table: `{userId}`.
    pub user: String,
    /// This connection only: `{sessionId}`.
    pub session: String,
}

impl SessionRooms {
    /// Derives the rooms for a session.
    #[must_use]
    pub fn derive(session_id: SessionId, handshake: &Handshake) -> Self {
        Self {
            table: handshake.roulette_id.clone(),
            user_at_table: format!("{}-{}", handshake.user_id, handshake.roulette_id),
            user: handshake.user_id.clone(),
            session: session_id.to_string(),
        }
    }

    /// All rooms, table first.
    #[must_use]
    pub fn all(&self) -> [&str; 4] {
        [&self.table, &self.user_at_table, &self.user, &self.session]
    }
}

/// A connected client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSession {
    /// Connection identifier.
    pub session_id: SessionId,
    /// Player identifier.
    pub user_id: String,
    /// Table identifier.
    pub roulette_id: String,
    /// Operator identifier.
    pub operator_id: String,
    /// Joined rooms.
    pub rooms: SessionRooms,
}

impl ClientSession {
    /// Creates a session with a fresh id and its derived rooms.
    #[must_use]
    pub fn new(handshake: Handshake) -> Self {
        let session_id = SessionId::new();
        let rooms = SessionRooms::derive(session_id, &handshake);
        Self {
            session_id,
            user_id: handshake.user_id,
            roulette_id: handshake.roulette_id,
            operator_id: handshake.operator_id,
            rooms,
        }
    }
}
