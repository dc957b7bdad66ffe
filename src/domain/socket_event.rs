//! Event names shared by client frames and bus channels.
//!
//! Lifecycle and result events use the same string both as the bus channel
//! the workers publish on and as the event name clients receive.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Channel carrying occupancy-enriched round lifecycle events for
/// cross-instance observers.
pub const OBSERVER_CHANNEL: &str = "socket_events";

/// Named socket / bus event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SocketEvent {
    /// Client submits a wager.
    #[serde(rename = "bet")]
    Bet,
    /// Bet rejected.
    #[serde(rename = "bet:err")]
    BetError,
    /// Bet settled by a worker.
    #[serde(rename = "bet:success")]
    BetSuccess,
    /// Round opened for bets.
    #[serde(rename = "round:start")]
    RoundStart,
    /// Round result available.
    #[serde(rename = "round:end")]
    RoundEnd,
    /// Betting window closed.
    #[serde(rename = "round:end-bet-time")]
    RoundBetTime,
    /// Round closed.
    #[serde(rename = "round:close")]
    RoundClose,
    /// Jackpot values for the current round.
    #[serde(rename = "jackpot-values")]
    JackpotValues,
    /// Payout notification.
    #[serde(rename = "winner")]
    Winner,
    /// Payout failed.
    #[serde(rename = "winner:err")]
    WinnerError,
}

/// Where a relayed bus event names its target room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Addressing {
    /// `{"channel": room, ...rest}`; clients receive `rest`.
    Channel,
    /// `{"room": room, "data": {...}}`; clients receive `data`.
    Room,
}

impl SocketEvent {
    /// Events the gateway relays from the bus to rooms.
    pub const RELAYED: [Self; 7] = [
        Self::BetError,
        Self::BetSuccess,
        Self::RoundStart,
        Self::RoundEnd,
        Self::JackpotValues,
        Self::Winner,
        Self::WinnerError,
    ];

    /// Wire name of the event (also its bus channel).
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Bet => "bet",
            Self::BetError => "bet:err",
            Self::BetSuccess => "bet:success",
            Self::RoundStart => "round:start",
            Self::RoundEnd => "round:end",
            Self::RoundBetTime => "round:end-bet-time",
            Self::RoundClose => "round:close",
            Self::JackpotValues => "jackpot-values",
            Self::Winner => "winner",
            Self::WinnerError => "winner:err",
        }
    }

    /// Field that names the target room in the bus payload.
    #[must_use]
    pub const fn addressing(&self) -> Addressing {
        match self {
            Self::Winner | Self::WinnerError => Addressing::Room,
            _ => Addressing::Channel,
        }
    }

    /// Round lifecycle events are enriched with table occupancy.
    #[must_use]
    pub const fn carries_occupancy(&self) -> bool {
        matches!(self, Self::RoundStart | Self::RoundEnd)
    }
}

impl fmt::Display for SocketEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown event name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown event: {0}")]
pub struct UnknownEvent(pub String);

impl FromStr for SocketEvent {
    type Err = UnknownEvent;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [
            Self::Bet,
            Self::BetError,
            Self::BetSuccess,
            Self::RoundStart,
            Self::RoundEnd,
            Self::RoundBetTime,
            Self::RoundClose,
            Self::JackpotValues,
            Self::Winner,
            Self::WinnerError,
        ]
        .into_iter()
        .find(|event| event.as_str() == s)
        .ok_or_else(|| UnknownEvent(s.to_string()))
    }
}

/// Event addressed to connected clients.
#[derive(Debug, Clone, Serialize)]
pub struct OutboundEvent {
    /// Event name.
    pub event: SocketEvent,
    /// Event body.
    pub data: serde_json::Value,
    /// Server-side emission time.
    pub timestamp: DateTime<Utc>,
}

impl OutboundEvent {
    /// Creates an event stamped with the current time.
    #[must_use]
    pub fn new(event: SocketEvent, data: serde_json::Value) -> Self {
        Self {
            event,
            data,
            timestamp: Utc::now(),
        }
    }

    /// `bet:err` carrying a client-facing message.
    #[must_use]
    pub fn bet_error(message: &str) -> Self {
        Self::new(
            SocketEvent::BetError,
            serde_json::json!({ "error": message }),
        )
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip_through_from_str() {
        for event in SocketEvent::RELAYED {
            assert_eq!(event.as_str().parse::<SocketEvent>(), Ok(event));
        }
        assert!("round:unknown".parse::<SocketEvent>().is_err());
    }

    #[test]
    fn serde_uses_wire_names() {
        let json = serde_json::to_string(&SocketEvent::RoundBetTime).unwrap_or_default();
        assert_eq!(json, r#""round:end-bet-time""#);
    }

    #[test]
    fn winner_events_are_room_addressed() {
        assert_eq!(SocketEvent::Winner.addressing(), Addressing::Room);
        assert_eq!(SocketEvent::WinnerError.addressing(), Addressing::Room);
        assert_eq!(SocketEvent::BetSuccess.addressing(), Addressing::Channel);
    }

    #[test]
    fn only_round_lifecycle_carries_occupancy() {
        let enriched: Vec<_> = SocketEvent::RELAYED
            .into_iter()
            .filter(SocketEvent::carries_occupancy)
            .collect();
        assert_eq!(enriched, vec![SocketEvent::RoundStart, SocketEvent::RoundEnd]);
    }

    #[test]
    fn bet_error_body() {
        let event = OutboundEvent::bet_error("Round closed");
        assert_eq!(event.event, SocketEvent::BetError);
        assert_eq!(event.data["error"], "Round closed");
    }
}
