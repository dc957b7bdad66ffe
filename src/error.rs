//! Gateway error types with HTTP status code mapping.
//!
//! [`GatewayError`] is the central error type for the gateway. Each variant
//! maps to a numeric code, an HTTP status (for the few HTTP endpoints) and a
//! client-facing message (for `bet:err` frames on the WebSocket).

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::bet::BetRejection;
use crate::rpc::RpcError;

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 1002,
///     "message": "invalid handshake: missing userId",
///     "details": null
///   }
/// }
/// ```
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Numeric error code (see code ranges below).
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Server-side error enum.
///
/// # Error Code Ranges
///
/// | Range     | Category        | HTTP Status                  |
/// |-----------|-----------------|------------------------------|
/// | 1000–1999 | Validation      | 400 Bad Request              |
/// | 2000–2999 | Round state     | 404 Not Found / 409 Conflict |
/// | 3000–3999 | Server          | 500 Internal Server Error    |
/// | 5000–5999 | Upstream (RPC)  | 502 / 504                    |
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// The wager failed structural or anti-cheat validation.
    #[error("invalid bet: {0}")]
    InvalidBet(#[from] BetRejection),

    /// WebSocket handshake is missing a required parameter.
    #[error("invalid handshake: {0}")]
    InvalidHandshake(String),

    /// No round exists for the requested table.
    #[error("round not found")]
    RoundNotFound,

    /// The round exists but is no longer accepting bets.
    #[error("round closed")]
    RoundClosed,

    /// Request/reply over the bus failed.
    #[error("rpc error: {0}")]
    Rpc(#[from] RpcError),

    /// The work queue rejected the job.
    #[error("queue error: {0}")]
    Queue(String),

    /// A payload could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidBet(_) => 1001,
            Self::InvalidHandshake(_) => 1002,
            Self::RoundNotFound => 2001,
            Self::RoundClosed => 2002,
            Self::Internal(_) => 3000,
            Self::Queue(_) => 3001,
            Self::Serialization(_) => 3002,
            Self::Rpc(RpcError::Timeout { .. }) => 5001,
            Self::Rpc(_) => 5000,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidBet(_) | Self::InvalidHandshake(_) => StatusCode::BAD_REQUEST,
            Self::RoundNotFound => StatusCode::NOT_FOUND,
            Self::RoundClosed => StatusCode::CONFLICT,
            Self::Rpc(RpcError::Timeout { .. }) => StatusCode::GATEWAY_TIMEOUT,
            Self::Rpc(_) => StatusCode::BAD_GATEWAY,
            Self::Queue(_) | Self::Serialization(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message sent to the submitting client in a `bet:err` frame.
    ///
    /// Only validation and round-state failures are described; everything
    /// else collapses into a generic message.
    #[must_use]
    pub fn client_message(&self) -> String {
        match self {
            Self::InvalidBet(rejection) => format!("Invalid bet: {rejection}"),
            Self::RoundNotFound => "Round not found".to_string(),
            Self::RoundClosed => "Round closed".to_string(),
            _ => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
                details: None,
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}
