//! Axum WebSocket upgrade handler.

use std::collections::HashMap;

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};

use super::connection::run_connection;
use crate::app_state::AppState;
use crate::domain::Handshake;
use crate::error::GatewayError;

/// `GET /ws?userId=..&rouletteId=..&operator=..`: upgrades to a WebSocket.
///
/// # Errors
///
/// Returns [`GatewayError::InvalidHandshake`] (400) if a required query
/// parameter is missing; the upgrade is refused.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<HashMap<String, String>>,
    State(state): State<AppState>,
) -> Result<Response, GatewayError> {
    let handshake = Handshake::from_query(&query)?;
    Ok(ws
        .on_upgrade(move |socket| run_connection(socket, handshake, state))
        .into_response())
}
