//! WebSocket connection state machine.
//!
//! Handles the read/write loop for a single client session: registers it
//! with the [`SessionRegistry`](crate::domain::SessionRegistry), forwards
//! events emitted to its rooms, dispatches inbound frames, and unregisters
//! it when the socket closes.

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use super::messages::{ClientFrame, ServerFrame};
use crate::app_state::AppState;
use crate::domain::{ClientSession, Handshake, SESSION_QUEUE_CAPACITY, SocketEvent};

/// Runs the read/write loop for a single WebSocket connection.
///
/// - Reads frames from the client and dispatches them.
/// - Writes events emitted to any of the session's rooms.
pub async fn run_connection(socket: WebSocket, handshake: Handshake, state: AppState) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let (out_tx, mut out_rx) = mpsc::channel(SESSION_QUEUE_CAPACITY);
    let session = state.sessions.connect(handshake, out_tx).await;

    loop {
        tokio::select! {
            // Incoming frame from client
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        if let Some(reply) = handle_text_message(&text, &session, &state)
                            && ws_tx.send(Message::text(reply)).await.is_err() {
                                break;
                            }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        tracing::debug!(session_id = %session.session_id, error = %e, "ws read failed");
                        break;
                    }
                    _ => {}
                }
            }
            // Event emitted to one of the session's rooms
            event = out_rx.recv() => {
                let Some(event) = event else { break };
                let Some(json) = ServerFrame::from_event(&event).encode() else {
                    continue;
                };
                if ws_tx.send(Message::text(json)).await.is_err() {
                    break;
                }
            }
        }
    }

    state.sessions.disconnect(session.session_id).await;
    tracing::debug!(session_id = %session.session_id, "ws connection closed");
}

/// Handles a text frame from the client, returning an optional JSON reply.
///
/// Bets are handed to the bet service on their own task so that a slow
/// round lookup never stalls outbound events; their outcome reaches the
/// client as a room event.
fn handle_text_message(text: &str, session: &ClientSession, state: &AppState) -> Option<String> {
    let Ok(frame) = serde_json::from_str::<ClientFrame>(text) else {
        return ServerFrame::error(400, "malformed JSON").encode();
    };

    match frame.event.parse::<SocketEvent>() {
        Ok(SocketEvent::Bet) => {
            let bets = state.bet_service.clone();
            let session = session.clone();
            tokio::spawn(async move {
                let _ = bets.submit(&session, frame.data).await;
            });
            None
        }
        _ => {
            tracing::debug!(session_id = %session.session_id, event = %frame.event, "unsupported client event");
            ServerFrame::error(404, "unknown event").encode()
        }
    }
}
