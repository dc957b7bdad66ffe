//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::domain::SessionRegistry;
use crate::service::BetService;
use crate::transport::Transport;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Bet intake for WebSocket `bet` frames.
    pub bet_service: BetService,
    /// Connected sessions and their rooms.
    pub sessions: Arc<SessionRegistry>,
    /// Bus connection, probed by the health check.
    pub bus: Arc<dyn Transport>,
}
