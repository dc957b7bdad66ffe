//! RPC failure taxonomy.

use crate::transport::TransportError;

/// Failure of a request/reply exchange over the bus.
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    /// No reply arrived within the attempt's deadline.
    #[error("timeout waiting for response on {pattern} after {timeout_ms} ms")]
    Timeout {
        /// Request pattern (without shard suffix).
        pattern: String,
        /// Deadline of the attempt.
        timeout_ms: u64,
    },

    /// The request envelope could not be published.
    #[error("failed to publish message: {0}")]
    PublishFailure(String),

    /// The reply body was malformed or did not decode into the expected type.
    #[error("malformed reply: {0}")]
    ParseFailure(String),

    /// Cache, subscribe or unsubscribe failure.
    #[error("transport: {0}")]
    Transport(#[from] TransportError),

    /// The reply listener stopped before the attempt settled.
    #[error("reply listener closed")]
    ListenerClosed,
}

impl RpcError {
    /// Only timeouts and publish failures are worth another attempt.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::PublishFailure(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_classification() {
        assert!(
            RpcError::Timeout {
                pattern: "p".to_string(),
                timeout_ms: 1
            }
            .is_retryable()
        );
        assert!(RpcError::PublishFailure("down".to_string()).is_retryable());
        assert!(!RpcError::ParseFailure("bad".to_string()).is_retryable());
        assert!(!RpcError::ListenerClosed.is_retryable());
        assert!(!RpcError::Transport(TransportError::Backend("x".to_string())).is_retryable());
    }
}
