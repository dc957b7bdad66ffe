//! Per-call and per-client RPC settings.

use std::time::Duration;

/// Deadline and retry budget of one logical `send`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendOptions {
    /// Deadline of each attempt.
    pub timeout: Duration,
    /// Attempts made after the first one, for retryable failures only.
    pub max_retries: u32,
    /// Delay before the first retry; doubles on every further retry.
    pub initial_backoff: Duration,
}

impl SendOptions {
    /// Delay before retry number `attempt + 1`: `initial_backoff * 2^attempt`.
    #[must_use]
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.initial_backoff
            .saturating_mul(2_u32.saturating_pow(attempt))
    }

    /// Same options with a different attempt deadline.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Same options with a different retry budget.
    #[must_use]
    pub const fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Attempt deadline in whole milliseconds.
    #[must_use]
    pub fn timeout_ms(&self) -> u64 {
        u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX)
    }
}

impl Default for SendOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(2000),
            max_retries: 3,
            initial_backoff: Duration::from_millis(500),
        }
    }
}

/// Client-wide settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RpcSettings {
    /// Number of worker shards listening on `{pattern}-{1..=shard_count}`.
    pub shard_count: u32,
    /// Options used when a caller does not pass its own.
    pub defaults: SendOptions,
}

impl Default for RpcSettings {
    fn default() -> Self {
        Self {
            shard_count: 1,
            defaults: SendOptions::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles() {
        let options = SendOptions::default();
        assert_eq!(options.backoff(0), Duration::from_millis(500));
        assert_eq!(options.backoff(1), Duration::from_millis(1000));
        assert_eq!(options.backoff(2), Duration::from_millis(2000));
    }

    #[test]
    fn backoff_saturates() {
        let options = SendOptions::default();
        assert_eq!(options.backoff(64), Duration::MAX);
    }

    #[test]
    fn defaults_match_protocol() {
        let options = SendOptions::default();
        assert_eq!(options.timeout_ms(), 2000);
        assert_eq!(options.max_retries, 3);
        assert_eq!(RpcSettings::default().shard_count, 1);
    }
}
