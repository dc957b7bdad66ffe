//! Pub/sub transport and key/value cache abstraction.
//!
//! [`Transport`] is the black box the RPC client is built on: plain cache
//! reads and writes, publish, and channel subscriptions whose traffic comes
//! back through a single [`messages`](Transport::messages) feed.
//!
//! Two implementations ship with the crate:
//! - [`RedisTransport`] for production (`redis` crate, one multiplexed
//!   connection plus one pub/sub connection);
//! - [`MemoryTransport`], an in-process bus used for local runs and as the
//!   deterministic fake bus in tests.

pub mod memory;
pub mod redis;

use std::fmt;

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::domain::BusMessage;

pub use self::memory::MemoryTransport;
pub use self::redis::RedisTransport;

/// Failure reported by a transport backend.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Error from the Redis client.
    #[error("redis: {0}")]
    Redis(#[from] ::redis::RedisError),

    /// The backend refused or could not complete the operation.
    #[error("{0}")]
    Backend(String),
}

/// Pub/sub bus plus key/value cache.
#[async_trait]
pub trait Transport: Send + Sync + fmt::Debug {
    /// Reads a cache entry.
    async fn get(&self, key: &str) -> Result<Option<String>, TransportError>;

    /// Writes a cache entry that expires after `ttl_secs`.
    async fn set(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), TransportError>;

    /// Publishes a payload on a channel.
    async fn publish(&self, channel: &str, payload: &str) -> Result<(), TransportError>;

    /// Starts delivering messages of `channel` to the [`messages`](Self::messages) feed.
    async fn subscribe(&self, channel: &str) -> Result<(), TransportError>;

    /// Stops delivering messages of `channel`.
    async fn unsubscribe(&self, channel: &str) -> Result<(), TransportError>;

    /// Feed of every message received on a subscribed channel.
    fn messages(&self) -> broadcast::Receiver<BusMessage>;

    /// `false` while the subscriber connection is down and subscribed
    /// traffic is not reaching the feed.
    fn is_connected(&self) -> bool {
        true
    }
}
