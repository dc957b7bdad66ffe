//! The message-broker seam used by the gateway's services.

use std::fmt;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tokio::sync::mpsc;

use super::{RpcError, SendOptions};
use crate::domain::BusMessage;

/// Cache, fire-and-forget pub/sub and request/reply over one bus.
///
/// [`super::RpcClient`] is the production implementation; services only see
/// this trait so tests can substitute scripted brokers.
#[async_trait]
pub trait Broker: Send + Sync + fmt::Debug {
    /// Reads a cached value.
    async fn get(&self, key: &str) -> Result<Option<String>, RpcError>;

    /// Writes a cached value with a time-to-live in seconds.
    async fn set(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), RpcError>;

    /// Publishes a message without waiting for anyone to read it.
    async fn publish(&self, channel: &str, payload: &str) -> Result<(), RpcError>;

    /// Forwards every message arriving on `channel` into `sink`.
    ///
    /// Several sinks may listen on the same channel.
    async fn subscribe(
        &self,
        channel: &str,
        sink: mpsc::UnboundedSender<BusMessage>,
    ) -> Result<(), RpcError>;

    /// Sends `payload` to one worker shard of `pattern` and awaits its reply.
    async fn request(
        &self,
        pattern: &str,
        payload: serde_json::Value,
        options: SendOptions,
    ) -> Result<serde_json::Value, RpcError>;

    /// Options used by [`Broker::request`] callers that have no preference.
    fn default_options(&self) -> SendOptions;
}

impl dyn Broker + '_ {
    /// Typed request: decodes the reply's `data` into `T`.
    ///
    /// A `null` reply decodes into `None` when `T` is an `Option`.
    ///
    /// # Errors
    ///
    /// Propagates [`Broker::request`] failures and returns
    /// [`RpcError::ParseFailure`] if the reply does not decode into `T`.
    pub async fn send<T: DeserializeOwned>(
        &self,
        pattern: &str,
        payload: serde_json::Value,
    ) -> Result<T, RpcError> {
        let options = self.default_options();
        let data = self.request(pattern, payload, options).await?;
        serde_json::from_value(data).map_err(|e| RpcError::ParseFailure(e.to_string()))
    }
}
