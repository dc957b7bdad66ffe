//! Wire format of RPC requests and replies.

use serde::{Deserialize, Serialize};

/// Prefix of every reply channel; the correlation id follows it.
pub const REPLY_CHANNEL_PREFIX: &str = "rpc:reply:";

/// Request published on a worker shard channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcEnvelope {
    /// Unique token matching the reply to this attempt.
    pub correlation_id: String,
    /// Channel the worker must answer on.
    pub reply_channel: String,
    /// Request body.
    pub data: serde_json::Value,
}

impl RpcEnvelope {
    /// Creates an envelope with a fresh correlation id.
    #[must_use]
    pub fn new(data: serde_json::Value) -> Self {
        let correlation_id = uuid::Uuid::new_v4().to_string();
        let reply_channel = reply_channel(&correlation_id);
        Self {
            correlation_id,
            reply_channel,
            data,
        }
    }
}

/// Reply published by a worker on the envelope's reply channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcReply {
    /// Correlation id copied from the request.
    pub correlation_id: String,
    /// Response body; `null` when the worker found nothing.
    #[serde(default)]
    pub data: serde_json::Value,
}

/// Reply channel derived from a correlation id.
#[must_use]
pub fn reply_channel(correlation_id: &str) -> String {
    format!("{REPLY_CHANNEL_PREFIX}{correlation_id}")
}

/// Worker shard channel: `{pattern}-{shard}`.
#[must_use]
pub fn shard_channel(pattern: &str, shard: u32) -> String {
    format!("{pattern}-{shard}")
}
