//! Request/reply messaging over the pub/sub bus.
//!
//! A request is published on one randomly chosen worker shard,
//! `{pattern}-{shard}`, wrapped in an [`RpcEnvelope`] that names a reply
//! channel unique to the attempt. [`RpcClient`] matches replies to callers,
//! enforces per-attempt deadlines and retries with exponential backoff.

mod broker;
mod client;
mod envelope;
mod error;
mod options;

pub use broker::Broker;
pub use client::RpcClient;
pub use envelope::{REPLY_CHANNEL_PREFIX, RpcEnvelope, RpcReply, reply_channel, shard_channel};
pub use error::RpcError;
pub use options::{RpcSettings, SendOptions};
