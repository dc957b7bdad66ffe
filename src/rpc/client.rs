//! Request/reply client over a pub/sub transport.
//!
//! Every attempt of a `send` gets its own correlation id and reply channel.
//! The attempt registers a oneshot in the pending table before publishing,
//! and a single receive loop settles it when the reply shows up. Whoever
//! removes the entry from the table first decides the outcome: the receive
//! loop (reply) or the attempt's deadline (timeout).

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use rand::Rng;
use serde_json::Value;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;

use super::envelope::{REPLY_CHANNEL_PREFIX, RpcEnvelope, RpcReply, shard_channel};
use super::{Broker, RpcError, RpcSettings, SendOptions};
use crate::domain::BusMessage;
use crate::transport::Transport;

type ReplySender = oneshot::Sender<Result<Value, RpcError>>;

#[derive(Debug)]
struct PendingRequest {
    pattern: String,
    reply: ReplySender,
}

/// In-flight attempts keyed by correlation id.
#[derive(Debug, Default)]
struct PendingTable {
    entries: Mutex<HashMap<String, PendingRequest>>,
}

impl PendingTable {
    fn entries(&self) -> MutexGuard<'_, HashMap<String, PendingRequest>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn register(
        &self,
        correlation_id: &str,
        pattern: &str,
    ) -> oneshot::Receiver<Result<Value, RpcError>> {
        let (reply, rx) = oneshot::channel();
        self.entries().insert(
            correlation_id.to_string(),
            PendingRequest {
                pattern: pattern.to_string(),
                reply,
            },
        );
        rx
    }

    /// Removes the entry and hands it `result`; `false` if nothing was pending.
    fn settle(&self, correlation_id: &str, result: Result<Value, RpcError>) -> bool {
        let mut entries = self.entries();
        let Some(pending) = entries.remove(correlation_id) else {
            return false;
        };
        tracing::debug!(correlation_id, pattern = %pending.pattern, "rpc reply matched");
        let _ = pending.reply.send(result);
        true
    }

    fn remove(&self, correlation_id: &str) -> bool {
        self.entries().remove(correlation_id).is_some()
    }

    fn len(&self) -> usize {
        self.entries().len()
    }
}

/// Removes a pending entry when its attempt ends, however it ends.
struct PendingGuard<'a> {
    table: &'a PendingTable,
    correlation_id: &'a str,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.table.remove(self.correlation_id);
    }
}

/// Local sinks of non-reply channels.
#[derive(Debug, Default)]
struct ListenerTable {
    sinks: Mutex<HashMap<String, Vec<mpsc::UnboundedSender<BusMessage>>>>,
}

impl ListenerTable {
    fn sinks(&self) -> MutexGuard<'_, HashMap<String, Vec<mpsc::UnboundedSender<BusMessage>>>> {
        self.sinks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// `true` once a sink was added for `channel`.
    fn is_listening(&self, channel: &str) -> bool {
        self.sinks().contains_key(channel)
    }

    fn add(&self, channel: &str, sink: mpsc::UnboundedSender<BusMessage>) {
        self.sinks().entry(channel.to_string()).or_default().push(sink);
    }

    /// Delivers to every live sink of the message's channel, pruning closed ones.
    fn fan_out(&self, message: &BusMessage) -> usize {
        let mut sinks = self.sinks();
        let Some(listeners) = sinks.get_mut(&message.channel) else {
            return 0;
        };
        listeners.retain(|sink| sink.send(message.clone()).is_ok());
        listeners.len()
    }
}

enum AttemptOutcome {
    Replied(Value),
    Retryable(RpcError),
    Fatal(RpcError),
}

impl From<Result<Value, RpcError>> for AttemptOutcome {
    fn from(result: Result<Value, RpcError>) -> Self {
        match result {
            Ok(value) => Self::Replied(value),
            Err(e) if e.is_retryable() => Self::Retryable(e),
            Err(e) => Self::Fatal(e),
        }
    }
}

/// Correlating request/reply client.
#[derive(Debug)]
pub struct RpcClient {
    transport: Arc<dyn Transport>,
    pending: Arc<PendingTable>,
    listeners: Arc<ListenerTable>,
    subscribing: tokio::sync::Mutex<()>,
    settings: RpcSettings,
    receiver: JoinHandle<()>,
}

impl RpcClient {
    /// Starts the receive loop over `transport`'s feed.
    ///
    /// Must be called from within a Tokio runtime.
    #[must_use]
    pub fn start(transport: Arc<dyn Transport>, settings: RpcSettings) -> Self {
        let settings = RpcSettings {
            shard_count: settings.shard_count.max(1),
            ..settings
        };
        let pending = Arc::new(PendingTable::default());
        let listeners = Arc::new(ListenerTable::default());

        let feed = transport.messages();
        let receiver = tokio::spawn(receive_loop(
            feed,
            Arc::clone(&pending),
            Arc::clone(&listeners),
        ));

        tracing::info!(shard_count = settings.shard_count, "rpc client started");
        Self {
            transport,
            pending,
            listeners,
            subscribing: tokio::sync::Mutex::new(()),
            settings,
            receiver,
        }
    }

    /// Number of attempts currently awaiting a reply.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Sends `payload` to a random shard of `pattern`, retrying timeouts and
    /// publish failures with exponential backoff.
    ///
    /// # Errors
    ///
    /// Returns the last attempt's error once retries are exhausted, or the
    /// first non-retryable error.
    pub async fn send_with(
        &self,
        pattern: &str,
        payload: Value,
        options: SendOptions,
    ) -> Result<Value, RpcError> {
        let mut retries: u32 = 0;
        loop {
            match self.attempt(pattern, &payload, options).await {
                AttemptOutcome::Replied(value) => return Ok(value),
                AttemptOutcome::Retryable(e) if retries < options.max_retries => {
                    let delay = options.backoff(retries);
                    retries += 1;
                    tracing::warn!(
                        pattern,
                        retry = retries,
                        max_retries = options.max_retries,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %e,
                        "rpc attempt failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                AttemptOutcome::Retryable(e) | AttemptOutcome::Fatal(e) => {
                    tracing::error!(pattern, error = %e, "rpc request failed");
                    return Err(e);
                }
            }
        }
    }

    async fn attempt(&self, pattern: &str, payload: &Value, options: SendOptions) -> AttemptOutcome {
        let envelope = RpcEnvelope::new(payload.clone());
        let result = self.exchange(pattern, &envelope, options).await;
        if let Err(e) = self.transport.unsubscribe(&envelope.reply_channel).await {
            tracing::warn!(channel = %envelope.reply_channel, error = %e, "failed to unsubscribe reply channel");
        }
        AttemptOutcome::from(result)
    }

    async fn exchange(
        &self,
        pattern: &str,
        envelope: &RpcEnvelope,
        options: SendOptions,
    ) -> Result<Value, RpcError> {
        let correlation_id = envelope.correlation_id.as_str();
        self.transport.subscribe(&envelope.reply_channel).await?;

        let mut reply = self.pending.register(correlation_id, pattern);
        let _guard = PendingGuard {
            table: &self.pending,
            correlation_id,
        };

        let channel = shard_channel(pattern, self.pick_shard());
        let body =
            serde_json::to_string(envelope).map_err(|e| RpcError::PublishFailure(e.to_string()))?;
        self.transport
            .publish(&channel, &body)
            .await
            .map_err(|e| RpcError::PublishFailure(e.to_string()))?;
        tracing::debug!(%channel, correlation_id, "rpc request published");

        match tokio::time::timeout(options.timeout, &mut reply).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(RpcError::ListenerClosed),
            Err(_) if self.pending.remove(correlation_id) => Err(RpcError::Timeout {
                pattern: pattern.to_string(),
                timeout_ms: options.timeout_ms(),
            }),
            // The receive loop settled the entry right at the deadline.
            Err(_) => reply.try_recv().unwrap_or(Err(RpcError::ListenerClosed)),
        }
    }

    fn pick_shard(&self) -> u32 {
        rand::thread_rng().gen_range(1..=self.settings.shard_count)
    }
}

impl Drop for RpcClient {
    fn drop(&mut self) {
        self.receiver.abort();
    }
}

async fn receive_loop(
    mut feed: broadcast::Receiver<BusMessage>,
    pending: Arc<PendingTable>,
    listeners: Arc<ListenerTable>,
) {
    loop {
        match feed.recv().await {
            Ok(message) => dispatch(&message, &pending, &listeners),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "rpc receive loop lagged, messages dropped");
            }
            Err(broadcast::error::RecvError::Closed) => {
                tracing::error!("transport feed closed, rpc receive loop exiting");
                break;
            }
        }
    }
}

fn dispatch(message: &BusMessage, pending: &PendingTable, listeners: &ListenerTable) {
    if let Some(channel_id) = message.channel.strip_prefix(REPLY_CHANNEL_PREFIX) {
        let (correlation_id, result) = match serde_json::from_str::<RpcReply>(&message.payload) {
            Ok(reply) => (reply.correlation_id, Ok(reply.data)),
            Err(e) => (
                channel_id.to_string(),
                Err(RpcError::ParseFailure(e.to_string())),
            ),
        };
        if !pending.settle(&correlation_id, result) {
            tracing::debug!(%correlation_id, "dropping reply with no pending request");
        }
        return;
    }

    if listeners.fan_out(message) == 0 {
        tracing::trace!(channel = %message.channel, "no local listener for message");
    }
}

#[async_trait]
impl Broker for RpcClient {
    async fn get(&self, key: &str) -> Result<Option<String>, RpcError> {
        Ok(self.transport.get(key).await?)
    }

    async fn set(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), RpcError> {
        Ok(self.transport.set(key, value, ttl_secs).await?)
    }

    async fn publish(&self, channel: &str, payload: &str) -> Result<(), RpcError> {
        self.transport
            .publish(channel, payload)
            .await
            .map_err(|e| RpcError::PublishFailure(e.to_string()))
    }

    async fn subscribe(
        &self,
        channel: &str,
        sink: mpsc::UnboundedSender<BusMessage>,
    ) -> Result<(), RpcError> {
        // A channel only gets listeners once the transport subscription held.
        let _serial = self.subscribing.lock().await;
        if !self.listeners.is_listening(channel) {
            self.transport.subscribe(channel).await?;
            tracing::info!(channel, "listening on channel");
        }
        self.listeners.add(channel, sink);
        Ok(())
    }

    async fn request(
        &self,
        pattern: &str,
        payload: Value,
        options: SendOptions,
    ) -> Result<Value, RpcError> {
        self.send_with(pattern, payload, options).await
    }

    fn default_options(&self) -> SendOptions {
        self.settings.defaults
    }
}
