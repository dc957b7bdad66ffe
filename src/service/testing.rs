//! Scripted broker for service tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::domain::BusMessage;
use crate::rpc::{Broker, RpcError, SendOptions};
use crate::transport::TransportError;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Broker whose cache, replies and failures are set up by the test.
///
/// Requests are answered with the scripted reply, or time out when none
/// is set.
#[derive(Debug, Default)]
pub(crate) struct FakeBroker {
    cache: Mutex<HashMap<String, String>>,
    reply: Mutex<Option<Value>>,
    requests: Mutex<Vec<(String, Value)>>,
    published: Mutex<Vec<BusMessage>>,
    subscribed: Mutex<Vec<String>>,
    fail_writes: AtomicBool,
}

impl FakeBroker {
    pub(crate) fn cache_value(&self, key: &str, value: &Value) {
        lock(&self.cache).insert(key.to_string(), value.to_string());
    }

    pub(crate) fn reply_with(&self, value: Value) {
        *lock(&self.reply) = Some(value);
    }

    pub(crate) fn fail_writes(&self) {
        self.fail_writes.store(true, Ordering::SeqCst);
    }

    pub(crate) fn cached(&self, key: &str) -> Option<Value> {
        lock(&self.cache)
            .get(key)
            .and_then(|raw| serde_json::from_str(raw).ok())
    }

    pub(crate) fn requests(&self) -> Vec<(String, Value)> {
        lock(&self.requests).clone()
    }

    pub(crate) fn published(&self) -> Vec<BusMessage> {
        lock(&self.published).clone()
    }

    pub(crate) fn subscribed(&self) -> Vec<String> {
        lock(&self.subscribed).clone()
    }
}

#[async_trait]
impl Broker for FakeBroker {
    async fn get(&self, key: &str) -> Result<Option<String>, RpcError> {
        Ok(lock(&self.cache).get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str, _ttl_secs: u64) -> Result<(), RpcError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(TransportError::Backend("cache unavailable".to_string()).into());
        }
        lock(&self.cache).insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn publish(&self, channel: &str, payload: &str) -> Result<(), RpcError> {
        lock(&self.published).push(BusMessage::new(channel, payload));
        Ok(())
    }

    async fn subscribe(
        &self,
        channel: &str,
        _sink: mpsc::UnboundedSender<BusMessage>,
    ) -> Result<(), RpcError> {
        lock(&self.subscribed).push(channel.to_string());
        Ok(())
    }

    async fn request(
        &self,
        pattern: &str,
        payload: Value,
        options: SendOptions,
    ) -> Result<Value, RpcError> {
        lock(&self.requests).push((pattern.to_string(), payload));
        lock(&self.reply).clone().ok_or_else(|| RpcError::Timeout {
            pattern: pattern.to_string(),
            timeout_ms: options.timeout_ms(),
        })
    }

    fn default_options(&self) -> SendOptions {
        SendOptions::default()
    }
}
