//! In-process transport.
//!
//! One process, one bus: every holder of a [`MemoryTransport`] shares the
//! cache, the subscribed-channel set and the message feed. A published
//! message reaches the feed only if its channel is subscribed, the same rule
//! a Redis subscriber connection applies.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::broadcast;
use tokio::time::Instant;

use super::{Transport, TransportError};
use crate::domain::{BusMessage, EventBus};

#[derive(Debug)]
struct CacheEntry {
    value: String,
    expires_at: Instant,
}

/// In-memory pub/sub bus and TTL cache.
#[derive(Debug)]
pub struct MemoryTransport {
    cache: Mutex<HashMap<String, CacheEntry>>,
    channels: Mutex<HashSet<String>>,
    published: Mutex<VecDeque<BusMessage>>,
    history: usize,
    feed: EventBus,
    connected: AtomicBool,
}

impl MemoryTransport {
    /// Creates an empty bus whose feed buffers up to `capacity` messages.
    ///
    /// The last `capacity` published messages are also kept for inspection.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            cache: Mutex::new(HashMap::new()),
            channels: Mutex::new(HashSet::new()),
            published: Mutex::new(VecDeque::new()),
            history: capacity.max(1),
            feed: EventBus::new(capacity),
            connected: AtomicBool::new(true),
        }
    }

    /// Simulates losing (`false`) or regaining (`true`) the bus.
    ///
    /// While disconnected every operation fails and nothing is delivered.
    /// Subscriptions survive the outage.
    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    fn ensure_connected(&self) -> Result<(), TransportError> {
        if self.connected.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(TransportError::Backend("bus disconnected".to_string()))
        }
    }

    /// Returns `true` if `channel` is currently subscribed.
    #[must_use]
    pub fn is_subscribed(&self, channel: &str) -> bool {
        lock(&self.channels).is_ok_and(|channels| channels.contains(channel))
    }

    /// Recently published messages, subscribed or not, oldest first.
    #[must_use]
    pub fn published(&self) -> Vec<BusMessage> {
        lock(&self.published)
            .map(|published| published.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Messages published on `channel` so far.
    #[must_use]
    pub fn published_on(&self, channel: &str) -> Vec<String> {
        self.published()
            .into_iter()
            .filter(|m| m.channel == channel)
            .map(|m| m.payload)
            .collect()
    }
}

impl Default for MemoryTransport {
    fn default() -> Self {
        Self::new(10_000)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, TransportError> {
    mutex
        .lock()
        .map_err(|_| TransportError::Backend("memory transport lock poisoned".to_string()))
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn get(&self, key: &str) -> Result<Option<String>, TransportError> {
        self.ensure_connected()?;
        let mut cache = lock(&self.cache)?;
        let now = Instant::now();
        match cache.get(key) {
            Some(entry) if entry.expires_at > now => Ok(Some(entry.value.clone())),
            Some(_) => {
                cache.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), TransportError> {
        self.ensure_connected()?;
        let entry = CacheEntry {
            value: value.to_string(),
            expires_at: Instant::now() + Duration::from_secs(ttl_secs),
        };
        lock(&self.cache)?.insert(key.to_string(), entry);
        Ok(())
    }

    async fn publish(&self, channel: &str, payload: &str) -> Result<(), TransportError> {
        self.ensure_connected()?;
        let message = BusMessage::new(channel, payload);
        {
            let mut published = lock(&self.published)?;
            if published.len() == self.history {
                published.pop_front();
            }
            published.push_back(message.clone());
        }
        if self.is_subscribed(channel) {
            let _ = self.feed.publish(message);
        }
        Ok(())
    }

    async fn subscribe(&self, channel: &str) -> Result<(), TransportError> {
        self.ensure_connected()?;
        lock(&self.channels)?.insert(channel.to_string());
        Ok(())
    }

    async fn unsubscribe(&self, channel: &str) -> Result<(), TransportError> {
        self.ensure_connected()?;
        lock(&self.channels)?.remove(channel);
        Ok(())
    }

    fn messages(&self) -> broadcast::Receiver<BusMessage> {
        self.feed.subscribe()
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}
