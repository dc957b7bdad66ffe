//! Redis-backed transport.
//!
//! Cache commands and `PUBLISH` share one multiplexed connection. A second,
//! dedicated connection runs in subscriber mode: it is split into a sink
//! (`SUBSCRIBE` / `UNSUBSCRIBE`) and a stream whose messages are forwarded
//! into the process-wide [`EventBus`] feed by a background task.
//!
//! When the subscriber stream ends the task reopens the connection with
//! exponential backoff and replays every live subscription on it. Until
//! that succeeds [`Transport::is_connected`] reports `false`.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use redis::AsyncCommands;
use redis::aio::{MultiplexedConnection, PubSubSink, PubSubStream};
use tokio::sync::{Mutex, broadcast};
use tokio::task::JoinHandle;

use super::{Transport, TransportError};
use crate::domain::{BusMessage, EventBus};

/// First delay before reopening a dropped subscriber connection.
pub const RECONNECT_INITIAL_DELAY: Duration = Duration::from_millis(100);

/// Upper bound of the reconnect backoff.
pub const RECONNECT_MAX_DELAY: Duration = Duration::from_secs(5);

/// Subscriber half plus the channels it must carry.
struct Subscriber {
    sink: PubSubSink,
    channels: HashSet<String>,
}

/// Redis pub/sub bus and cache.
pub struct RedisTransport {
    connection: MultiplexedConnection,
    subscriber: Arc<Mutex<Subscriber>>,
    feed: EventBus,
    live: Arc<AtomicBool>,
    reader: JoinHandle<()>,
}

impl RedisTransport {
    /// Connects to Redis at `url` and starts forwarding subscribed traffic.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Redis`] if the URL is invalid or either
    /// connection cannot be established.
    pub async fn connect(url: &str, feed_capacity: usize) -> Result<Self, TransportError> {
        let client = redis::Client::open(url)?;
        let connection = client.get_multiplexed_async_connection().await?;
        let (sink, stream) = client.get_async_pubsub().await?.split();

        let subscriber = Arc::new(Mutex::new(Subscriber {
            sink,
            channels: HashSet::new(),
        }));
        let feed = EventBus::new(feed_capacity);
        let live = Arc::new(AtomicBool::new(true));
        let reader = tokio::spawn(read_loop(
            client,
            stream,
            Arc::clone(&subscriber),
            feed.clone(),
            Arc::clone(&live),
        ));

        tracing::info!("redis transport connected");
        Ok(Self {
            connection,
            subscriber,
            feed,
            live,
            reader,
        })
    }
}

/// Delay before reconnect attempt `attempt` (zero-based).
#[must_use]
pub fn reconnect_delay(attempt: u32) -> Duration {
    RECONNECT_INITIAL_DELAY
        .saturating_mul(2_u32.saturating_pow(attempt))
        .min(RECONNECT_MAX_DELAY)
}

async fn read_loop(
    client: redis::Client,
    mut stream: PubSubStream,
    subscriber: Arc<Mutex<Subscriber>>,
    feed: EventBus,
    live: Arc<AtomicBool>,
) {
    loop {
        forward(&mut stream, &feed).await;
        live.store(false, Ordering::SeqCst);
        tracing::error!("redis pub/sub stream closed, reconnecting");
        stream = reconnect(&client, &subscriber).await;
        live.store(true, Ordering::SeqCst);
    }
}

async fn forward(stream: &mut PubSubStream, feed: &EventBus) {
    while let Some(msg) = stream.next().await {
        let channel = msg.get_channel_name().to_string();
        match msg.get_payload::<String>() {
            Ok(payload) => {
                let _ = feed.publish(BusMessage { channel, payload });
            }
            Err(e) => {
                tracing::warn!(%channel, error = %e, "dropping non-utf8 pub/sub payload");
            }
        }
    }
}

async fn reconnect(client: &redis::Client, subscriber: &Mutex<Subscriber>) -> PubSubStream {
    let mut attempt = 0;
    loop {
        tokio::time::sleep(reconnect_delay(attempt)).await;
        match resubscribe(client, subscriber).await {
            Ok(stream) => return stream,
            Err(e) => {
                attempt += 1;
                tracing::warn!(attempt, error = %e, "redis pub/sub reconnect failed");
            }
        }
    }
}

async fn resubscribe(
    client: &redis::Client,
    subscriber: &Mutex<Subscriber>,
) -> Result<PubSubStream, redis::RedisError> {
    let (mut sink, stream) = client.get_async_pubsub().await?.split();
    let mut subscriber = subscriber.lock().await;
    for channel in &subscriber.channels {
        sink.subscribe(channel.as_str()).await?;
    }
    subscriber.sink = sink;
    tracing::info!(
        channels = subscriber.channels.len(),
        "redis pub/sub reconnected"
    );
    Ok(stream)
}

impl fmt::Debug for RedisTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisTransport")
            .field("feed", &self.feed)
            .field("live", &self.live)
            .finish_non_exhaustive()
    }
}

impl Drop for RedisTransport {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

#[async_trait]
impl Transport for RedisTransport {
    async fn get(&self, key: &str) -> Result<Option<String>, TransportError> {
        let mut conn = self.connection.clone();
        Ok(conn.get(key).await?)
    }

    async fn set(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), TransportError> {
        let mut conn = self.connection.clone();
        conn.set_ex::<_, _, ()>(key, value, ttl_secs).await?;
        Ok(())
    }

    async fn publish(&self, channel: &str, payload: &str) -> Result<(), TransportError> {
        let mut conn = self.connection.clone();
        conn.publish::<_, _, ()>(channel, payload).await?;
        Ok(())
    }

    async fn subscribe(&self, channel: &str) -> Result<(), TransportError> {
        let mut subscriber = self.subscriber.lock().await;
        subscriber.sink.subscribe(channel).await?;
        subscriber.channels.insert(channel.to_string());
        tracing::debug!(channel, "subscribed");
        Ok(())
    }

    async fn unsubscribe(&self, channel: &str) -> Result<(), TransportError> {
        let mut subscriber = self.subscriber.lock().await;
        subscriber.channels.remove(channel);
        subscriber.sink.unsubscribe(channel).await?;
        Ok(())
    }

    fn messages(&self) -> broadcast::Receiver<BusMessage> {
        self.feed.subscribe()
    }

    fn is_connected(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }
}
