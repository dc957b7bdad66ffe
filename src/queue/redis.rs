//! Redis-backed work queue in the BullMQ layout.
//!
//! The settlement workers are BullMQ consumers, so a job is written the way
//! BullMQ's own producer writes it:
//!
//! 1. `INCR {prefix}:{queue}:id` allocates the job id;
//! 2. `HSET {prefix}:{queue}:{id}` stores name, data, opts and timestamp;
//! 3. `LPUSH {prefix}:{queue}:wait {id}` makes it visible to workers;
//! 4. `ZADD {prefix}:{queue}:marker 0 0` wakes workers blocked on the marker.
//!
//! Steps 2 to 4 run in one `MULTI`/`EXEC`. Delayed, prioritised and paused
//! queues are not supported.

use std::fmt;

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::MultiplexedConnection;

use super::{Job, JobId, QueueError, WorkQueue};

/// Key names of one queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueKeys {
    base: String,
}

impl QueueKeys {
    /// Keys of queue `queue` under `prefix`.
    #[must_use]
    pub fn new(prefix: &str, queue: &str) -> Self {
        Self {
            base: format!("{prefix}:{queue}"),
        }
    }

    /// Counter the job ids are drawn from.
    #[must_use]
    pub fn id(&self) -> String {
        format!("{}:id", self.base)
    }

    /// List of job ids waiting for a worker.
    #[must_use]
    pub fn wait(&self) -> String {
        format!("{}:wait", self.base)
    }

    /// Sorted set workers block on for new work.
    #[must_use]
    pub fn marker(&self) -> String {
        format!("{}:marker", self.base)
    }

    /// Hash holding job `id`.
    #[must_use]
    pub fn job(&self, id: &str) -> String {
        format!("{}:{id}", self.base)
    }
}

/// Fields of the job hash. `data` and `opts` are JSON strings and the
/// timestamp is in epoch milliseconds.
///
/// # Errors
///
/// Returns [`serde_json::Error`] if the payload cannot be encoded.
pub fn job_fields(job: &Job) -> Result<Vec<(&'static str, String)>, serde_json::Error> {
    Ok(vec![
        ("name", job.name.clone()),
        ("data", serde_json::to_string(&job.data)?),
        ("opts", serde_json::to_string(&job.opts)?),
        ("timestamp", job.timestamp.timestamp_millis().to_string()),
        ("delay", "0".to_string()),
        ("priority", "0".to_string()),
    ])
}

/// Producer for a BullMQ queue.
pub struct RedisWorkQueue {
    connection: MultiplexedConnection,
    keys: QueueKeys,
}

impl RedisWorkQueue {
    /// Connects to Redis at `url` and targets queue `queue` under `prefix`.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Redis`] if the URL is invalid or the connection
    /// cannot be established.
    pub async fn connect(url: &str, prefix: &str, queue: &str) -> Result<Self, QueueError> {
        let client = redis::Client::open(url)?;
        let connection = client.get_multiplexed_async_connection().await?;
        let keys = QueueKeys::new(prefix, queue);
        tracing::info!(wait_key = %keys.wait(), "redis work queue connected");
        Ok(Self { connection, keys })
    }
}

impl fmt::Debug for RedisWorkQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisWorkQueue")
            .field("keys", &self.keys)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl WorkQueue for RedisWorkQueue {
    async fn enqueue(
        &self,
        job_name: &str,
        payload: serde_json::Value,
    ) -> Result<JobId, QueueError> {
        let mut conn = self.connection.clone();
        let seq: u64 = conn.incr(self.keys.id(), 1).await?;

        let mut job = Job::new(job_name, payload);
        job.id = seq.to_string();
        let fields = job_fields(&job)?;

        let () = redis::pipe()
            .atomic()
            .hset_multiple(self.keys.job(&job.id), &fields)
            .ignore()
            .lpush(self.keys.wait(), &job.id)
            .ignore()
            .zadd(self.keys.marker(), "0", 0)
            .ignore()
            .query_async(&mut conn)
            .await?;
        tracing::debug!(job_id = %job.id, job_name, "job enqueued");
        Ok(job.id)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use chrono::TimeZone;
    use serde_json::{Value, json};

    use super::*;

    #[test]
    fn queue_key_layout() {
        let keys = QueueKeys::new("bull", "bet");
        assert_eq!(keys.id(), "bull:bet:id");
        assert_eq!(keys.wait(), "bull:bet:wait");
        assert_eq!(keys.marker(), "bull:bet:marker");
        assert_eq!(keys.job("42"), "bull:bet:42");
    }

    #[test]
    fn job_hash_holds_json_strings() {
        let mut job = Job::new("bet", json!({"player": "p1", "round": {"open": true}}));
        job.id = "42".to_string();
        let Some(at) = chrono::Utc.timestamp_millis_opt(1_700_000_000_123).single() else {
            panic!("valid timestamp");
        };
        job.timestamp = at;

        let Ok(fields) = job_fields(&job) else {
            panic!("job should encode");
        };
        let field = |name: &str| {
            fields
                .iter()
                .find(|(k, _)| *k == name)
                .map(|(_, v)| v.clone())
        };

        assert_eq!(field("name").as_deref(), Some("bet"));
        assert_eq!(field("timestamp").as_deref(), Some("1700000000123"));
        let data: Option<Value> = field("data").and_then(|d| serde_json::from_str(&d).ok());
        assert_eq!(data, Some(json!({"player": "p1", "round": {"open": true}})));
        let opts: Option<Value> = field("opts").and_then(|o| serde_json::from_str(&o).ok());
        assert_eq!(opts, Some(json!({"removeOnComplete": true, "removeOnFail": 5})));
        assert!(field("id").is_none());
    }
}
