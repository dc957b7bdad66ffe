//! Producer side of the external work queue.
//!
//! The gateway only enqueues. Jobs are consumed by the settlement workers,
//! which honour the [`JobOptions`] stored with every job.

pub mod memory;
pub mod redis;

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use self::memory::MemoryWorkQueue;
pub use self::redis::RedisWorkQueue;

/// Failed jobs kept for inspection before the oldest is discarded.
pub const FAILED_JOBS_RETAINED: usize = 5;

/// Identifier assigned to a job at enqueue time.
pub type JobId = String;

/// Failure to hand a job to the queue.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    /// Error from the Redis client.
    #[error("redis: {0}")]
    Redis(#[from] ::redis::RedisError),

    /// The job could not be encoded.
    #[error("serialization: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The backend refused the job.
    #[error("{0}")]
    Backend(String),
}

/// Retention policy carried by each job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobOptions {
    /// Delete the job once a worker completes it.
    pub remove_on_complete: bool,
    /// Number of failed jobs to keep.
    pub remove_on_fail: usize,
}

impl Default for JobOptions {
    fn default() -> Self {
        Self {
            remove_on_complete: true,
            remove_on_fail: FAILED_JOBS_RETAINED,
        }
    }
}

/// A unit of work as stored on the queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    /// Unique job id.
    pub id: JobId,
    /// Job name; workers dispatch on it.
    pub name: String,
    /// Job payload.
    pub data: serde_json::Value,
    /// Retention policy.
    pub opts: JobOptions,
    /// Enqueue time.
    pub timestamp: DateTime<Utc>,
}

impl Job {
    /// New job with a fresh id and the default retention policy.
    #[must_use]
    pub fn new(name: &str, data: serde_json::Value) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            data,
            opts: JobOptions::default(),
            timestamp: Utc::now(),
        }
    }
}

/// Queue the gateway produces jobs into.
#[async_trait]
pub trait WorkQueue: Send + Sync + fmt::Debug {
    /// Appends a job and returns its id once the backend acknowledged it.
    async fn enqueue(&self, job_name: &str, payload: serde_json::Value)
    -> Result<JobId, QueueError>;
}
