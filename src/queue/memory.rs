//! In-process work queue.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use super::{Job, JobId, QueueError, WorkQueue};

#[derive(Debug, Default)]
struct State {
    waiting: VecDeque<Job>,
    failed: VecDeque<(Job, String)>,
    completed: Vec<Job>,
}

/// FIFO queue kept in memory.
///
/// Consumers take jobs with [`take`](Self::take) and settle them with
/// [`complete`](Self::complete) or [`fail`](Self::fail); both apply the
/// job's retention options.
#[derive(Debug, Default)]
pub struct MemoryWorkQueue {
    state: Mutex<State>,
}

impl MemoryWorkQueue {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> Result<MutexGuard<'_, State>, QueueError> {
        self.state
            .lock()
            .map_err(|_| QueueError::Backend("memory queue lock poisoned".to_string()))
    }

    /// Jobs waiting to be taken, oldest first.
    #[must_use]
    pub fn jobs(&self) -> Vec<Job> {
        self.state()
            .map(|state| state.waiting.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Removes and returns the oldest waiting job.
    #[must_use]
    pub fn take(&self) -> Option<Job> {
        self.state().ok()?.waiting.pop_front()
    }

    /// Marks a taken job completed.
    pub fn complete(&self, job: Job) {
        let Ok(mut state) = self.state() else {
            return;
        };
        if !job.opts.remove_on_complete {
            state.completed.push(job);
        }
    }

    /// Marks a taken job failed, keeping at most `remove_on_fail` failures.
    pub fn fail(&self, job: Job, reason: &str) {
        let Ok(mut state) = self.state() else {
            return;
        };
        let keep = job.opts.remove_on_fail;
        state.failed.push_back((job, reason.to_string()));
        while state.failed.len() > keep {
            state.failed.pop_front();
        }
    }

    /// Failed jobs still retained, oldest first, with their failure reason.
    #[must_use]
    pub fn failed(&self) -> Vec<(Job, String)> {
        self.state()
            .map(|state| state.failed.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Completed jobs that asked to be kept.
    #[must_use]
    pub fn completed(&self) -> Vec<Job> {
        self.state()
            .map(|state| state.completed.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl WorkQueue for MemoryWorkQueue {
    async fn enqueue(
        &self,
        job_name: &str,
        payload: serde_json::Value,
    ) -> Result<JobId, QueueError> {
        let job = Job::new(job_name, payload);
        let id = job.id.clone();
        self.state()?.waiting.push_back(job);
        tracing::debug!(job_id = %id, job_name, "job enqueued");
        Ok(id)
    }
}
