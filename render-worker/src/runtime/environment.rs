//! A single queue binding — PROD or DEV — with its own
//! processing guard, counters, and subscription.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use futures::StreamExt;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::warn;

use crate::pipeline::Pipeline;
use crate::queue::JobInserted;

/// `GET /health`'s per-environment shape.
#[derive(Debug, Clone, Serialize)]
pub struct EnvironmentSnapshot {
    pub name: String,
    pub enabled: bool,
    pub is_processing: bool,
    pub total_processed: u64,
    pub total_failed: u64,
    pub last_poll: Option<DateTime<Utc>>,
}

/// One queue binding's runtime state. At most one job is in-flight per
/// environment at a time (`isProcessing`); `MAX_JOBS_PER_CYCLE` bounds how
/// many jobs a single activation drains.
pub struct Environment {
    pub name: String,
    pipeline: Pipeline,
    max_jobs_per_cycle: usize,
    is_processing: AtomicBool,
    total_processed: AtomicU64,
    total_failed: AtomicU64,
    last_poll: Mutex<Option<DateTime<Utc>>>,
}

impl Environment {
    pub fn new(name: impl Into<String>, pipeline: Pipeline, max_jobs_per_cycle: usize) -> Self {
        Self {
            name: name.into(),
            pipeline,
            max_jobs_per_cycle,
            is_processing: AtomicBool::new(false),
            total_processed: AtomicU64::new(0),
            total_failed: AtomicU64::new(0),
            last_poll: Mutex::new(None),
        }
    }

    /// Drain up to `max_jobs_per_cycle` pending jobs. A no-op if this
    /// environment is already processing.
    pub async fn process(&self) {
        if self
            .is_processing
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }

        *self.last_poll.lock().await = Some(Utc::now());

        for _ in 0..self.max_jobs_per_cycle {
            let job = match self.pipeline.queue.dequeue_one().await {
                Ok(Some(job)) => job,
                Ok(None) => break,
                Err(e) => {
                    warn!(environment = %self.name, error = %e, "dequeue failed; backing store unreachable");
                    break;
                }
            };

            let job_id = job.job_id.clone();
            match self.pipeline.process_job(job).await {
                Ok(true) => {
                    self.total_processed.fetch_add(1, Ordering::Relaxed);
                }
                Ok(false) => {
                    self.total_failed.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => {
                    // process_job already marks the queue row failed on any
                    // internal error path; this arm only covers an
                    // unexpected error bubbling past that boundary.
                    warn!(environment = %self.name, job_id, error = %e, "job processing returned an error after failing the row");
                    self.total_failed.fetch_add(1, Ordering::Relaxed);
                }
            }
        }

        self.is_processing.store(false, Ordering::SeqCst);
    }

    pub fn insert_stream(self: &Arc<Self>) -> BoxStream<'static, (Arc<Environment>, JobInserted)> {
        let env = self.clone();
        self.pipeline
            .queue
            .subscribe_inserts()
            .map(move |inserted| (env.clone(), inserted))
            .boxed()
    }

    pub async fn snapshot(&self) -> EnvironmentSnapshot {
        EnvironmentSnapshot {
            name: self.name.clone(),
            enabled: true,
            is_processing: self.is_processing.load(Ordering::Relaxed),
            total_processed: self.total_processed.load(Ordering::Relaxed),
            total_failed: self.total_failed.load(Ordering::Relaxed),
            last_poll: *self.last_poll.lock().await,
        }
    }
}

impl std::fmt::Debug for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Environment").field("name", &self.name).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn process_guard_starts_cleared() {
        // Smoke test for the atomics' initial state; full Environment
        // construction needs a live Pipeline and is covered by the
        // pipeline integration tests instead.
        let flag = AtomicBool::new(false);
        assert!(!flag.load(Ordering::SeqCst));
    }
}
