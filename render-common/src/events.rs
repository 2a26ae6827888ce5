//! Job progress event bus
//!
//! A broadcast-channel event bus scoped to the one event family this worker
//! emits: render-job lifecycle and progress. Consumed by an SSE stream in
//! `render-worker::api` and by the pipeline's own structured logging.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Render-job lifecycle and progress events, broadcast to any SSE clients
/// and used internally to drive structured log correlation.
///
/// Tagged with `#[serde(tag = "type")]` so the wire shape is
/// self-describing to consumers that only see the JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum JobEvent {
    /// A job was claimed by this worker and moved pending → processing.
    JobStarted {
        job_id: String,
        environment: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
    /// A pipeline stage checkpoint was reached.
    JobProgress {
        job_id: String,
        percent: u8,
        stage: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
    /// A non-fatal warning was recovered from locally.
    JobWarning {
        job_id: String,
        message: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
    /// Terminal success.
    JobCompleted {
        job_id: String,
        track_id: String,
        duration_ms: i64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
    /// Terminal failure.
    JobFailed {
        job_id: String,
        error: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl JobEvent {
    /// SSE `event:` field / metric label.
    pub fn event_type(&self) -> &'static str {
        match self {
            JobEvent::JobStarted { .. } => "job_started",
            JobEvent::JobProgress { .. } => "job_progress",
            JobEvent::JobWarning { .. } => "job_warning",
            JobEvent::JobCompleted { .. } => "job_completed",
            JobEvent::JobFailed { .. } => "job_failed",
        }
    }
}

/// Broadcast bus for [`JobEvent`]s. Cloning shares the underlying channel.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<JobEvent>,
}

impl EventBus {
    /// `capacity` bounds how many unconsumed events are buffered before the
    /// slowest subscriber starts lagging (and its `recv()` returns `Lagged`).
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.tx.subscribe()
    }

    /// Emit to all subscribers. Returns the subscriber count reached, or an
    /// error if nobody is listening — callers should not treat "no
    /// subscribers" as fatal, since the worker runs fine with zero SSE
    /// clients attached.
    pub fn emit(&self, event: JobEvent) -> Result<usize, broadcast::error::SendError<JobEvent>> {
        self.tx.send(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscriber_receives_emitted_event() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        bus.emit(JobEvent::JobStarted {
            job_id: "job-1".into(),
            environment: "PROD".into(),
            timestamp: chrono::Utc::now(),
        })
        .unwrap();

        let received = rx.recv().await.unwrap();
        assert_eq!(received.event_type(), "job_started");
    }

    #[test]
    fn emit_without_subscribers_is_not_an_error_condition_to_propagate() {
        let bus = EventBus::new(4);
        // No subscribers: send() errors, but callers are expected to ignore it.
        let result = bus.emit(JobEvent::JobWarning {
            job_id: "job-2".into(),
            message: "background music download failed".into(),
            timestamp: chrono::Utc::now(),
        });
        assert!(result.is_err());
    }
}
