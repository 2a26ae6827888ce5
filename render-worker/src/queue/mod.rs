//! Queue client: atomic dequeue with lease semantics, progress
//! reporting, and the storage side-channel for uploads/downloads.

mod postgres;
mod storage;

use std::path::Path;

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::WorkerResult;
use crate::models::{AudioFormat, Job};

pub use postgres::PostgresQueueClient;
pub use storage::SupabaseStorage;

/// A freshly inserted job id, pushed by [`QueueClient::subscribe_inserts`].
#[derive(Debug, Clone)]
pub struct JobInserted {
    pub job_id: String,
}

/// All operations are atomic w.r.t. the backing store.
#[async_trait]
pub trait QueueClient: Send + Sync {
    /// Claim the oldest pending row, skipping rows locked by other workers.
    /// Transitions `pending -> processing`, increments `attempts`, sets
    /// `leased_until = now + lease_ttl`.
    async fn dequeue_one(&self) -> WorkerResult<Option<Job>>;

    /// Best-effort, idempotent on percent monotonicity.
    async fn update_progress(&self, job_id: &str, percent: u8, stage_label: &str) -> WorkerResult<()>;

    /// Terminal transition to `completed`; releases the lease.
    async fn complete(&self, job_id: &str, result_json: serde_json::Value) -> WorkerResult<()>;

    /// Terminal transition to `failed`; releases the lease.
    async fn fail(&self, job_id: &str, error_message: &str) -> WorkerResult<()>;

    /// Upload the rendered file; bounded retry lives inside the
    /// implementation.
    async fn upload_render(
        &self,
        local_path: &Path,
        track_id: &str,
        format: AudioFormat,
    ) -> WorkerResult<UploadResult>;

    /// Download a background-music source, supporting both storage-bucket
    /// URLs and arbitrary HTTPS. Returns `false` (not an error) on any
    /// recoverable failure — the pipeline treats this as a dropped layer.
    async fn download_background_music(&self, url: &str, local_path: &Path) -> WorkerResult<bool>;

    /// Marks the persisted artifact URL, duration, and publication state.
    async fn finalize_track(&self, track_id: &str, storage_path: &str, duration_ms: i64) -> WorkerResult<()>;

    /// A stream of newly inserted job ids, realtime-pushed where the backing
    /// store supports it.
    fn subscribe_inserts(&self) -> BoxStream<'static, JobInserted>;
}

#[derive(Debug, Clone)]
pub struct UploadResult {
    pub url: String,
    pub storage_path: String,
}
