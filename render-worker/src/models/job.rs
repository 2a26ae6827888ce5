//! Job and track-artifact models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::payload::RawPayload;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

/// Immutable-input job row, owned and mutated only through the queue client
///. `attempts`/`leased_until` are queue bookkeeping the pipeline
/// never touches directly.
#[derive(Debug, Clone)]
pub struct Job {
    pub job_id: String,
    pub track_id: String,
    pub user_id: String,
    pub status: JobStatus,
    pub payload: RawPayload,
    pub progress: u8,
    pub stage_label: String,
    pub error: Option<String>,
    pub attempts: i32,
    pub leased_until: Option<DateTime<Utc>>,
}

/// Output of the pipeline: an opaque compressed-audio blob plus
/// the metadata the queue client needs to finalize the track row.
#[derive(Debug, Clone)]
pub struct TrackArtifact {
    pub local_path: std::path::PathBuf,
    pub duration_ms: i64,
    pub format: AudioFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    Mp3,
}

impl AudioFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "mp3",
        }
    }
}
