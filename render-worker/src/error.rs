//! Error taxonomy for the render worker

use axum::{http::StatusCode, response::{IntoResponse, Response}, Json};
use serde_json::json;
use thiserror::Error;

/// Pipeline/runtime error kinds. Each variant's name doubles as the
/// `failed` row's error category, so log lines and stored errors stay
/// consistent.
#[derive(Debug, Error)]
pub enum WorkerError {
    /// Payload failed validation; the job is failed before any stage runs.
    #[error("payload invalid: {0}")]
    PayloadInvalid(String),

    /// TTS provider failure or missing credential.
    #[error("TTS provider error: {0}")]
    TtsProviderError(String),

    /// External audio tool non-zero exit.
    #[error("audio process error: {0}")]
    AudioProcessError(String),

    /// Upload retry budget exhausted.
    #[error("upload failed after retries: {0}")]
    UploadFinal(String),

    /// Backing store unreachable; job is left `processing` for the lease to
    /// expire rather than being marked `failed`.
    #[error("queue error: {0}")]
    QueueError(String),

    /// No layer files survived staging.
    #[error("no layers to mix")]
    NoLayersError,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Common(#[from] render_common::Error),
}

impl WorkerError {
    /// The error kind name as it should appear in a failed job row /
    /// structured log field, independent of the human-readable message.
    pub fn kind(&self) -> &'static str {
        match self {
            WorkerError::PayloadInvalid(_) => "PayloadInvalid",
            WorkerError::TtsProviderError(_) => "TTSProviderError",
            WorkerError::AudioProcessError(_) => "AudioProcessError",
            WorkerError::UploadFinal(_) => "UploadFinal",
            WorkerError::QueueError(_) => "QueueError",
            WorkerError::NoLayersError => "NoLayersError",
            WorkerError::Io(_) => "IoError",
            WorkerError::Common(_) => "CommonError",
        }
    }
}

/// HTTP-facing error for the health/metrics surface. The pipeline's own
/// errors never reach HTTP directly — they're reported through the queue
/// client's `fail()` — but the admin endpoints still need a typed error.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("internal server error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let ApiError::Internal(message) = self;
        let body = Json(json!({
            "error": { "code": "INTERNAL_ERROR", "message": message }
        }));
        (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
    }
}

pub type WorkerResult<T> = std::result::Result<T, WorkerError>;
