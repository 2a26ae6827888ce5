//! Supabase Storage REST client: a `reqwest::Client` with status-code
//! branching into typed errors, plus a bounded retry policy: at most
//! `MAX_RETRIES` attempts, backoff `attempt * 2000ms`, only for retryable
//! (network/5xx) failures.

use std::path::Path;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tracing::warn;

use crate::error::{WorkerError, WorkerResult};
use crate::models::AudioFormat;

use super::UploadResult;

const MAX_RETRIES: u32 = 3;
const RENDER_BUCKET: &str = "audio-renders";

pub struct SupabaseStorage {
    http_client: reqwest::Client,
    base_url: String,
    service_role_key: String,
}

impl SupabaseStorage {
    pub fn new(base_url: impl Into<String>, service_role_key: impl Into<String>) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .expect("reqwest client build should not fail with default settings");
        Self {
            http_client,
            base_url: base_url.into(),
            service_role_key: service_role_key.into(),
        }
    }

    fn object_url(&self, bucket: &str, object_path: &str) -> String {
        format!("{}/storage/v1/object/{bucket}/{object_path}", self.base_url.trim_end_matches('/'))
    }

    /// Upload the rendered file to `audio-renders/tracks/{track_id}/rendered.{ext}`
    ///, retrying retryable failures with `attempt * 2000ms` backoff.
    pub async fn upload_render(
        &self,
        local_path: &Path,
        track_id: &str,
        format: AudioFormat,
    ) -> WorkerResult<UploadResult> {
        let object_path = format!("tracks/{track_id}/rendered.{}", format.extension());
        let bytes = tokio::fs::read(local_path)
            .await
            .map_err(|e| WorkerError::UploadFinal(format!("failed to read rendered file: {e}")))?;

        let mut last_error = String::new();
        for attempt in 1..=MAX_RETRIES {
            match self.try_upload(&object_path, bytes.clone()).await {
                Ok(()) => {
                    return Ok(UploadResult {
                        url: self.object_url(RENDER_BUCKET, &object_path),
                        storage_path: format!("{RENDER_BUCKET}/{object_path}"),
                    });
                }
                Err(UploadAttemptError::Retryable(msg)) => {
                    last_error = msg;
                    warn!(attempt, error = %last_error, "upload attempt failed, retrying");
                    tokio::time::sleep(Duration::from_millis(attempt as u64 * 2000)).await;
                }
                Err(UploadAttemptError::Final(msg)) => {
                    return Err(WorkerError::UploadFinal(msg));
                }
            }
        }
        Err(WorkerError::UploadFinal(format!(
            "upload failed after {MAX_RETRIES} attempts: {last_error}"
        )))
    }

    async fn try_upload(&self, object_path: &str, bytes: Vec<u8>) -> Result<(), UploadAttemptError> {
        let response = self
            .http_client
            .post(self.object_url(RENDER_BUCKET, object_path))
            .bearer_auth(&self.service_role_key)
            .header("x-upsert", "true")
            .header("content-type", "audio/mpeg")
            .body(bytes)
            .send()
            .await
            .map_err(|e| UploadAttemptError::Retryable(format!("network error: {e}")))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        if status.is_server_error() {
            return Err(UploadAttemptError::Retryable(format!("HTTP {status}")));
        }
        let body = response.text().await.unwrap_or_default();
        Err(UploadAttemptError::Final(format!("HTTP {status}: {body}")))
    }

    /// Download a background-music source. Storage-bucket URLs
    /// (`supabase://bucket/object`) are decomposed and fetched through the
    /// Storage API; anything else is fetched as a plain HTTPS GET. Returns
    /// `Ok(false)` for any recoverable failure (e.g. HTTP 404) so the
    /// pipeline can drop the layer instead of failing the job.
    pub async fn download_background_music(&self, url: &str, local_path: &Path) -> WorkerResult<bool> {
        let fetch_url = if let Some(rest) = url.strip_prefix("supabase://") {
            let mut parts = rest.splitn(2, '/');
            let bucket = parts.next().unwrap_or("");
            let object_path = parts.next().unwrap_or("");
            self.object_url(bucket, object_path)
        } else {
            url.to_string()
        };

        let response = match self.http_client.get(&fetch_url).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(url = %fetch_url, error = %e, "background music download failed");
                return Ok(false);
            }
        };

        if !response.status().is_success() {
            warn!(url = %fetch_url, status = %response.status(), "background music download returned non-success status");
            return Ok(false);
        }

        let bytes = match response.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(url = %fetch_url, error = %e, "failed reading background music response body");
                return Ok(false);
            }
        };

        let mut file = tokio::fs::File::create(local_path)
            .await
            .map_err(WorkerError::Io)?;
        file.write_all(&bytes).await.map_err(WorkerError::Io)?;
        Ok(true)
    }
}

enum UploadAttemptError {
    Retryable(String),
    Final(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_url_joins_base_bucket_and_path() {
        let storage = SupabaseStorage::new("https://example.supabase.co", "key");
        assert_eq!(
            storage.object_url("audio-renders", "tracks/abc/rendered.mp3"),
            "https://example.supabase.co/storage/v1/object/audio-renders/tracks/abc/rendered.mp3"
        );
    }

    #[test]
    fn object_url_strips_trailing_slash_from_base() {
        let storage = SupabaseStorage::new("https://example.supabase.co/", "key");
        assert!(!storage.object_url("b", "o").contains("co//storage"));
    }
}
