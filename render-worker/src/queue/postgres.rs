//! Postgres-backed implementation of [`super::QueueClient`]. Dequeue uses
//! `SELECT ... FOR UPDATE SKIP LOCKED` so that, under N concurrent workers
//! and M pending jobs, exactly `min(N, M)` rows enter `processing` and none
//! is claimed twice.
//!
//! Realtime inserts ride Postgres `LISTEN`/`NOTIFY` via the trigger
//! `render-common`'s schema bootstrap installs.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use futures::StreamExt;
use sqlx::postgres::PgListener;
use sqlx::{PgPool, Row};
use tracing::{info, warn};

use crate::error::{WorkerError, WorkerResult};
use crate::models::{AudioFormat, Job, JobStatus};

use super::{JobInserted, QueueClient, UploadResult};

const NOTIFY_CHANNEL: &str = "audio_job_queue_inserts";

pub struct PostgresQueueClient {
    pool: PgPool,
    lease_ttl: Duration,
    max_attempts: i32,
    storage: super::SupabaseStorage,
}

impl PostgresQueueClient {
    pub fn new(pool: PgPool, lease_ttl: Duration, max_attempts: i32, storage: super::SupabaseStorage) -> Self {
        Self {
            pool,
            lease_ttl,
            max_attempts,
            storage,
        }
    }
}

#[async_trait]
impl QueueClient for PostgresQueueClient {
    async fn dequeue_one(&self) -> WorkerResult<Option<Job>> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| WorkerError::QueueError(format!("failed to begin transaction: {e}")))?;

        let row = sqlx::query(
            r#"
            SELECT id, track_id, user_id, payload, progress, stage, error, attempts, leased_until
            FROM audio_job_queue
            WHERE status = 'pending'
               OR (status = 'processing' AND leased_until < now())
            ORDER BY created_at ASC
            FOR UPDATE SKIP LOCKED
            LIMIT 1
            "#,
        )
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| WorkerError::QueueError(format!("dequeue select failed: {e}")))?;

        let Some(row) = row else {
            tx.commit().await.ok();
            return Ok(None);
        };

        let job_id: String = row.try_get("id").map_err(sqlx_err)?;
        let attempts: i32 = row.try_get("attempts").map_err(sqlx_err)?;

        if attempts >= self.max_attempts {
            sqlx::query("UPDATE audio_job_queue SET status = 'failed', error = $1 WHERE id = $2")
                .bind("exceeded max attempts")
                .bind(&job_id)
                .execute(&mut *tx)
                .await
                .map_err(|e| WorkerError::QueueError(format!("failed to fail exhausted job: {e}")))?;
            tx.commit().await.ok();
            return Ok(None);
        }

        let leased_until = Utc::now() + chrono::Duration::from_std(self.lease_ttl).unwrap_or(chrono::Duration::minutes(15));
        sqlx::query(
            "UPDATE audio_job_queue SET status = 'processing', attempts = attempts + 1, leased_until = $1 WHERE id = $2",
        )
        .bind(leased_until)
        .bind(&job_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| WorkerError::QueueError(format!("failed to claim job: {e}")))?;

        tx.commit()
            .await
            .map_err(|e| WorkerError::QueueError(format!("failed to commit dequeue: {e}")))?;

        let payload_json: serde_json::Value = row.try_get("payload").map_err(sqlx_err)?;
        let payload = serde_json::from_value(payload_json)
            .map_err(|e| WorkerError::QueueError(format!("stored payload failed to parse: {e}")))?;

        Ok(Some(Job {
            job_id: job_id.clone(),
            track_id: row.try_get("track_id").map_err(sqlx_err)?,
            user_id: row.try_get("user_id").map_err(sqlx_err)?,
            status: JobStatus::Processing,
            payload,
            progress: row.try_get::<i32, _>("progress").map_err(sqlx_err)? as u8,
            stage_label: row.try_get("stage").map_err(sqlx_err)?,
            error: row.try_get("error").map_err(sqlx_err)?,
            attempts: attempts + 1,
            leased_until: Some(leased_until),
        }))
    }

    async fn update_progress(&self, job_id: &str, percent: u8, stage_label: &str) -> WorkerResult<()> {
        sqlx::query(
            "UPDATE audio_job_queue SET progress = $1, stage = $2 WHERE id = $3 AND progress <= $1",
        )
        .bind(percent as i32)
        .bind(stage_label)
        .bind(job_id)
        .execute(&self.pool)
        .await
        .map_err(|e| WorkerError::QueueError(format!("update_progress failed: {e}")))?;
        Ok(())
    }

    async fn complete(&self, job_id: &str, result_json: serde_json::Value) -> WorkerResult<()> {
        sqlx::query(
            "UPDATE audio_job_queue SET status = 'completed', progress = 100, error = NULL, leased_until = NULL WHERE id = $1",
        )
        .bind(job_id)
        .execute(&self.pool)
        .await
        .map_err(|e| WorkerError::QueueError(format!("complete failed: {e}")))?;
        info!(job_id, result = %result_json, "job completed");
        Ok(())
    }

    async fn fail(&self, job_id: &str, error_message: &str) -> WorkerResult<()> {
        sqlx::query("UPDATE audio_job_queue SET status = 'failed', error = $1, leased_until = NULL WHERE id = $2")
            .bind(error_message)
            .bind(job_id)
            .execute(&self.pool)
            .await
            .map_err(|e| WorkerError::QueueError(format!("fail failed: {e}")))?;
        warn!(job_id, error = error_message, "job failed");
        Ok(())
    }

    async fn upload_render(
        &self,
        local_path: &Path,
        track_id: &str,
        format: AudioFormat,
    ) -> WorkerResult<UploadResult> {
        self.storage.upload_render(local_path, track_id, format).await
    }

    async fn download_background_music(&self, url: &str, local_path: &Path) -> WorkerResult<bool> {
        self.storage.download_background_music(url, local_path).await
    }

    async fn finalize_track(&self, track_id: &str, storage_path: &str, duration_ms: i64) -> WorkerResult<()> {
        let duration_seconds = (duration_ms / 1000) as i32;
        sqlx::query(
            "UPDATE tracks SET audio_url = $1, duration_seconds = $2, status = 'published' WHERE id = $3",
        )
        .bind(storage_path)
        .bind(duration_seconds)
        .bind(track_id)
        .execute(&self.pool)
        .await
        .map_err(|e| WorkerError::QueueError(format!("finalize_track failed: {e}")))?;
        Ok(())
    }

    fn subscribe_inserts(&self) -> BoxStream<'static, JobInserted> {
        let pool = self.pool.clone();
        async_stream::stream! {
            loop {
                let mut listener = match PgListener::connect_with(&pool).await {
                    Ok(listener) => listener,
                    Err(e) => {
                        warn!(error = %e, "failed to establish LISTEN connection, retrying in 5s");
                        tokio::time::sleep(Duration::from_secs(5)).await;
                        continue;
                    }
                };
                if let Err(e) = listener.listen(NOTIFY_CHANNEL).await {
                    warn!(error = %e, "failed to LISTEN on notify channel, retrying in 5s");
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    continue;
                }
                loop {
                    match listener.recv().await {
                        Ok(notification) => {
                            yield JobInserted { job_id: notification.payload().to_string() };
                        }
                        Err(e) => {
                            warn!(error = %e, "LISTEN connection dropped, reconnecting");
                            break;
                        }
                    }
                }
            }
        }
        .boxed()
    }
}

fn sqlx_err(e: sqlx::Error) -> WorkerError {
    WorkerError::QueueError(format!("row decode failed: {e}"))
}
