//! Render pipeline — the hardest subsystem: per-job
//! orchestration through a deterministic staged state machine with fixed
//! progress checkpoints. Each stage writes one intermediate file
//! into a per-job temp directory; the directory is removed on any terminal
//! outcome.

mod stage_binaural;
mod stage_music;
mod stage_solfeggio;
mod stage_voice;

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, instrument, warn};

use render_common::{EventBus, JobEvent};

use crate::audio::AudioProcess;
use crate::error::{WorkerError, WorkerResult};
use crate::models::Job;
use crate::queue::QueueClient;
use crate::tts;
use crate::validators::validate_payload;

/// Everything a job needs that outlives the job itself: shared handles to
/// the queue, the audio process driver, TTS credentials, and the event bus.
/// Constructed once per environment at startup.
pub struct Pipeline {
    pub queue: Arc<dyn QueueClient>,
    pub audio: AudioProcess,
    pub events: EventBus,
    pub environment: String,
    pub openai_key: Option<String>,
    pub elevenlabs_key: Option<String>,
}

impl Pipeline {
    /// Run one claimed job to a terminal outcome. Never returns an `Err`
    /// that the caller needs to re-fail the job with — every failure path
    /// here has already called `queue.fail()` before returning. Returns
    /// whether the job completed successfully, so the caller can attribute
    /// it to the right counter.
    #[instrument(skip_all, fields(job_id = %job.job_id, environment = %self.environment))]
    pub async fn process_job(&self, job: Job) -> WorkerResult<bool> {
        self.events.emit(JobEvent::JobStarted {
            job_id: job.job_id.clone(),
            environment: self.environment.clone(),
            timestamp: Utc::now(),
        }).ok();

        let payload = match validate_payload(&job.payload) {
            Ok(payload) => payload,
            Err(violations) => {
                let message = format!("PayloadInvalid: {violations}");
                self.fail_job(&job.job_id, &message).await;
                return Ok(false);
            }
        };

        let temp_dir = match tempfile::Builder::new().prefix("render-job-").tempdir() {
            Ok(dir) => dir,
            Err(e) => {
                self.fail_job(&job.job_id, &format!("failed to create temp directory: {e}")).await;
                return Ok(false);
            }
        };
        let temp_path = temp_dir.path().to_path_buf();

        let result = self.run_stages(&job, &payload, &temp_path).await;

        // Temp directory is deleted on drop regardless of outcome; `temp_dir` stays alive until here.
        drop(temp_dir);

        match result {
            Ok((storage_path, duration_ms)) => {
                self.events.emit(JobEvent::JobCompleted {
                    job_id: job.job_id.clone(),
                    track_id: job.track_id.clone(),
                    duration_ms,
                    timestamp: Utc::now(),
                }).ok();
                info!(track_id = %job.track_id, duration_ms, storage_path = %storage_path, "job completed");
                Ok(true)
            }
            Err(e) => {
                self.fail_job(&job.job_id, &e.to_string()).await;
                Ok(false)
            }
        }
    }

    async fn fail_job(&self, job_id: &str, message: &str) {
        if let Err(e) = self.queue.fail(job_id, message).await {
            error!(job_id, error = %e, "failed to record job failure in queue");
        }
        self.events.emit(JobEvent::JobFailed {
            job_id: job_id.to_string(),
            error: message.to_string(),
            timestamp: Utc::now(),
        }).ok();
    }

    async fn report(&self, job_id: &str, percent: u8, stage: &str) {
        if let Err(e) = self.queue.update_progress(job_id, percent, stage).await {
            warn!(job_id, error = %e, "failed to record progress");
        }
        self.events.emit(JobEvent::JobProgress {
            job_id: job_id.to_string(),
            percent,
            stage: stage.to_string(),
            timestamp: Utc::now(),
        }).ok();
    }

    async fn warn_job(&self, job_id: &str, message: &str) {
        warn!(job_id, message, "recoverable warning during render");
        self.events.emit(JobEvent::JobWarning {
            job_id: job_id.to_string(),
            message: message.to_string(),
            timestamp: Utc::now(),
        }).ok();
    }

    /// The staged state machine itself. Returns the uploaded
    /// storage path and final duration on success.
    async fn run_stages(
        &self,
        job: &Job,
        payload: &crate::models::RenderPayload,
        temp_dir: &PathBuf,
    ) -> WorkerResult<(String, i64)> {
        let job_id = &job.job_id;
        self.report(job_id, 5, "validated").await;

        // Stage 1: voice.
        let provider = match &payload.voice {
            Some(voice) => Some(tts::provider_for(
                voice,
                self.openai_key.as_deref(),
                self.elevenlabs_key.as_deref(),
                self.audio.clone(),
            )?),
            None => None,
        };
        let voice_path = stage_voice::run(payload, provider.as_deref(), &self.audio, temp_dir).await?;
        self.report(job_id, 20, "voice").await;

        // Stage 2: background music (the one layer allowed to degrade).
        let music_path = if payload.background_music.is_some() {
            self.report(job_id, 25, "music_download").await;
            let path = match stage_music::run(payload, self.queue.as_ref(), &self.audio, temp_dir).await {
                Ok(Some(path)) => Some(path),
                Ok(None) => {
                    self.warn_job(job_id, "background music download failed, layer dropped").await;
                    None
                }
                Err(e) => {
                    self.warn_job(job_id, &format!("background music layer dropped: {e}")).await;
                    None
                }
            };
            self.report(job_id, 30, "music").await;
            path
        } else {
            None
        };

        // Stage 3: Solfeggio tone.
        let solfeggio_path = if payload.solfeggio.is_some() {
            self.report(job_id, 35, "solfeggio_generating").await;
            let path = stage_solfeggio::run(payload, &self.audio, temp_dir).await?;
            self.report(job_id, 40, "solfeggio").await;
            path
        } else {
            None
        };

        // Stage 4: binaural beat.
        let binaural_path = if payload.binaural.is_some() {
            self.report(job_id, 45, "binaural_generating").await;
            let path = stage_binaural::run(payload, &self.audio, temp_dir).await?;
            self.report(job_id, 50, "binaural").await;
            path
        } else {
            None
        };

        // Stage 5: mix. Tone layers already carry their gain in sine
        // amplitude, so they're mixed at 0 dB.
        self.report(job_id, 55, "mix_collecting").await;
        let mut layers = Vec::new();
        if let Some(path) = voice_path {
            layers.push((path, payload.gains.voice_db));
        }
        if let Some(path) = music_path {
            layers.push((path, payload.gains.music_db));
        }
        if let Some(path) = solfeggio_path {
            layers.push((path, 0.0));
        }
        if let Some(path) = binaural_path {
            layers.push((path, 0.0));
        }
        if layers.is_empty() {
            return Err(WorkerError::NoLayersError);
        }
        let mixed_path = temp_dir.join("mixed.mp3");
        self.audio.mix(&layers, &mixed_path).await?;
        self.report(job_id, 70, "mix").await;

        // Stage 6: fade.
        self.report(job_id, 75, "fade_applying").await;
        let faded_path = temp_dir.join("faded.mp3");
        self.audio.fade(&mixed_path, payload.fade.in_ms, payload.fade.out_ms, &faded_path).await?;
        self.report(job_id, 80, "fade").await;

        // Stage 7: loudness normalize.
        self.report(job_id, 85, "normalize_measuring").await;
        let normalized_path = temp_dir.join("normalized.mp3");
        self.audio.loudness_normalize(&faded_path, payload.target_lufs, &normalized_path).await?;
        self.report(job_id, 90, "normalize").await;

        // Stage 8: upload + finalize.
        self.report(job_id, 95, "uploading").await;
        let format = crate::models::AudioFormat::Mp3;
        let upload = self.queue.upload_render(&normalized_path, &job.track_id, format).await?;
        let probe = self.audio.probe(&normalized_path).await?;
        self.queue.finalize_track(&job.track_id, &upload.storage_path, probe.duration_ms).await?;
        self.queue
            .complete(job_id, serde_json::json!({ "storagePath": upload.storage_path, "durationMs": probe.duration_ms }))
            .await?;

        Ok((upload.storage_path, probe.duration_ms))
    }
}
