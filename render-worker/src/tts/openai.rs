//! OpenAI TTS provider: a `reqwest::Client` with status-code branching
//! into typed errors.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use crate::audio::AudioProcess;
use crate::error::{WorkerError, WorkerResult};

use super::{estimate_duration_sec, SynthesizedVoice, TtsProvider};

const OPENAI_SPEECH_URL: &str = "https://api.openai.com/v1/audio/speech";
const DEFAULT_MODEL: &str = "tts-1";
/// OpenAI's `speed` parameter is native only in this range; outside it the
/// adapter falls back to a post-hoc tempo filter.
const NATIVE_SPEED_RANGE: std::ops::RangeInclusive<f64> = 0.25..=4.0;

pub struct OpenAiProvider {
    http_client: reqwest::Client,
    api_key: String,
    audio: AudioProcess,
}

impl OpenAiProvider {
    pub fn new(api_key: impl Into<String>, audio: AudioProcess) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .expect("reqwest client build should not fail with default settings");
        Self {
            http_client,
            api_key: api_key.into(),
            audio,
        }
    }
}

#[async_trait]
impl TtsProvider for OpenAiProvider {
    async fn synthesize(
        &self,
        text: &str,
        voice_id: &str,
        model: Option<&str>,
        speed: f64,
        out_path: &Path,
    ) -> WorkerResult<SynthesizedVoice> {
        let native_speed = NATIVE_SPEED_RANGE.contains(&speed);
        let request_speed = if native_speed { speed } else { 1.0 };

        let response = self
            .http_client
            .post(OPENAI_SPEECH_URL)
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({
                "model": model.unwrap_or(DEFAULT_MODEL),
                "voice": voice_id,
                "input": text,
                "speed": request_speed,
                "response_format": "mp3",
            }))
            .send()
            .await
            .map_err(|e| WorkerError::TtsProviderError(format!("OpenAI request failed: {e}")))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(WorkerError::TtsProviderError("OpenAI rejected the API key".to_string()));
        }
        if status == reqwest::StatusCode::NOT_FOUND || status == reqwest::StatusCode::BAD_REQUEST {
            let body = response.text().await.unwrap_or_default();
            return Err(WorkerError::TtsProviderError(format!(
                "OpenAI rejected voice '{voice_id}': {body}"
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(WorkerError::TtsProviderError(format!(
                "OpenAI returned HTTP {status}: {body}"
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| WorkerError::TtsProviderError(format!("failed reading OpenAI response body: {e}")))?;

        let raw_path = out_path.with_extension("raw.mp3");
        let mut file = tokio::fs::File::create(&raw_path)
            .await
            .map_err(|e| WorkerError::TtsProviderError(format!("failed writing TTS output: {e}")))?;
        file.write_all(&bytes)
            .await
            .map_err(|e| WorkerError::TtsProviderError(format!("failed writing TTS output: {e}")))?;
        drop(file);

        let final_path = if native_speed {
            tokio::fs::rename(&raw_path, out_path)
                .await
                .map_err(|e| WorkerError::TtsProviderError(format!("failed finalizing TTS output: {e}")))?;
            out_path.to_path_buf()
        } else {
            self.audio
                .tempo_stretch(&raw_path, speed, out_path)
                .await?;
            out_path.to_path_buf()
        };

        Ok(SynthesizedVoice {
            path: final_path,
            estimated_duration_sec: estimate_duration_sec(text, speed),
        })
    }
}
