//! ElevenLabs TTS provider. ElevenLabs has no native
//! speed parameter at all, so every non-1.0 speed goes through the tempo
//! fallback.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use crate::audio::AudioProcess;
use crate::error::{WorkerError, WorkerResult};

use super::{estimate_duration_sec, SynthesizedVoice, TtsProvider};

const ELEVENLABS_BASE_URL: &str = "https://api.elevenlabs.io/v1/text-to-speech";
const DEFAULT_MODEL: &str = "eleven_monolingual_v1";

pub struct ElevenLabsProvider {
    http_client: reqwest::Client,
    api_key: String,
    audio: AudioProcess,
}

impl ElevenLabsProvider {
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
impl TtsProvider for ElevenLabsProvider {
    async fn synthesize(
        &self,
        text: &str,
        voice_id: &str,
        model: Option<&str>,
        speed: f64,
        out_path: &Path,
    ) -> WorkerResult<SynthesizedVoice> {
        let url = format!("{ELEVENLABS_BASE_URL}/{voice_id}");
        let response = self
            .http_client
            .post(&url)
            .header("xi-api-key", &self.api_key)
            .json(&serde_json::json!({
                "text": text,
                "model_id": model.unwrap_or(DEFAULT_MODEL),
            }))
            .send()
            .await
            .map_err(|e| WorkerError::TtsProviderError(format!("ElevenLabs request failed: {e}")))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(WorkerError::TtsProviderError("ElevenLabs rejected the API key".to_string()));
        }
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(WorkerError::TtsProviderError(format!(
                "ElevenLabs voice '{voice_id}' was not found"
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(WorkerError::TtsProviderError(format!(
                "ElevenLabs returned HTTP {status}: {body}"
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| WorkerError::TtsProviderError(format!("failed reading ElevenLabs response body: {e}")))?;

        let raw_path = out_path.with_extension("raw.mp3");
        let mut file = tokio::fs::File::create(&raw_path)
            .await
            .map_err(|e| WorkerError::TtsProviderError(format!("failed writing TTS output: {e}")))?;
        file.write_all(&bytes)
            .await
            .map_err(|e| WorkerError::TtsProviderError(format!("failed writing TTS output: {e}")))?;
        drop(file);

        let final_path = if (speed - 1.0).abs() <= f64::EPSILON {
            tokio::fs::rename(&raw_path, out_path)
                .await
                .map_err(|e| WorkerError::TtsProviderError(format!("failed finalizing TTS output: {e}")))?;
            out_path.to_path_buf()
        } else {
            self.audio.tempo_stretch(&raw_path, speed, out_path).await?;
            out_path.to_path_buf()
        };

        Ok(SynthesizedVoice {
            path: final_path,
            estimated_duration_sec: estimate_duration_sec(text, speed),
        })
    }
}
