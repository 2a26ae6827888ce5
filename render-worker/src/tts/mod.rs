//! TTS adapter: a uniform interface over the OpenAI and
//! ElevenLabs providers. Each provider turns `text, voice_id, model, speed`
//! into compressed stereo audio bytes plus a telemetry-only estimated
//! duration; the pipeline always re-probes the real duration afterward.

mod elevenlabs;
mod openai;

use std::path::Path;

use async_trait::async_trait;

use crate::audio::AudioProcess;
use crate::error::{WorkerError, WorkerResult};
use crate::models::{RenderPayload, TtsProviderKind, VoiceSpec};

pub use elevenlabs::ElevenLabsProvider;
pub use openai::OpenAiProvider;

/// Result of a single TTS call: the file it wrote and an estimate the
/// pipeline only uses for progress/telemetry — actual layer
/// length always comes from [`AudioProcess::probe`].
#[derive(Debug, Clone)]
pub struct SynthesizedVoice {
    pub path: std::path::PathBuf,
    pub estimated_duration_sec: f64,
}

/// Provider-agnostic text-to-speech call.
#[async_trait]
pub trait TtsProvider: Send + Sync {
    async fn synthesize(
        &self,
        text: &str,
        voice_id: &str,
        model: Option<&str>,
        speed: f64,
        out_path: &Path,
    ) -> WorkerResult<SynthesizedVoice>;
}

/// Word-count based estimate used for telemetry before the file is probed
/// for its real duration: `word count / 150 wpm * 60 / speed`.
pub fn estimate_duration_sec(text: &str, speed: f64) -> f64 {
    let words = text.split_whitespace().count().max(1) as f64;
    (words / 150.0) * 60.0 / speed.max(0.01)
}

/// Construct the correct provider from a [`VoiceSpec`], given whichever
/// credentials were resolved at startup.
pub fn provider_for(
    voice: &VoiceSpec,
    openai_key: Option<&str>,
    elevenlabs_key: Option<&str>,
    audio: AudioProcess,
) -> WorkerResult<Box<dyn TtsProvider>> {
    match voice.provider {
        TtsProviderKind::Openai => {
            let key = openai_key.ok_or_else(|| {
                WorkerError::TtsProviderError("OPENAI_API_KEY is not configured".to_string())
            })?;
            Ok(Box::new(OpenAiProvider::new(key, audio)))
        }
        TtsProviderKind::Elevenlabs => {
            let key = elevenlabs_key.ok_or_else(|| {
                WorkerError::TtsProviderError("ELEVENLABS_API_KEY is not configured".to_string())
            })?;
            Ok(Box::new(ElevenLabsProvider::new(key, audio)))
        }
    }
}

/// Does this payload's voice need a post-hoc tempo stretch because the
/// provider has no native speed control at the requested rate?
pub fn needs_tempo_fallback(payload: &RenderPayload, native_speed_supported: bool) -> bool {
    match &payload.voice {
        Some(voice) => !native_speed_supported && (voice.speed - 1.0).abs() > f64::EPSILON,
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn estimate_duration_scales_inversely_with_speed() {
        let text = "word ".repeat(150);
        let normal = estimate_duration_sec(&text, 1.0);
        let fast = estimate_duration_sec(&text, 2.0);
        assert!((normal - 60.0).abs() < 0.5);
        assert!((fast - 30.0).abs() < 0.5);
    }

    #[test]
    fn estimate_duration_never_divides_by_zero_speed() {
        let estimate = estimate_duration_sec("hello world", 0.0);
        assert!(estimate.is_finite());
    }
}
