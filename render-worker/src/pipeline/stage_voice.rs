//! Stage 1 — Voice: TTS synthesis, loop-to-duration, lead-in
//! silence. Reports no progress itself; the orchestrator checkpoints at 20%.

use std::path::{Path, PathBuf};

use crate::audio::AudioProcess;
use crate::error::WorkerResult;
use crate::models::RenderPayload;
use crate::tts::TtsProvider;

/// Produce the final voice layer file, or `None` if the payload has no
/// voice configured. `voiceTargetSec` excludes the lead-in delay and is
/// never less than 30s.
pub async fn run(
    payload: &RenderPayload,
    provider: Option<&dyn TtsProvider>,
    audio: &AudioProcess,
    temp_dir: &Path,
) -> WorkerResult<Option<PathBuf>> {
    let (Some(voice), Some(provider)) = (&payload.voice, provider) else {
        return Ok(None);
    };

    let raw_path = temp_dir.join("voice_raw.mp3");
    provider
        .synthesize(&payload.script, &voice.id, voice.model.as_deref(), voice.speed, &raw_path)
        .await?;

    let voice_target_sec = payload.voice_target_sec();
    let looped = audio
        .loop_voice(&raw_path, voice_target_sec, payload.pause_sec, payload.loop_mode, temp_dir)
        .await?;

    if payload.start_delay_sec == 0 {
        return Ok(Some(looped));
    }

    let silence_path = temp_dir.join("voice_lead_in_silence.mp3");
    audio.silence(payload.start_delay_sec as f64, &silence_path).await?;

    let with_lead_in = temp_dir.join("voice_final.mp3");
    audio.concat(&[silence_path, looped], &with_lead_in).await?;
    Ok(Some(with_lead_in))
}
