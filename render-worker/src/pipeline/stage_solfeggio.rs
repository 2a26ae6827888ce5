//! Stage 3 — Solfeggio tone: mono sine, duplicated bytewise to
//! stereo (same sample both channels — unlike the binaural stage).

use std::path::{Path, PathBuf};

use crate::audio::AudioProcess;
use crate::error::WorkerResult;
use crate::models::{RenderPayload, SAMPLE_RATE_HZ};
use crate::pcm::{db_to_linear, sine_mono};

pub async fn run(payload: &RenderPayload, audio: &AudioProcess, temp_dir: &Path) -> WorkerResult<Option<PathBuf>> {
    let Some(solfeggio) = &payload.solfeggio else {
        return Ok(None);
    };

    let amplitude = db_to_linear(solfeggio.volume_db);
    let mono = sine_mono(solfeggio.hz as f64, amplitude, payload.duration_sec as f64);
    let stereo = duplicate_mono_to_stereo(&mono);

    let out_path = temp_dir.join("solfeggio.mp3");
    audio.encode_pcm16(&stereo, 2, SAMPLE_RATE_HZ, &out_path).await?;
    Ok(Some(out_path))
}

/// Same sample on both channels, byte-for-byte — this is what distinguishes
/// the Solfeggio layer from the binaural layer's independent L/R phases.
fn duplicate_mono_to_stereo(mono: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(mono.len() * 2);
    for chunk in mono.chunks_exact(2) {
        out.extend_from_slice(chunk);
        out.extend_from_slice(chunk);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_mono_to_stereo_repeats_each_sample_on_both_channels() {
        let mono = vec![1u8, 2, 3, 4];
        let stereo = duplicate_mono_to_stereo(&mono);
        assert_eq!(stereo, vec![1, 2, 1, 2, 3, 4, 3, 4]);
    }
}
