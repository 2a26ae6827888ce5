//! Stage 4 — Binaural beat: independent-phase L/R sine tones.
//! `leftHz = carrierHz - beatHz/2`, `rightHz = carrierHz + beatHz/2`.

use std::path::{Path, PathBuf};

use crate::audio::AudioProcess;
use crate::error::WorkerResult;
use crate::models::{RenderPayload, SAMPLE_RATE_HZ};
use crate::pcm::{db_to_linear, sine_stereo_independent};

pub async fn run(payload: &RenderPayload, audio: &AudioProcess, temp_dir: &Path) -> WorkerResult<Option<PathBuf>> {
    let Some(binaural) = &payload.binaural else {
        return Ok(None);
    };

    let left_hz = binaural.carrier_hz - binaural.beat_hz / 2.0;
    let right_hz = binaural.carrier_hz + binaural.beat_hz / 2.0;
    let amplitude = db_to_linear(binaural.volume_db);
    let pcm = sine_stereo_independent(left_hz, right_hz, amplitude, payload.duration_sec as f64);

    let out_path = temp_dir.join("binaural.mp3");
    audio.encode_pcm16(&pcm, 2, SAMPLE_RATE_HZ, &out_path).await?;
    Ok(Some(out_path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn left_and_right_frequencies_split_around_carrier() {
        let carrier = 200.0;
        let beat = 10.0;
        let left = carrier - beat / 2.0;
        let right = carrier + beat / 2.0;
        assert_eq!(left, 195.0);
        assert_eq!(right, 205.0);
    }
}
