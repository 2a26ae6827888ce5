//! Sine-wave PCM16 synthesis, used for Solfeggio tones and
//! binaural beats. Samples are little-endian signed 16-bit, matching the
//! `s16le` raw format `ffmpeg` expects on its stdin pipe.

use crate::models::SAMPLE_RATE_HZ;

/// One sample of `round(amplitude * 32767 * sin(2*pi*freq*i / sample_rate))`.
fn sample_at(amplitude: f64, freq_hz: f64, i: u32, sample_rate: u32) -> i16 {
    let phase = 2.0 * std::f64::consts::PI * freq_hz * i as f64 / sample_rate as f64;
    let value = (amplitude * 32767.0 * phase.sin()).round();
    value.clamp(i16::MIN as f64, i16::MAX as f64) as i16
}

/// Render `duration_sec` seconds of a single-channel sine tone at `freq_hz`,
/// as interleaved little-endian PCM16 bytes at [`SAMPLE_RATE_HZ`].
pub fn sine_mono(freq_hz: f64, amplitude: f64, duration_sec: f64) -> Vec<u8> {
    let sample_count = (duration_sec * SAMPLE_RATE_HZ as f64).round() as u32;
    let mut out = Vec::with_capacity(sample_count as usize * 2);
    for i in 0..sample_count {
        let s = sample_at(amplitude, freq_hz, i, SAMPLE_RATE_HZ);
        out.extend_from_slice(&s.to_le_bytes());
    }
    out
}

/// Render a binaural beat: left and right channels carry independent sine
/// tones — `left_freq_hz`/`right_freq_hz` are `carrierHz ∓
/// beatHz/2`, interleaved L,R,L,R as little-endian PCM16.
pub fn sine_stereo_independent(
    left_freq_hz: f64,
    right_freq_hz: f64,
    amplitude: f64,
    duration_sec: f64,
) -> Vec<u8> {
    let sample_count = (duration_sec * SAMPLE_RATE_HZ as f64).round() as u32;
    let mut out = Vec::with_capacity(sample_count as usize * 4);
    for i in 0..sample_count {
        let l = sample_at(amplitude, left_freq_hz, i, SAMPLE_RATE_HZ);
        let r = sample_at(amplitude, right_freq_hz, i, SAMPLE_RATE_HZ);
        out.extend_from_slice(&l.to_le_bytes());
        out.extend_from_slice(&r.to_le_bytes());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mono_sine_produces_expected_sample_count() {
        let pcm = sine_mono(440.0, 1.0, 1.0);
        assert_eq!(pcm.len(), SAMPLE_RATE_HZ as usize * 2);
    }

    #[test]
    fn stereo_sine_interleaves_left_and_right() {
        let pcm = sine_stereo_independent(195.0, 205.0, 1.0, 0.1);
        let expected_samples = (0.1 * SAMPLE_RATE_HZ as f64).round() as usize;
        assert_eq!(pcm.len(), expected_samples * 4);
    }

    #[test]
    fn first_sample_is_zero_since_sine_starts_at_phase_zero() {
        let pcm = sine_mono(1000.0, 1.0, 0.01);
        let first = i16::from_le_bytes([pcm[0], pcm[1]]);
        assert_eq!(first, 0);
    }

    #[test]
    fn amplitude_scales_peak_sample_magnitude() {
        let full = sine_mono(100.0, 1.0, 1.0);
        let half = sine_mono(100.0, 0.5, 1.0);
        let peak = |pcm: &[u8]| {
            pcm.chunks_exact(2)
                .map(|c| i16::from_le_bytes([c[0], c[1]]).unsigned_abs())
                .max()
                .unwrap()
        };
        let full_peak = peak(&full) as f64;
        let half_peak = peak(&half) as f64;
        assert!((full_peak / 2.0 - half_peak).abs() < 2.0);
    }
}
