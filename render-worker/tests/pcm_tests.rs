//! Binaural/Solfeggio PCM synthesis verified by frequency, not just sample
//! count: take a DFT of the synthesized buffer and confirm the energy peak
//! lands at the expected bin.

use render_worker::models::SAMPLE_RATE_HZ;
use render_worker::pcm::{sine_mono, sine_stereo_independent};
use rustfft::{num_complex::Complex, FftPlanner};

/// Dominant frequency (Hz) in one channel of interleaved PCM16, via a
/// straightforward power-of-two FFT over the leading window of samples.
fn dominant_frequency_hz(samples: &[i16], sample_rate: u32) -> f64 {
    let fft_len = samples.len().next_power_of_two() / 2;
    let mut buffer: Vec<Complex<f64>> = samples[..fft_len]
        .iter()
        .map(|&s| Complex::new(s as f64, 0.0))
        .collect();

    let mut planner = FftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(fft_len);
    fft.process(&mut buffer);

    let (peak_bin, _) = buffer[..fft_len / 2]
        .iter()
        .enumerate()
        .skip(1) // bin 0 is DC
        .max_by(|(_, a), (_, b)| a.norm().partial_cmp(&b.norm()).unwrap())
        .expect("fft output is non-empty");

    peak_bin as f64 * sample_rate as f64 / fft_len as f64
}

fn deinterleave_channel(pcm: &[u8], channel: usize, channel_count: usize) -> Vec<i16> {
    pcm.chunks_exact(2 * channel_count)
        .map(|frame| {
            let offset = channel * 2;
            i16::from_le_bytes([frame[offset], frame[offset + 1]])
        })
        .collect()
}

#[test]
fn solfeggio_tone_peaks_at_its_configured_frequency() {
    let pcm = sine_mono(528.0, 1.0, 1.0);
    let samples = deinterleave_channel(&pcm, 0, 1);
    let peak = dominant_frequency_hz(&samples, SAMPLE_RATE_HZ);
    assert!((peak - 528.0).abs() < 5.0, "expected ~528 Hz, got {peak}");
}

#[test]
fn binaural_beat_splits_into_independent_carrier_minus_half_beat_channels() {
    // carrierHz=200, beatHz=10 -> 195/205 Hz per channel.
    let pcm = sine_stereo_independent(195.0, 205.0, 1.0, 1.0);
    let left = deinterleave_channel(&pcm, 0, 2);
    let right = deinterleave_channel(&pcm, 1, 2);

    let left_peak = dominant_frequency_hz(&left, SAMPLE_RATE_HZ);
    let right_peak = dominant_frequency_hz(&right, SAMPLE_RATE_HZ);

    assert!((left_peak - 195.0).abs() < 5.0, "expected ~195 Hz, got {left_peak}");
    assert!((right_peak - 205.0).abs() < 5.0, "expected ~205 Hz, got {right_peak}");
}

#[test]
fn binaural_beat_with_explicit_carrier_400_and_beat_6_splits_to_397_403() {
    let pcm = sine_stereo_independent(397.0, 403.0, 1.0, 1.0);
    let left = deinterleave_channel(&pcm, 0, 2);
    let right = deinterleave_channel(&pcm, 1, 2);

    assert!((dominant_frequency_hz(&left, SAMPLE_RATE_HZ) - 397.0).abs() < 5.0);
    assert!((dominant_frequency_hz(&right, SAMPLE_RATE_HZ) - 403.0).abs() < 5.0);
}

#[test]
fn binaural_beat_from_alpha_band_splits_around_default_carrier() {
    // band:'alpha' with no carrierHz resolves to
    // beatHz=10 around the 200 Hz default carrier, same split as above.
    let pcm = sine_stereo_independent(195.0, 205.0, 0.6, 0.5);
    let left = deinterleave_channel(&pcm, 0, 2);
    let right = deinterleave_channel(&pcm, 1, 2);

    let left_peak = dominant_frequency_hz(&left, SAMPLE_RATE_HZ);
    let right_peak = dominant_frequency_hz(&right, SAMPLE_RATE_HZ);

    assert!((right_peak - left_peak - 10.0).abs() < 5.0, "expected a ~10 Hz beat, got {}", right_peak - left_peak);
}
