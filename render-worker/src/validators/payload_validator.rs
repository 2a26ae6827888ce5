//! The single parsing boundary: turns a permissive [`RawPayload`]
//! into a fully-typed [`RenderPayload`], collecting *every* violation rather
//! than failing on the first one found.

use crate::models::{
    BackgroundMusicSpec, BinauralSpec, FadeSpec, Gains, GainDefaults, RawPayload, RenderPayload,
    SolfeggioSpec, VoiceSpec, DEFAULT_CARRIER_HZ, DEFAULT_FADE_IN_MS, DEFAULT_FADE_OUT_MS,
    DEFAULT_TARGET_LUFS, VALID_SOLFEGGIO_HZ,
};
use crate::models::constants::resolve_beat_hz;

const DURATION_MIN_MIN: u32 = 1;
const DURATION_MIN_MAX: u32 = 30;
const DEFAULT_DURATION_MIN: u32 = 5;
const BINAURAL_CARRIER_MIN: f64 = 100.0;
const BINAURAL_CARRIER_MAX: f64 = 1000.0;
const BINAURAL_BEAT_MIN: f64 = 1.0;
const BINAURAL_BEAT_MAX: f64 = 100.0;
const VOICE_SPEED_MIN: f64 = 0.25;
const VOICE_SPEED_MAX: f64 = 4.0;
const PAUSE_SEC_MIN: u32 = 1;
const PAUSE_SEC_MAX: u32 = 30;
/// No default pause is specified anywhere else, so `5` (the value used by
/// every sample payload seen in practice) is used whenever a payload omits
/// the field entirely.
const DEFAULT_PAUSE_SEC: u32 = 5;
const START_DELAY_SEC_MAX: u32 = 60;

/// All the ways a [`RawPayload`] can fail validation, joined with `"; "` into
/// a single [`crate::error::WorkerError::PayloadInvalid`] message.
fn push_if(violations: &mut Vec<String>, condition: bool, message: impl Into<String>) {
    if condition {
        violations.push(message.into());
    }
}

/// Validate and normalize a raw payload. On success, every field of the
/// returned [`RenderPayload`] has already had its default applied and its
/// range checked.
pub fn validate_payload(raw: &RawPayload) -> Result<RenderPayload, String> {
    let mut violations = Vec::new();

    // Tie-break: durationMin wins over the legacy
    // `duration` field, which wins over the documented default of 5 minutes.
    let duration_min = raw.duration_min.or(raw.duration).unwrap_or(DEFAULT_DURATION_MIN);
    push_if(
        &mut violations,
        !(DURATION_MIN_MIN..=DURATION_MIN_MAX).contains(&duration_min),
        format!(
            "durationMin must be between {DURATION_MIN_MIN} and {DURATION_MIN_MAX}, got {duration_min}"
        ),
    );
    let duration_sec = duration_min.saturating_mul(60);

    let script = raw.script.trim().to_string();

    let voice = match &raw.voice {
        Some(v) if !v.id.trim().is_empty() => {
            let speed = v.speed.unwrap_or(1.0);
            push_if(
                &mut violations,
                !(VOICE_SPEED_MIN..=VOICE_SPEED_MAX).contains(&speed),
                format!("voice.speed must be between {VOICE_SPEED_MIN} and {VOICE_SPEED_MAX}, got {speed}"),
            );
            Some(VoiceSpec {
                provider: v.provider,
                id: v.id.clone(),
                model: v.model.clone(),
                speed,
            })
        }
        Some(_) => {
            violations.push("voice.id must not be empty when voice is present".to_string());
            None
        }
        None => None,
    };

    // script is only required when a voice layer is configured; a
    // binaural/solfeggio/music-only payload legitimately has no script.
    push_if(
        &mut violations,
        voice.is_some() && script.is_empty(),
        "script must not be empty when voice is present",
    );

    let pause_sec = raw.pause_sec.unwrap_or(DEFAULT_PAUSE_SEC);
    push_if(
        &mut violations,
        !(PAUSE_SEC_MIN..=PAUSE_SEC_MAX).contains(&pause_sec),
        format!("pauseSec must be between {PAUSE_SEC_MIN} and {PAUSE_SEC_MAX}, got {pause_sec}"),
    );

    push_if(
        &mut violations,
        raw.start_delay_sec > START_DELAY_SEC_MAX,
        format!("startDelaySec must be at most {START_DELAY_SEC_MAX}, got {}", raw.start_delay_sec),
    );

    let background_music = match &raw.background_music {
        Some(bm) => match &bm.url {
            Some(url) if !url.trim().is_empty() => Some(BackgroundMusicSpec { url: url.clone() }),
            _ => {
                violations.push("backgroundMusic.url must not be empty when backgroundMusic is present".to_string());
                None
            }
        },
        None => None,
    };

    let solfeggio = match &raw.solfeggio {
        Some(s) if s.enabled => {
            let hz = s.hz.unwrap_or(VALID_SOLFEGGIO_HZ[0]);
            push_if(
                &mut violations,
                !VALID_SOLFEGGIO_HZ.contains(&hz),
                format!("solfeggio.hz {hz} is not one of the recognized Solfeggio frequencies"),
            );
            Some(SolfeggioSpec {
                hz,
                volume_db: s.volume_db.unwrap_or(GainDefaults::SOLFEGGIO_DB),
            })
        }
        _ => None,
    };

    let binaural = match &raw.binaural {
        Some(b) if b.enabled => {
            let carrier_hz = b.carrier_hz.unwrap_or(DEFAULT_CARRIER_HZ);
            let beat_hz = resolve_beat_hz(b.beat_hz, b.band.as_deref());
            push_if(
                &mut violations,
                !(BINAURAL_CARRIER_MIN..=BINAURAL_CARRIER_MAX).contains(&carrier_hz),
                format!(
                    "binaural.carrierHz must be between {BINAURAL_CARRIER_MIN} and {BINAURAL_CARRIER_MAX}, got {carrier_hz}"
                ),
            );
            push_if(
                &mut violations,
                !(BINAURAL_BEAT_MIN..=BINAURAL_BEAT_MAX).contains(&beat_hz),
                format!(
                    "binaural.beatHz must be between {BINAURAL_BEAT_MIN} and {BINAURAL_BEAT_MAX}, got {beat_hz}"
                ),
            );
            Some(BinauralSpec {
                carrier_hz,
                beat_hz,
                volume_db: b.volume_db.unwrap_or(GainDefaults::BINAURAL_DB),
            })
        }
        _ => None,
    };

    // At-least-one-source rule: a payload that would render
    // silence is rejected outright.
    push_if(
        &mut violations,
        voice.is_none() && background_music.is_none() && solfeggio.is_none() && binaural.is_none(),
        "payload must specify at least one audio source (voice, backgroundMusic, solfeggio, or binaural)",
    );

    let gains = Gains {
        voice_db: raw
            .gains
            .as_ref()
            .and_then(|g| g.voice_db)
            .unwrap_or(GainDefaults::VOICE_DB),
        music_db: raw
            .gains
            .as_ref()
            .and_then(|g| g.music_db)
            .unwrap_or(GainDefaults::MUSIC_DB),
        solfeggio_db: raw
            .gains
            .as_ref()
            .and_then(|g| g.solfeggio_db)
            .unwrap_or(GainDefaults::SOLFEGGIO_DB),
        binaural_db: raw
            .gains
            .as_ref()
            .and_then(|g| g.binaural_db)
            .unwrap_or(GainDefaults::BINAURAL_DB),
    };

    let fade = FadeSpec {
        in_ms: raw
            .fade
            .as_ref()
            .and_then(|f| f.in_ms)
            .unwrap_or(DEFAULT_FADE_IN_MS),
        out_ms: raw
            .fade
            .as_ref()
            .and_then(|f| f.out_ms)
            .unwrap_or(DEFAULT_FADE_OUT_MS),
    };

    let target_lufs = raw
        .safety
        .as_ref()
        .and_then(|s| s.target_lufs)
        .unwrap_or(DEFAULT_TARGET_LUFS);

    if !violations.is_empty() {
        return Err(violations.join("; "));
    }

    Ok(RenderPayload {
        script,
        voice,
        duration_sec,
        pause_sec,
        loop_mode: raw.loop_mode,
        start_delay_sec: raw.start_delay_sec,
        background_music,
        solfeggio,
        binaural,
        gains,
        fade,
        target_lufs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RawBinaural, RawSolfeggio, RawVoice, TtsProviderKind};

    fn base_raw() -> RawPayload {
        RawPayload {
            script: "breathe in, breathe out".to_string(),
            duration_min: Some(5),
            voice: Some(RawVoice {
                provider: TtsProviderKind::Openai,
                id: "alloy".to_string(),
                model: None,
                speed: None,
            }),
            ..Default::default()
        }
    }

    #[test]
    fn valid_payload_with_voice_passes() {
        let payload = validate_payload(&base_raw()).expect("should validate");
        assert_eq!(payload.duration_sec, 300);
        assert_eq!(payload.gains.voice_db, GainDefaults::VOICE_DB);
        assert_eq!(payload.fade.in_ms, DEFAULT_FADE_IN_MS);
    }

    #[test]
    fn rejects_payload_with_no_audio_source() {
        let mut raw = base_raw();
        raw.voice = None;
        let err = validate_payload(&raw).unwrap_err();
        assert!(err.contains("at least one audio source"));
    }

    #[test]
    fn rejects_out_of_range_duration() {
        let mut raw = base_raw();
        raw.duration_min = Some(31);
        let err = validate_payload(&raw).unwrap_err();
        assert!(err.contains("durationMin"));
    }

    #[test]
    fn legacy_duration_field_is_used_when_duration_min_absent() {
        let mut raw = base_raw();
        raw.duration_min = None;
        raw.duration = Some(10);
        let payload = validate_payload(&raw).expect("should validate");
        assert_eq!(payload.duration_sec, 600);
    }

    #[test]
    fn rejects_unrecognized_solfeggio_frequency() {
        let mut raw = base_raw();
        raw.solfeggio = Some(RawSolfeggio {
            enabled: true,
            hz: Some(440),
            volume_db: None,
        });
        let err = validate_payload(&raw).unwrap_err();
        assert!(err.contains("Solfeggio"));
    }

    #[test]
    fn rejects_binaural_carrier_and_beat_out_of_range_simultaneously() {
        let mut raw = base_raw();
        raw.binaural = Some(RawBinaural {
            enabled: true,
            band: None,
            carrier_hz: Some(50.0),
            beat_hz: Some(500.0),
            volume_db: None,
        });
        let err = validate_payload(&raw).unwrap_err();
        assert!(err.contains("carrierHz"));
        assert!(err.contains("beatHz"));
    }

    #[test]
    fn binaural_band_resolves_beat_hz_and_default_carrier() {
        let mut raw = base_raw();
        raw.binaural = Some(RawBinaural {
            enabled: true,
            band: Some("alpha".to_string()),
            carrier_hz: None,
            beat_hz: None,
            volume_db: None,
        });
        let payload = validate_payload(&raw).expect("should validate");
        let binaural = payload.binaural.expect("binaural present");
        assert_eq!(binaural.beat_hz, 10.0);
        assert_eq!(binaural.carrier_hz, DEFAULT_CARRIER_HZ);
    }

    #[test]
    fn binaural_only_payload_with_empty_script_validates() {
        let mut raw = base_raw();
        raw.script = String::new();
        raw.voice = None;
        raw.binaural = Some(RawBinaural {
            enabled: true,
            band: None,
            carrier_hz: Some(400.0),
            beat_hz: Some(6.0),
            volume_db: None,
        });
        let payload = validate_payload(&raw).expect("should validate without a script");
        assert!(payload.voice.is_none());
        assert_eq!(payload.binaural.expect("binaural present").beat_hz, 6.0);
    }

    #[test]
    fn voice_present_with_empty_script_is_rejected() {
        let mut raw = base_raw();
        raw.script = "   ".to_string();
        let err = validate_payload(&raw).unwrap_err();
        assert!(err.contains("script must not be empty"));
    }
}
