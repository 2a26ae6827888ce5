//! Payload validator end-to-end cases, exercised through the crate's public
//! API rather than the validator module's own unit tests.

use render_worker::models::RawPayload;
use render_worker::validators::validate_payload;

fn payload_from_json(json: serde_json::Value) -> RawPayload {
    serde_json::from_value(json).expect("test payload should deserialize")
}

#[test]
fn invalid_payload_with_no_audio_sources_is_rejected() {
    let raw = payload_from_json(serde_json::json!({ "durationMin": 10 }));
    let err = validate_payload(&raw).expect_err("payload has no audio source");
    assert!(err.contains("at least one audio source"));
}

#[test]
fn unrecognized_solfeggio_frequency_is_rejected_by_name() {
    let raw = payload_from_json(serde_json::json!({
        "durationMin": 5,
        "voice": { "provider": "openai", "id": "nova" },
        "solfeggio": { "enabled": true, "hz": 500 },
    }));
    let err = validate_payload(&raw).expect_err("500 Hz is not a recognized Solfeggio frequency");
    assert!(err.contains("solfeggio.hz"));
}

#[test]
fn voice_only_payload_validates_with_documented_defaults() {
    let raw = payload_from_json(serde_json::json!({
        "durationMin": 1,
        "voice": { "provider": "openai", "id": "nova" },
        "script": "Breathe in.",
        "pauseSec": 5,
        "loopMode": true,
    }));
    let payload = validate_payload(&raw).expect("payload is valid");
    assert_eq!(payload.duration_sec, 60);
    assert_eq!(payload.pause_sec, 5);
    assert!(payload.background_music.is_none());
    assert!(payload.solfeggio.is_none());
}

#[test]
fn full_stack_payload_resolves_every_layer() {
    let raw = payload_from_json(serde_json::json!({
        "durationMin": 5,
        "voice": { "provider": "openai", "id": "alloy" },
        "script": "Relax.",
        "pauseSec": 10,
        "backgroundMusic": { "url": "s3://bucket/calm.mp3" },
        "solfeggio": { "enabled": true, "hz": 528 },
        "binaural": { "enabled": true, "band": "alpha" },
        "gains": { "voiceDb": 0, "musicDb": -12, "solfeggioDb": -18, "binauralDb": -20 },
    }));
    let payload = validate_payload(&raw).expect("payload is valid");
    assert_eq!(payload.duration_sec, 300);
    assert_eq!(payload.solfeggio.unwrap().hz, 528);
    let binaural = payload.binaural.expect("binaural present");
    assert_eq!(binaural.beat_hz, 10.0);
    assert_eq!(payload.gains.voice_db, 0.0);
}
