//! Render payload model
//!
//! Parsing happens in two stages so downstream code always consumes a
//! fully-typed value instead of dispatching on raw JSON shape:
//!
//! - [`RawPayload`] deserializes directly from the job row's `payload` JSON.
//!   Every field is optional or defaulted — this stage never fails, it just
//!   captures whatever shape the enqueuer sent.
//! - [`crate::validators::payload_validator`] is the *single* parsing
//!   boundary that turns a `RawPayload` into a [`RenderPayload`],
//!   collecting every violation instead of stopping at the first. Everything
//!   downstream of the validator — the pipeline, the mixers — only ever
//!   sees a `RenderPayload`.

use serde::{Deserialize, Serialize};

/// TTS provider selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TtsProviderKind {
    Openai,
    Elevenlabs,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawVoice {
    pub provider: TtsProviderKind,
    pub id: String,
    pub model: Option<String>,
    pub speed: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawBackgroundMusic {
    pub id: Option<String>,
    pub name: Option<String>,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawSolfeggio {
    #[serde(default)]
    pub enabled: bool,
    pub hz: Option<u32>,
    pub volume_db: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawBinaural {
    #[serde(default)]
    pub enabled: bool,
    pub band: Option<String>,
    #[serde(rename = "carrierHz")]
    pub carrier_hz: Option<f64>,
    #[serde(rename = "beatHz")]
    pub beat_hz: Option<f64>,
    pub volume_db: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawGains {
    #[serde(rename = "voiceDb")]
    pub voice_db: Option<f64>,
    #[serde(rename = "musicDb")]
    pub music_db: Option<f64>,
    #[serde(rename = "solfeggioDb")]
    pub solfeggio_db: Option<f64>,
    #[serde(rename = "binauralDb")]
    pub binaural_db: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawFade {
    #[serde(rename = "inMs")]
    pub in_ms: Option<u32>,
    #[serde(rename = "outMs")]
    pub out_ms: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawSafety {
    #[serde(rename = "targetLufs")]
    pub target_lufs: Option<f64>,
}

/// Exactly what the enqueuer sent, permissively parsed. Never fails to
/// deserialize on its own — `#[serde(default)]` everywhere a real payload
/// might omit a field. The payload validator is what enforces the
/// invariants.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawPayload {
    #[serde(default)]
    pub script: String,
    pub voice: Option<RawVoice>,
    #[serde(rename = "durationMin")]
    pub duration_min: Option<u32>,
    /// Legacy field name, still accepted: `durationMin` wins when both are present.
    pub duration: Option<u32>,
    #[serde(rename = "pauseSec")]
    pub pause_sec: Option<u32>,
    #[serde(rename = "loopMode", default)]
    pub loop_mode: bool,
    #[serde(rename = "startDelaySec", default)]
    pub start_delay_sec: u32,
    #[serde(rename = "backgroundMusic")]
    pub background_music: Option<RawBackgroundMusic>,
    pub solfeggio: Option<RawSolfeggio>,
    pub binaural: Option<RawBinaural>,
    pub gains: Option<RawGains>,
    pub fade: Option<RawFade>,
    pub safety: Option<RawSafety>,
}

impl Default for RawVoice {
    fn default() -> Self {
        Self {
            provider: TtsProviderKind::Openai,
            id: String::new(),
            model: None,
            speed: None,
        }
    }
}

// ---------------------------------------------------------------------
// Validated, fully-typed model the pipeline actually consumes.
// ---------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct VoiceSpec {
    pub provider: TtsProviderKind,
    pub id: String,
    pub model: Option<String>,
    pub speed: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BackgroundMusicSpec {
    pub url: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolfeggioSpec {
    pub hz: u32,
    pub volume_db: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BinauralSpec {
    pub carrier_hz: f64,
    pub beat_hz: f64,
    pub volume_db: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gains {
    pub voice_db: f64,
    pub music_db: f64,
    pub solfeggio_db: f64,
    pub binaural_db: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FadeSpec {
    pub in_ms: u32,
    pub out_ms: u32,
}

/// The fully-typed, already-validated render request the pipeline operates
/// on. Every field here has already had its default applied and its range
/// checked — the pipeline never re-derives a default or re-checks a bound.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderPayload {
    pub script: String,
    pub voice: Option<VoiceSpec>,
    /// Normalized once, used by every downstream stage.
    pub duration_sec: u32,
    pub pause_sec: u32,
    pub loop_mode: bool,
    pub start_delay_sec: u32,
    pub background_music: Option<BackgroundMusicSpec>,
    pub solfeggio: Option<SolfeggioSpec>,
    pub binaural: Option<BinauralSpec>,
    pub gains: Gains,
    pub fade: FadeSpec,
    pub target_lufs: f64,
}

impl RenderPayload {
    /// `voiceTargetSec`: voice/pause layout excludes the lead-in silence
    /// and never targets less than 30s.
    pub fn voice_target_sec(&self) -> u32 {
        self.duration_sec
            .saturating_sub(self.start_delay_sec)
            .max(30)
    }
}
