//! Domain models: render payload, job, track artifact, and shared constants.

pub mod constants;
pub mod job;
pub mod payload;

pub use constants::*;
pub use job::{AudioFormat, Job, JobStatus, TrackArtifact};
pub use payload::{
    BackgroundMusicSpec, BinauralSpec, FadeSpec, Gains, RawPayload, RenderPayload, SolfeggioSpec,
    TtsProviderKind, VoiceSpec,
};
