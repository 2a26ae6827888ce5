//! PCM primitives: sine-wave synthesis and gain conversion.
//! Pure, allocation-light functions with no I/O — everything that needs a
//! file on disk goes through [`crate::audio`] instead.

pub mod gain;
pub mod sine;

pub use gain::db_to_linear;
pub use sine::{sine_mono, sine_stereo_independent};
