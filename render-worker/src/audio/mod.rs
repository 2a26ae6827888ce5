//! Audio process driver: a thin synchronous-looking interface
//! over an external media-processing tool, invoked as a subprocess per
//! operation rather than linked in as a library.

mod process;

pub use process::{voice_loop_repeat_count, AudioProcess, ProbeInfo};
