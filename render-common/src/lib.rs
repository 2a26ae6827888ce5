//! # render-common
//!
//! Shared code for the meditation-track render worker:
//! - Error type shared across the queue client, pipeline, and HTTP surface
//! - Environment-variable configuration resolution
//! - Job progress event bus (feeds SSE / log correlation)
//! - Postgres pool bootstrap
//! - Human-readable time formatting and UUID helpers

pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod human_time;
pub mod uuid_utils;

pub use error::{Error, Result};
pub use events::{EventBus, JobEvent};
