//! Database pool bootstrap, shared by the worker binary and its tests

pub mod init;

pub use init::*;
