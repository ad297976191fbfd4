//! BeatMapper CLI library.
//!
//! Input adapters and command implementations behind the `beatmapper`
//! binary.

pub mod commands;
pub mod input;
