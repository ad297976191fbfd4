//! BeatMapper Chart Spec Library
//!
//! Types, configuration, and validation shared by every BeatMapper crate.
//! Nothing in here generates charts; this crate only describes them.
//!
//! # Overview
//!
//! - **Inputs**: [`OnsetCandidate`]s and a [`BeatGrid`] proposed by an
//!   external audio analyzer, plus coarse [`SongCharacteristics`].
//! - **Targets**: four [`DifficultyTier`]s, each with a target density and a
//!   minimum playable gap ([`TierTable`]).
//! - **Outputs**: [`NoteEvent`]s, validated against the stream invariants in
//!   [`validation`], and a [`GenerationReport`] describing how they were made.
//!
//! # Example
//!
//! ```
//! use beatmapper_spec::{Band, DifficultyTier, GenerationConfig, NoteEvent, NoteRole};
//! use beatmapper_spec::validation::{validate_stream, StreamBounds};
//!
//! let config = GenerationConfig::default();
//! let tier = config.tier(DifficultyTier::Easy);
//!
//! let events = vec![
//!     NoteEvent::new(3.0, NoteRole::Accent, Band::Crash),
//!     NoteEvent::new(4.25, NoteRole::Primary, Band::Kick),
//! ];
//! let bounds = StreamBounds {
//!     start_offset: config.start_offset,
//!     duration: 10.0,
//!     min_gap: tier.min_gap,
//! };
//! assert!(validate_stream(&events, &bounds).is_ok());
//! ```

pub mod candidate;
pub mod config;
pub mod error;
pub mod event;
pub mod report;
pub mod strategy;
pub mod tier;
pub mod validation;

pub use candidate::{BeatGrid, OnsetCandidate, SelectionParameters, SongCharacteristics};
pub use config::GenerationConfig;
pub use error::{ChartError, ConfigError};
pub use event::{Band, NoteAttributes, NoteEvent, NoteRole};
pub use report::{
    AttemptOutcome, GenerationAttempt, GenerationReport, ReportWarning, WarningCode,
};
pub use strategy::{Strategy, STRATEGY_CHAIN};
pub use tier::{DifficultyTier, TierSettings, TierTable};
pub use validation::{validate_stream, InvariantCode, InvariantViolation, StreamBounds};
