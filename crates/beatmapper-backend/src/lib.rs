//! BeatMapper generation backend.
//!
//! Turns analyzer output into a playable note chart for a difficulty tier.
//!
//! # Pipeline
//!
//! 1. A candidate source ([`source`]) builds an onset pool for the active
//!    [`Strategy`](beatmapper_spec::Strategy).
//! 2. The [`DensityController`] tunes the [`CandidateSelector`] until the
//!    selection density is within tolerance of the tier target.
//! 3. The [`EventClassifier`] assigns roles and export attributes.
//! 4. The [`PostProcessor`] dedupes, spaces, and range-checks the stream.
//!
//! [`GeneratorOrchestrator`] runs the pipeline per strategy and falls back
//! along the static chain when a strategy fails softly.
//!
//! # Example
//!
//! ```
//! use beatmapper_backend::{ChartOutput, GenerationRequest, GeneratorOrchestrator};
//! use beatmapper_spec::{DifficultyTier, GenerationConfig, Strategy};
//!
//! let config = GenerationConfig::default();
//! let orchestrator = GeneratorOrchestrator::new(&config);
//!
//! // No analyzer: the chain ends on the last-resort grid.
//! let output = orchestrator
//!     .generate(&GenerationRequest::new(DifficultyTier::Easy, 30.0))
//!     .unwrap();
//! assert_eq!(output.report.strategy, Strategy::LastResortGrid);
//!
//! let chart = ChartOutput::render(&output.events).unwrap();
//! assert_eq!(chart.event_count, output.events.len());
//! ```

pub mod analyzer;
pub mod chart;
pub mod classify;
pub mod density;
pub mod error;
pub mod humanize;
pub mod orchestrator;
pub mod postprocess;
pub mod rng;
pub mod select;
pub mod source;

pub use analyzer::{
    AnalysisReport, AnalyzerError, AudioAnalyzer, AudioSamples, RawOnset, ReferenceEvent,
    TimingReference,
};
pub use chart::{read_chart, write_chart, ChartOutput, ChartRecord, ChartStats, ReferenceChart};
pub use classify::EventClassifier;
pub use density::{DensityController, TuneOutcome, TuningContext};
pub use error::{GenerateError, GenerateResult};
pub use orchestrator::{
    next_strategy, Capabilities, GenerationOutput, GenerationRequest, GeneratorOrchestrator,
    OrchestratorState,
};
pub use postprocess::PostProcessor;
pub use select::CandidateSelector;
pub use source::CandidatePool;
