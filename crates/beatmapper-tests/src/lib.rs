//! BeatMapper End-to-End Test Infrastructure
//!
//! This crate holds integration tests for the generation pipeline:
//!
//! - **Scenarios**: dense pools, analyzer failure, near-duplicate onsets
//! - **Invariants**: property tests over synthetic candidate pools
//! - **Determinism**: byte-identical charts for identical seeds
//! - **CLI**: analysis file in, chart file out, chart inspected back
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p beatmapper-tests
//! ```

pub mod determinism;
pub mod fixtures;
