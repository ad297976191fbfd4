//! Synthetic analyzers and analysis reports.

use std::cell::Cell;

use beatmapper_backend::{AnalysisReport, AnalyzerError, AudioAnalyzer, AudioSamples, RawOnset};
use beatmapper_spec::{DifficultyTier, GenerationConfig, StreamBounds};

/// Analyzer that returns a fixed report and counts its invocations.
#[derive(Debug)]
pub struct FixedAnalyzer {
    pub report: AnalysisReport,
    calls: Cell<usize>,
}

impl FixedAnalyzer {
    pub fn new(report: AnalysisReport) -> Self {
        Self {
            report,
            calls: Cell::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl AudioAnalyzer for FixedAnalyzer {
    fn analyze(&self, _audio: &AudioSamples<'_>) -> Result<AnalysisReport, AnalyzerError> {
        self.calls.set(self.calls.get() + 1);
        Ok(self.report.clone())
    }
}

/// Analyzer that claims availability but always errors.
#[derive(Debug, Default)]
pub struct FailingAnalyzer {
    calls: Cell<usize>,
}

impl FailingAnalyzer {
    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl AudioAnalyzer for FailingAnalyzer {
    fn analyze(&self, _audio: &AudioSamples<'_>) -> Result<AnalysisReport, AnalyzerError> {
        self.calls.set(self.calls.get() + 1);
        Err("analysis backend crashed".into())
    }
}

/// Analyzer that reports itself unavailable.
#[derive(Debug, Default)]
pub struct UnavailableAnalyzer;

impl AudioAnalyzer for UnavailableAnalyzer {
    fn available(&self) -> bool {
        false
    }

    fn analyze(&self, _audio: &AudioSamples<'_>) -> Result<AnalysisReport, AnalyzerError> {
        Err("unavailable analyzer was called".into())
    }
}

/// A report at 120 BPM with the given onsets and no beat grid.
pub fn report_with_onsets(duration: f64, onsets: Vec<RawOnset>) -> AnalysisReport {
    AnalysisReport {
        tempo: 120.0,
        beat_times: Vec::new(),
        onset_candidates: onsets,
        duration,
        percussive_ratio: None,
        rms_energy: None,
    }
}

/// `count` equally strong onsets, `step` seconds apart from `start`.
pub fn even_onsets(count: usize, start: f64, step: f64) -> Vec<RawOnset> {
    (0..count)
        .map(|i| RawOnset {
            time: start + i as f64 * step,
            strength: 1.0,
            band: (i % 5) as u32,
        })
        .collect()
}

/// Onsets from `(time, strength)` pairs, all in the kick band.
pub fn onsets_from(pairs: &[(f64, f64)]) -> Vec<RawOnset> {
    pairs
        .iter()
        .map(|&(time, strength)| RawOnset {
            time,
            strength,
            band: 0,
        })
        .collect()
}

/// Bounds every accepted stream for `tier` must satisfy.
pub fn stream_bounds(
    config: &GenerationConfig,
    tier: DifficultyTier,
    duration: f64,
) -> StreamBounds {
    StreamBounds {
        start_offset: config.effective_start(duration),
        duration,
        min_gap: config.tier(tier).min_gap,
    }
}
