//! Input loading for the CLI.
//!
//! Adapts analysis JSON files and reference charts to the backend's
//! capability traits, and resolves the generation config.

use anyhow::{bail, Context, Result};
use log::warn;
use std::fs;
use std::io::BufReader;
use std::path::Path;

use beatmapper_backend::{
    read_chart, AnalysisReport, AnalyzerError, AudioAnalyzer, AudioSamples, ReferenceChart,
};
use beatmapper_spec::{ConfigError, GenerationConfig};

/// Analyzer backed by a JSON file produced by an external analysis tool.
///
/// Loading never fails: an unreadable or malformed file leaves the analyzer
/// unavailable, so generation can still fall back to the last-resort grid.
#[derive(Debug, Clone)]
pub struct AnalysisFile {
    report: Result<AnalysisReport, String>,
}

impl AnalysisFile {
    /// Loads and parses `path`.
    pub fn load(path: &Path) -> Self {
        let report = fs::read_to_string(path)
            .map_err(|e| format!("failed to read {}: {}", path.display(), e))
            .and_then(|json| Self::parse(&json));
        if let Err(problem) = &report {
            warn!("analysis unavailable: {}", problem);
        }
        Self { report }
    }

    /// Parses an analysis document.
    pub fn from_json_str(json: &str) -> Self {
        Self {
            report: Self::parse(json),
        }
    }

    fn parse(json: &str) -> Result<AnalysisReport, String> {
        let report: AnalysisReport =
            serde_json::from_str(json).map_err(|e| format!("invalid analysis JSON: {}", e))?;
        report.check()?;
        Ok(report)
    }

    /// The parsed report, if the file was usable.
    pub fn report(&self) -> Option<&AnalysisReport> {
        self.report.as_ref().ok()
    }
}

impl AudioAnalyzer for AnalysisFile {
    fn available(&self) -> bool {
        self.report.is_ok()
    }

    fn analyze(&self, _audio: &AudioSamples<'_>) -> Result<AnalysisReport, AnalyzerError> {
        self.report.clone().map_err(AnalyzerError::from)
    }
}

/// Reads a chart CSV for use as a timing reference.
pub fn load_reference(path: &Path) -> Result<ReferenceChart> {
    let file = fs::File::open(path)
        .with_context(|| format!("Failed to open reference chart: {}", path.display()))?;
    let records = read_chart(BufReader::new(file))
        .with_context(|| format!("Failed to parse reference chart: {}", path.display()))?;
    Ok(ReferenceChart::new(records))
}

/// Resolves the track duration: explicit flag first, then the analysis.
pub fn resolve_duration(flag: Option<f64>, analysis: &AnalysisFile) -> Result<f64> {
    let duration = match (flag, analysis.report()) {
        (Some(duration), _) => duration,
        (None, Some(report)) => report.duration,
        (None, None) => bail!("--duration is required when the analysis file is unusable"),
    };
    if !(duration.is_finite() && duration > 0.0) {
        bail!("duration must be positive, got {}", duration);
    }
    Ok(duration)
}

/// Loads a config file, or resolves a named profile.
pub fn load_config(profile: &str, config_path: Option<&Path>) -> Result<GenerationConfig> {
    match config_path {
        Some(path) => GenerationConfig::from_path(path)
            .with_context(|| format!("Failed to load config: {}", path.display())),
        None => GenerationConfig::by_name(profile)
            .ok_or_else(|| ConfigError::UnknownProfile(profile.to_string()).into()),
    }
}
