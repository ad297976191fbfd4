//! Per-request bookkeeping: attempts and the final generation report.

use serde::{Deserialize, Serialize};

use crate::strategy::Strategy;
use crate::tier::DifficultyTier;

/// How a single strategy attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptOutcome {
    Success,
    SoftFailure,
    HardFailure,
}

/// One strategy attempt within an orchestration run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationAttempt {
    /// Strategy that was tried.
    pub strategy: Strategy,
    /// Result of the attempt.
    pub outcome: AttemptOutcome,
    /// Events produced (0 on failure).
    pub event_count: usize,
    /// Failure reason or error code, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl GenerationAttempt {
    /// Records a successful attempt.
    pub fn success(strategy: Strategy, event_count: usize) -> Self {
        Self {
            strategy,
            outcome: AttemptOutcome::Success,
            event_count,
            detail: None,
        }
    }

    /// Records a failed attempt.
    pub fn failure(strategy: Strategy, outcome: AttemptOutcome, detail: impl Into<String>) -> Self {
        Self {
            strategy,
            outcome,
            event_count: 0,
            detail: Some(detail.into()),
        }
    }
}

/// Warning codes attached to a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WarningCode {
    /// GEN_W001: density tuning exhausted its iterations.
    ConvergenceNotReached,
    /// GEN_W002: the chart came from a fallback strategy.
    FallbackUsed,
}

impl WarningCode {
    /// Returns the warning code string.
    pub fn code(&self) -> &'static str {
        match self {
            WarningCode::ConvergenceNotReached => "GEN_W001",
            WarningCode::FallbackUsed => "GEN_W002",
        }
    }
}

/// A non-fatal condition worth surfacing to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportWarning {
    pub code: WarningCode,
    pub message: String,
}

impl ReportWarning {
    /// Creates a warning.
    pub fn new(code: WarningCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Summary of one generation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationReport {
    /// Strategy that produced the chart.
    pub strategy: Strategy,
    /// Requested tier.
    pub tier: DifficultyTier,
    /// Number of accepted events.
    pub event_count: usize,
    /// Accepted events per second of audio.
    pub achieved_density: f64,
    /// Tier target in events per second.
    pub target_density: f64,
    /// Whether density tuning met the tolerance.
    pub converged: bool,
    /// Tuning iterations spent by the successful strategy.
    pub iterations: usize,
    /// Every attempt made, in order.
    pub attempts: Vec<GenerationAttempt>,
    /// Non-fatal conditions.
    pub warnings: Vec<ReportWarning>,
}

impl GenerationReport {
    /// Relative distance between achieved and target density.
    pub fn density_error(&self) -> f64 {
        (self.achieved_density - self.target_density).abs() / self.target_density
    }

    /// Serialises the report as pretty JSON.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
