//! Error types for chart generation.

use beatmapper_spec::ChartError;
use thiserror::Error;

/// Result type for generation operations.
pub type GenerateResult<T> = Result<T, GenerateError>;

/// Errors that can occur while generating or writing a chart.
///
/// Only [`GenerateError::AnalysisUnavailable`] and
/// [`GenerateError::EmptyCandidatePool`] are soft: the orchestrator answers
/// them by falling back to the next strategy.
#[derive(Debug, Error)]
pub enum GenerateError {
    /// The analyzer is missing, unavailable, or failed.
    #[error("analysis unavailable: {reason}")]
    AnalysisUnavailable {
        /// Why the analysis could not be used.
        reason: String,
    },

    /// No candidate survived sourcing or selection.
    #[error("empty candidate pool ({candidates} raw candidates)")]
    EmptyCandidatePool {
        /// Number of candidates before selection.
        candidates: usize,
    },

    /// Every strategy failed, including the last-resort grid.
    #[error("all strategies exhausted after {attempts} attempt(s)")]
    AllStrategiesExhausted {
        /// Number of strategies attempted.
        attempts: usize,
    },

    /// Writing the chart to its sink failed.
    #[error("output I/O error: {0}")]
    OutputIo(#[from] std::io::Error),

    /// The request itself is malformed.
    #[error("invalid request: {message}")]
    InvalidRequest {
        /// What is wrong with the request.
        message: String,
    },

    /// Post-processing produced an empty stream for a positive duration.
    #[error("post-processing produced an empty stream for {duration:.2}s of audio")]
    EmptyStream {
        /// Requested duration in seconds.
        duration: f64,
    },

    /// A chart file could not be parsed.
    #[error("chart parse error on line {line}: {message}")]
    ChartParse {
        /// 1-based line number.
        line: usize,
        /// What went wrong.
        message: String,
    },
}

impl GenerateError {
    /// Creates an analysis-unavailable error.
    pub fn analysis_unavailable(reason: impl Into<String>) -> Self {
        Self::AnalysisUnavailable {
            reason: reason.into(),
        }
    }

    /// Creates an invalid request error.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Whether the orchestrator should fall back instead of failing.
    pub fn is_soft(&self) -> bool {
        matches!(
            self,
            GenerateError::AnalysisUnavailable { .. } | GenerateError::EmptyCandidatePool { .. }
        )
    }

    /// Candidate count behind the failure, when candidates were sourced.
    pub fn candidate_count(&self) -> Option<usize> {
        match self {
            GenerateError::EmptyCandidatePool { candidates } => Some(*candidates),
            _ => None,
        }
    }
}

impl ChartError for GenerateError {
    fn code(&self) -> &'static str {
        match self {
            GenerateError::AnalysisUnavailable { .. } => "GEN_001",
            GenerateError::EmptyCandidatePool { .. } => "GEN_002",
            GenerateError::AllStrategiesExhausted { .. } => "GEN_003",
            GenerateError::OutputIo(_) => "GEN_004",
            GenerateError::InvalidRequest { .. } => "GEN_005",
            GenerateError::EmptyStream { .. } => "GEN_006",
            GenerateError::ChartParse { .. } => "GEN_007",
        }
    }

    fn category(&self) -> &'static str {
        "generate"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_soft_classification() {
        assert!(GenerateError::analysis_unavailable("no analyzer").is_soft());
        assert!(GenerateError::EmptyCandidatePool { candidates: 0 }.is_soft());
        assert!(!GenerateError::AllStrategiesExhausted { attempts: 5 }.is_soft());
        assert!(!GenerateError::EmptyStream { duration: 10.0 }.is_soft());
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed");
        assert!(!GenerateError::from(io).is_soft());
    }

    #[test]
    fn test_candidate_count_only_for_empty_pool() {
        assert_eq!(
            GenerateError::EmptyCandidatePool { candidates: 17 }.candidate_count(),
            Some(17)
        );
        assert_eq!(GenerateError::analysis_unavailable("gone").candidate_count(), None);
    }

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(GenerateError::analysis_unavailable("x").code(), "GEN_001");
        assert_eq!(
            GenerateError::EmptyCandidatePool { candidates: 3 }.code(),
            "GEN_002"
        );
        assert_eq!(GenerateError::invalid_request("x").code(), "GEN_005");
    }

    #[test]
    fn test_io_error_message_is_verbatim() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only volume");
        let err = GenerateError::from(io);
        assert!(err.to_string().contains("read-only volume"));
    }
}
