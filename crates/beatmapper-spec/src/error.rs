//! Error types shared across BeatMapper crates.

use thiserror::Error;

/// Common trait for errors raised anywhere in the chart pipeline.
///
/// Implementors expose a stable code (e.g. "GEN_002") and a category so
/// callers can report failures uniformly without matching on concrete
/// error types.
///
/// # Example
///
/// ```
/// use beatmapper_spec::error::ChartError;
///
/// fn describe<E: ChartError>(err: &E) -> String {
///     format!("[{}] {}", err.code(), err.message())
/// }
/// ```
pub trait ChartError: std::error::Error {
    /// Stable error code for reporting.
    fn code(&self) -> &'static str;

    /// Human-readable message.
    fn message(&self) -> String {
        self.to_string()
    }

    /// Error category ("config", "generate", ...).
    fn category(&self) -> &'static str;
}

/// Errors raised while loading or validating a [`GenerationConfig`].
///
/// [`GenerationConfig`]: crate::config::GenerationConfig
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A numeric setting is outside its valid range.
    #[error("invalid config value '{field}': {message}")]
    InvalidValue {
        /// Setting name.
        field: String,
        /// What is wrong with it.
        message: String,
    },

    /// Unknown profile name.
    #[error("unknown config profile '{0}' (expected default, strict, or relaxed)")]
    UnknownProfile(String),

    /// JSON parsing error.
    #[error("config parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConfigError {
    /// Creates an invalid value error.
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl ChartError for ConfigError {
    fn code(&self) -> &'static str {
        match self {
            ConfigError::InvalidValue { .. } => "CONFIG_001",
            ConfigError::UnknownProfile(_) => "CONFIG_002",
            ConfigError::Parse(_) => "CONFIG_003",
            ConfigError::Io(_) => "CONFIG_004",
        }
    }

    fn category(&self) -> &'static str {
        "config"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_helper() {
        let err = ConfigError::invalid("tolerance", "must be positive");
        assert_eq!(err.code(), "CONFIG_001");
        assert!(err.message().contains("tolerance"));
        assert!(err.message().contains("must be positive"));
    }

    #[test]
    fn test_category() {
        assert_eq!(ConfigError::UnknownProfile("x".into()).category(), "config");
    }
}
