//! Generation configuration and named profiles.
//!
//! Configuration is loaded once and then shared read-only by every request.
//! Profiles mirror the usual pattern: a `Default` baseline, a few named
//! variants resolved through [`GenerationConfig::by_name`], and JSON files
//! that override individual fields.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::ConfigError;
use crate::event::quantize_up;
use crate::tier::{DifficultyTier, TierSettings, TierTable};

/// Tunables for one generation pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Profile identifier (e.g. "default", "strict").
    pub name: String,
    /// Intro margin skipped at the start of every chart, in seconds.
    pub start_offset: f64,
    /// Relative density tolerance shared by all tiers.
    pub tolerance: f64,
    /// Maximum density tuning iterations.
    pub max_iterations: usize,
    /// Base strength threshold before multipliers, on normalised strengths.
    pub base_threshold: f64,
    /// Timestamps closer than this collapse into one event.
    pub dedupe_epsilon: f64,
    /// Tempo assumed by the last-resort grid, in BPM.
    pub fallback_tempo: f64,
    /// Maximum micro-timing jitter in seconds; 0 disables humanisation.
    pub humanize_amount: f64,
    /// Clamp for the density ratio used while tuning.
    pub max_density_ratio: f64,
    /// Per-tier targets.
    pub tiers: TierTable,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            start_offset: Self::DEFAULT_START_OFFSET,
            tolerance: Self::DEFAULT_TOLERANCE,
            max_iterations: Self::DEFAULT_MAX_ITERATIONS,
            base_threshold: Self::DEFAULT_BASE_THRESHOLD,
            dedupe_epsilon: Self::DEFAULT_DEDUPE_EPSILON,
            fallback_tempo: Self::DEFAULT_FALLBACK_TEMPO,
            humanize_amount: 0.0,
            max_density_ratio: Self::DEFAULT_MAX_DENSITY_RATIO,
            tiers: TierTable::default(),
        }
    }
}

impl GenerationConfig {
    /// Default intro margin in seconds.
    pub const DEFAULT_START_OFFSET: f64 = 3.0;

    /// Default density tolerance (±10%).
    pub const DEFAULT_TOLERANCE: f64 = 0.1;

    /// Default tuning iteration bound.
    pub const DEFAULT_MAX_ITERATIONS: usize = 5;

    /// Default base strength threshold.
    pub const DEFAULT_BASE_THRESHOLD: f64 = 0.3;

    /// Default dedupe window in seconds.
    pub const DEFAULT_DEDUPE_EPSILON: f64 = 0.001;

    /// Default last-resort tempo in BPM.
    pub const DEFAULT_FALLBACK_TEMPO: f64 = 120.0;

    /// Default density ratio clamp.
    pub const DEFAULT_MAX_DENSITY_RATIO: f64 = 8.0;

    /// Returns the strict profile: tighter tolerance, more iterations.
    pub fn strict() -> Self {
        Self {
            name: "strict".to_string(),
            tolerance: 0.05,
            max_iterations: 8,
            ..Default::default()
        }
    }

    /// Returns the relaxed profile: wider tolerance and light humanisation.
    pub fn relaxed() -> Self {
        Self {
            name: "relaxed".to_string(),
            tolerance: 0.2,
            humanize_amount: 0.02,
            ..Default::default()
        }
    }

    /// Looks up a profile by name.
    pub fn by_name(name: &str) -> Option<Self> {
        match name {
            "default" => Some(Self::default()),
            "strict" => Some(Self::strict()),
            "relaxed" => Some(Self::relaxed()),
            _ => None,
        }
    }

    /// Parses a config from JSON; absent fields keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: GenerationConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a JSON config file.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Returns the settings for a tier.
    pub fn tier(&self, tier: DifficultyTier) -> &TierSettings {
        self.tiers.get(tier)
    }

    /// Start of the playable window for a track of `duration` seconds.
    ///
    /// The window must hold at least one output time step past the lead-in;
    /// shorter tracks start at zero so they still get a chart.
    pub fn effective_start(&self, duration: f64) -> f64 {
        if duration > quantize_up(self.start_offset) {
            self.start_offset
        } else {
            0.0
        }
    }

    /// Checks that every setting is in range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.start_offset >= 0.0 && self.start_offset.is_finite()) {
            return Err(ConfigError::invalid(
                "start_offset",
                format!("must be finite and >= 0, got {}", self.start_offset),
            ));
        }
        if !(self.tolerance > 0.0 && self.tolerance < 1.0) {
            return Err(ConfigError::invalid(
                "tolerance",
                format!("must be in (0, 1), got {}", self.tolerance),
            ));
        }
        if self.max_iterations == 0 {
            return Err(ConfigError::invalid("max_iterations", "must be at least 1"));
        }
        if !(self.base_threshold >= 0.0 && self.base_threshold <= 1.0) {
            return Err(ConfigError::invalid(
                "base_threshold",
                format!("must be in [0, 1], got {}", self.base_threshold),
            ));
        }
        if !(self.dedupe_epsilon > 0.0) {
            return Err(ConfigError::invalid("dedupe_epsilon", "must be positive"));
        }
        if !(self.fallback_tempo > 0.0 && self.fallback_tempo.is_finite()) {
            return Err(ConfigError::invalid(
                "fallback_tempo",
                format!("must be positive, got {}", self.fallback_tempo),
            ));
        }
        if !(self.humanize_amount >= 0.0 && self.humanize_amount.is_finite()) {
            return Err(ConfigError::invalid(
                "humanize_amount",
                "must be finite and >= 0",
            ));
        }
        if !(self.max_density_ratio >= 1.0) {
            return Err(ConfigError::invalid("max_density_ratio", "must be >= 1"));
        }
        for (tier, settings) in self.tiers.iter() {
            if !(settings.target_density > 0.0 && settings.target_density.is_finite()) {
                return Err(ConfigError::invalid(
                    format!("tiers.{}.target_density", tier.as_str().to_ascii_lowercase()),
                    "must be positive",
                ));
            }
            if !(settings.min_gap > self.dedupe_epsilon) {
                return Err(ConfigError::invalid(
                    format!("tiers.{}.min_gap", tier.as_str().to_ascii_lowercase()),
                    "must exceed dedupe_epsilon",
                ));
            }
        }
        Ok(())
    }
}
