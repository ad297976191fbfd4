//! Difficulty tiers and their density targets.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the four named difficulty tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DifficultyTier {
    Easy,
    Medium,
    Hard,
    Extreme,
}

impl DifficultyTier {
    /// All tiers, easiest first.
    pub const ALL: [DifficultyTier; 4] = [
        DifficultyTier::Easy,
        DifficultyTier::Medium,
        DifficultyTier::Hard,
        DifficultyTier::Extreme,
    ];

    /// Returns the canonical upper-case name (e.g. "EASY").
    pub fn as_str(&self) -> &'static str {
        match self {
            DifficultyTier::Easy => "EASY",
            DifficultyTier::Medium => "MEDIUM",
            DifficultyTier::Hard => "HARD",
            DifficultyTier::Extreme => "EXTREME",
        }
    }

    /// Numeric difficulty index written to chart metadata (0..=3).
    pub fn index(&self) -> u8 {
        match self {
            DifficultyTier::Easy => 0,
            DifficultyTier::Medium => 1,
            DifficultyTier::Hard => 2,
            DifficultyTier::Extreme => 3,
        }
    }

    /// Classifies an observed note density into the tier a player would
    /// perceive it as.
    ///
    /// These thresholds describe finished charts and deliberately differ
    /// from the generation targets in [`TierTable`].
    pub fn recommend(density: f64) -> DifficultyTier {
        if density >= 2.9 {
            DifficultyTier::Extreme
        } else if density >= 2.3 {
            DifficultyTier::Hard
        } else if density >= 1.7 {
            DifficultyTier::Medium
        } else {
            DifficultyTier::Easy
        }
    }
}

impl fmt::Display for DifficultyTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a tier name cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown difficulty tier '{0}' (expected easy, medium, hard, or extreme)")]
pub struct ParseTierError(pub String);

impl FromStr for DifficultyTier {
    type Err = ParseTierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(DifficultyTier::Easy),
            "medium" | "normal" => Ok(DifficultyTier::Medium),
            "hard" => Ok(DifficultyTier::Hard),
            "extreme" => Ok(DifficultyTier::Extreme),
            _ => Err(ParseTierError(s.to_string())),
        }
    }
}

/// Density target and playability gap for a single tier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TierSettings {
    /// Target note density in notes per second.
    pub target_density: f64,
    /// Minimum gap between two consecutive output events, in seconds.
    pub min_gap: f64,
}

/// Per-tier settings, one entry per [`DifficultyTier`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TierTable {
    pub easy: TierSettings,
    pub medium: TierSettings,
    pub hard: TierSettings,
    pub extreme: TierSettings,
}

impl Default for TierTable {
    fn default() -> Self {
        Self {
            easy: TierSettings {
                target_density: 0.8,
                min_gap: 0.1,
            },
            medium: TierSettings {
                target_density: 1.5,
                min_gap: 0.1,
            },
            hard: TierSettings {
                target_density: 2.5,
                min_gap: 0.075,
            },
            extreme: TierSettings {
                target_density: 4.0,
                min_gap: 0.05,
            },
        }
    }
}

impl TierTable {
    /// Returns the settings for a tier.
    pub fn get(&self, tier: DifficultyTier) -> &TierSettings {
        match tier {
            DifficultyTier::Easy => &self.easy,
            DifficultyTier::Medium => &self.medium,
            DifficultyTier::Hard => &self.hard,
            DifficultyTier::Extreme => &self.extreme,
        }
    }

    /// Iterates `(tier, settings)` pairs, easiest first.
    pub fn iter(&self) -> impl Iterator<Item = (DifficultyTier, &TierSettings)> {
        DifficultyTier::ALL.into_iter().map(move |t| (t, self.get(t)))
    }
}
