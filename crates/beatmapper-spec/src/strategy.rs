//! Generation strategies and the static fallback chain.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A complete generation pipeline, identified by its candidate source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Times taken from a reference chart.
    ReferenceTiming,
    /// The analyzer's multi-band onset candidates.
    OnsetDriven,
    /// The analyzer's beat grid plus tier-dependent subdivisions.
    BeatSubdivision,
    /// A 4/4 sixteenth grid built from the analyzer tempo alone.
    TempoGrid,
    /// Fixed-tempo arithmetic grid; needs nothing but the duration.
    LastResortGrid,
}

/// Fallback table: for each strategy, the strategies to try next, in order.
///
/// [`Strategy::LastResortGrid`] is never listed; the orchestrator always
/// appends it once a chain is exhausted.
pub const STRATEGY_CHAIN: &[(Strategy, &[Strategy])] = &[
    (
        Strategy::ReferenceTiming,
        &[
            Strategy::OnsetDriven,
            Strategy::BeatSubdivision,
            Strategy::TempoGrid,
        ],
    ),
    (
        Strategy::OnsetDriven,
        &[Strategy::BeatSubdivision, Strategy::TempoGrid],
    ),
    (Strategy::BeatSubdivision, &[Strategy::TempoGrid]),
    (Strategy::TempoGrid, &[]),
    (Strategy::LastResortGrid, &[]),
];

impl Strategy {
    /// All strategies in preference order.
    pub const ALL: [Strategy; 5] = [
        Strategy::ReferenceTiming,
        Strategy::OnsetDriven,
        Strategy::BeatSubdivision,
        Strategy::TempoGrid,
        Strategy::LastResortGrid,
    ];

    /// Stable identifier used in logs, reports, and seed derivation.
    pub fn id(&self) -> &'static str {
        match self {
            Strategy::ReferenceTiming => "reference_timing",
            Strategy::OnsetDriven => "onset_driven",
            Strategy::BeatSubdivision => "beat_subdivision",
            Strategy::TempoGrid => "tempo_grid",
            Strategy::LastResortGrid => "last_resort_grid",
        }
    }

    /// Strategies to try after this one soft-fails.
    pub fn fallbacks(&self) -> &'static [Strategy] {
        STRATEGY_CHAIN
            .iter()
            .find(|(s, _)| s == self)
            .map(|(_, next)| *next)
            .unwrap_or(&[])
    }

    /// Whether this strategy runs without any analyzer or reference input.
    pub fn is_last_resort(&self) -> bool {
        matches!(self, Strategy::LastResortGrid)
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Error returned when a strategy id cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown strategy '{0}'")]
pub struct ParseStrategyError(pub String);

impl FromStr for Strategy {
    type Err = ParseStrategyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().replace('-', "_").to_ascii_lowercase();
        Strategy::ALL
            .into_iter()
            .find(|strategy| strategy.id() == wanted)
            .ok_or_else(|| ParseStrategyError(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_strategy_has_a_chain_entry() {
        for strategy in Strategy::ALL {
            assert!(
                STRATEGY_CHAIN.iter().any(|(s, _)| *s == strategy),
                "missing chain entry for {}",
                strategy
            );
        }
    }

    #[test]
    fn test_chain_never_names_last_resort_or_itself() {
        for (strategy, next) in STRATEGY_CHAIN {
            assert!(!next.contains(&Strategy::LastResortGrid));
            assert!(!next.contains(strategy));
        }
    }

    #[test]
    fn test_chain_only_moves_forward() {
        // Fallbacks are always later in preference order, so walking the
        // chain cannot cycle.
        for (strategy, next) in STRATEGY_CHAIN {
            assert!(next.iter().all(|n| n > strategy));
        }
    }

    #[test]
    fn test_parse_round_trip() {
        for strategy in Strategy::ALL {
            assert_eq!(strategy.id().parse::<Strategy>(), Ok(strategy));
        }
        assert_eq!("tempo-grid".parse::<Strategy>(), Ok(Strategy::TempoGrid));
        assert!("midi".parse::<Strategy>().is_err());
    }
}
