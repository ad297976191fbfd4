//! Analyzer-side inputs: onset candidates, beat grids, song characteristics,
//! and the selection parameters tuned against them.

use serde::{Deserialize, Serialize};

use crate::event::Band;

/// A proposed event location with a strength and band tag.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OnsetCandidate {
    /// Candidate time in seconds.
    pub time: f64,
    /// Detection strength (non-negative).
    pub strength: f64,
    /// Frequency band.
    pub band: Band,
}

impl OnsetCandidate {
    /// Creates a candidate.
    pub fn new(time: f64, strength: f64, band: Band) -> Self {
        Self {
            time,
            strength,
            band,
        }
    }
}

/// Estimated tempo and beat positions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeatGrid {
    /// Tempo in beats per minute.
    pub tempo: f64,
    /// Beat times in seconds, ascending.
    pub beat_times: Vec<f64>,
}

impl BeatGrid {
    /// Creates a beat grid.
    pub fn new(tempo: f64, beat_times: Vec<f64>) -> Self {
        Self { tempo, beat_times }
    }

    /// Seconds per beat at this grid's tempo.
    pub fn beat_period(&self) -> f64 {
        60.0 / self.tempo
    }
}

/// Coarse song descriptors that steer density tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SongCharacteristics {
    /// Tempo in beats per minute.
    pub tempo: f64,
    /// Share of signal energy in the percussive component, 0..=1.
    pub percussive_ratio: f64,
    /// Mean RMS energy.
    pub rms_energy: f64,
}

impl Default for SongCharacteristics {
    fn default() -> Self {
        Self {
            tempo: 120.0,
            percussive_ratio: 0.5,
            rms_energy: 0.1,
        }
    }
}

/// Multipliers applied to the selector's base threshold and spacing.
///
/// Owned by a single tuning run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SelectionParameters {
    pub threshold_multiplier: f64,
    pub spacing_multiplier: f64,
}

impl SelectionParameters {
    /// Unit multipliers.
    pub const UNIT: SelectionParameters = SelectionParameters {
        threshold_multiplier: 1.0,
        spacing_multiplier: 1.0,
    };
}

impl Default for SelectionParameters {
    fn default() -> Self {
        Self::UNIT
    }
}
