//! Candidate sources, one per strategy.
//!
//! Each source turns whatever its strategy relies on (analyzer onsets, the
//! beat grid, bare tempo, a reference chart, or nothing at all) into a list
//! of [`OnsetCandidate`]s. [`CandidatePool`] then windows, sorts, and
//! normalises the list before it reaches the density controller.

use beatmapper_spec::event::quantize_up;
use beatmapper_spec::{Band, BeatGrid, DifficultyTier, GenerationConfig, OnsetCandidate};

use crate::analyzer::ReferenceEvent;

/// Beats per bar assumed by the grid sources.
pub const BEATS_PER_BAR: usize = 4;

/// Onsets closer than this to a grid point lend it their band and strength.
pub const ONSET_SNAP_WINDOW: f64 = 0.05;

/// Candidates for one strategy, ready for tuning.
///
/// Sorted by time, restricted to the playable window, with strengths
/// normalised so the strongest candidate is 1.0.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandidatePool {
    candidates: Vec<OnsetCandidate>,
}

impl CandidatePool {
    /// Builds a pool from raw candidates for the window `[start, end)`.
    ///
    /// # Arguments
    /// * `raw` - Candidates in any order; non-finite or negative entries are dropped
    /// * `start` - First playable time in seconds
    /// * `end` - Track duration in seconds, exclusive
    pub fn new(raw: Vec<OnsetCandidate>, start: f64, end: f64) -> Self {
        let mut candidates: Vec<OnsetCandidate> = raw
            .into_iter()
            .filter(|c| c.time.is_finite() && c.strength.is_finite() && c.strength >= 0.0)
            .filter(|c| c.time >= start && c.time < end)
            .collect();
        candidates.sort_by(|a, b| a.time.total_cmp(&b.time));

        let peak = candidates.iter().map(|c| c.strength).fold(0.0, f64::max);
        if peak > 0.0 {
            for candidate in &mut candidates {
                candidate.strength /= peak;
            }
        }
        Self { candidates }
    }

    /// Windowed candidates, ascending by time.
    pub fn candidates(&self) -> &[OnsetCandidate] {
        &self.candidates
    }

    /// Number of candidates in the window.
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    /// Whether no candidate fell inside the window.
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Band of the strongest candidate at exactly `time`, or kick if none.
    pub fn band_at(&self, time: f64) -> Band {
        let from = self.candidates.partition_point(|c| c.time < time);
        self.candidates[from..]
            .iter()
            .take_while(|c| c.time == time)
            .fold(None::<&OnsetCandidate>, |best, c| match best {
                Some(b) if b.strength >= c.strength => Some(b),
                _ => Some(c),
            })
            .map_or(Band::Kick, |c| c.band)
    }
}

/// Candidates from a reference chart, all at full strength.
pub fn reference_candidates(events: &[ReferenceEvent]) -> Vec<OnsetCandidate> {
    events
        .iter()
        .map(|e| OnsetCandidate::new(e.time, 1.0, e.band))
        .collect()
}

/// Beats and tier-dependent subdivisions of the beat grid.
///
/// Downbeats score 1.0 and other beats 0.9. Half beats (0.6) join from
/// medium, quarter beats (0.45) from hard, and eighth beats (0.3) at
/// extreme. A grid point with an onset inside [`ONSET_SNAP_WINDOW`] takes
/// the onset's band and, if higher, its normalised strength.
pub fn beat_subdivisions(
    grid: &BeatGrid,
    onsets: &[OnsetCandidate],
    tier: DifficultyTier,
) -> Vec<OnsetCandidate> {
    let beats = &grid.beat_times;
    if beats.len() < 2 {
        return Vec::new();
    }

    let mut points: Vec<OnsetCandidate> = Vec::new();
    for (i, &beat) in beats.iter().enumerate() {
        let (band, strength) = if i % BEATS_PER_BAR == 0 {
            (Band::Kick, 1.0)
        } else if i % 2 == 1 {
            (Band::Snare, 0.9)
        } else {
            (Band::Kick, 0.9)
        };
        points.push(OnsetCandidate::new(beat, strength, band));

        let Some(&next) = beats.get(i + 1) else {
            break;
        };
        let span = next - beat;
        if !(span > 0.0) {
            continue;
        }
        for (fraction, strength, min_tier) in SUBDIVISIONS {
            if tier >= *min_tier {
                let time = beat + span * fraction;
                points.push(OnsetCandidate::new(time, *strength, Band::HiHat));
            }
        }
    }

    snap_to_onsets(points, onsets)
}

const SUBDIVISIONS: &[(f64, f64, DifficultyTier)] = &[
    (0.5, 0.6, DifficultyTier::Medium),
    (0.25, 0.45, DifficultyTier::Hard),
    (0.75, 0.45, DifficultyTier::Hard),
    (0.125, 0.3, DifficultyTier::Extreme),
    (0.375, 0.3, DifficultyTier::Extreme),
    (0.625, 0.3, DifficultyTier::Extreme),
    (0.875, 0.3, DifficultyTier::Extreme),
];

fn snap_to_onsets(
    mut points: Vec<OnsetCandidate>,
    onsets: &[OnsetCandidate],
) -> Vec<OnsetCandidate> {
    if onsets.is_empty() {
        return points;
    }
    let mut sorted: Vec<OnsetCandidate> = onsets.to_vec();
    sorted.sort_by(|a, b| a.time.total_cmp(&b.time));
    let peak = sorted.iter().map(|o| o.strength).fold(0.0, f64::max);

    for point in &mut points {
        let at = sorted.partition_point(|o| o.time < point.time);
        let nearest = [at.checked_sub(1), Some(at)]
            .into_iter()
            .flatten()
            .filter_map(|i| sorted.get(i))
            .min_by(|a, b| {
                (a.time - point.time)
                    .abs()
                    .total_cmp(&(b.time - point.time).abs())
            });
        if let Some(onset) = nearest {
            if (onset.time - point.time).abs() <= ONSET_SNAP_WINDOW {
                point.band = onset.band;
                if peak > 0.0 {
                    point.strength = point.strength.max(onset.strength / peak);
                }
            }
        }
    }
    points
}

/// A 4/4 sixteenth-note grid at `tempo`, phase-locked to `phase`.
///
/// Covers `[start, end)`. Downbeats are kicks at 1.0 (a crash every fourth
/// bar), backbeats are snares at 0.85, other beats kicks at 0.8, eighths
/// hi-hats at 0.5, and the remaining sixteenths hi-hats at 0.3.
pub fn tempo_grid(tempo: f64, phase: f64, start: f64, end: f64) -> Vec<OnsetCandidate> {
    if !(tempo.is_finite() && tempo > 0.0) || !(end > start) {
        return Vec::new();
    }
    let sixteenth = 60.0 / tempo / 4.0;
    let steps_per_bar = (BEATS_PER_BAR * 4) as i64;
    let first = ((start - phase) / sixteenth).ceil() as i64;

    let mut out = Vec::new();
    let mut step = first;
    loop {
        let time = phase + step as f64 * sixteenth;
        if time >= end {
            break;
        }
        let position = step.rem_euclid(steps_per_bar);
        let bar = step.div_euclid(steps_per_bar);
        let (band, strength) = match position {
            0 if bar % 4 == 0 => (Band::Crash, 1.0),
            0 => (Band::Kick, 1.0),
            4 | 12 => (Band::Snare, 0.85),
            8 => (Band::Kick, 0.8),
            p if p % 2 == 0 => (Band::HiHat, 0.5),
            _ => (Band::HiHat, 0.3),
        };
        if time >= start {
            out.push(OnsetCandidate::new(time, strength, band));
        }
        step += 1;
    }
    out
}

/// Evenly spaced times for the last-resort grid.
///
/// The spacing is the tier's target interval rounded to whole sixteenths at
/// the fallback tempo, never shorter than one sixteenth or the tier gap. The
/// grid starts on the first output time step inside the playable window.
///
/// # Arguments
/// * `config` - Supplies the fallback tempo, lead-in, and tier targets
/// * `tier` - Difficulty whose density and gap set the spacing
/// * `duration` - Track length in seconds
///
/// # Returns
/// Ascending times in `[start, duration)`; empty only when `duration` is not positive
pub fn last_resort_times(
    config: &GenerationConfig,
    tier: DifficultyTier,
    duration: f64,
) -> Vec<f64> {
    let spacing = last_resort_spacing(config, tier);
    // The first point must survive quantisation without falling below the window.
    let start = quantize_up(config.effective_start(duration));
    (0..)
        .map(|k| start + k as f64 * spacing)
        .take_while(|&t| t < duration)
        .collect()
}

fn last_resort_sixteenth(config: &GenerationConfig) -> f64 {
    60.0 / config.fallback_tempo / 4.0
}

/// Spacing in seconds between last-resort events.
pub fn last_resort_spacing(config: &GenerationConfig, tier: DifficultyTier) -> f64 {
    let settings = config.tier(tier);
    let sixteenth = last_resort_sixteenth(config);
    let by_target = (1.0 / settings.target_density / sixteenth).round();
    let by_gap = (settings.min_gap / sixteenth).ceil();
    by_target.max(by_gap).max(1.0) * sixteenth
}
