//! Iterative density tuning.
//!
//! The controller runs the selector repeatedly, recomputing the selection
//! multipliers from the latest density estimate each time, until the
//! achieved density lands within tolerance of the tier target or the
//! iteration limit runs out. Running out is reported, never hidden.

use log::{debug, warn};

use beatmapper_spec::{
    DifficultyTier, GenerationConfig, OnsetCandidate, SelectionParameters, SongCharacteristics,
};

use crate::error::{GenerateError, GenerateResult};
use crate::select::{thin_evenly, CandidateSelector};

/// Floor applied to the density estimate before taking ratios.
pub const RAW_DENSITY_FLOOR: f64 = 0.1;

/// Percussive share above which the threshold is raised.
pub const PERCUSSIVE_CUTOFF: f64 = 0.7;

/// RMS energy below which the threshold is lowered.
pub const QUIET_RMS_CUTOFF: f64 = 0.05;

/// Inputs that steer one tuning run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TuningContext {
    /// Track length in seconds.
    pub duration: f64,
    /// Tempo in BPM, if known.
    pub tempo: Option<f64>,
    pub percussive_ratio: f64,
    pub rms_energy: f64,
}

impl TuningContext {
    /// Context with default characteristics and no tempo.
    pub fn new(duration: f64) -> Self {
        let defaults = SongCharacteristics::default();
        Self {
            duration,
            tempo: None,
            percussive_ratio: defaults.percussive_ratio,
            rms_energy: defaults.rms_energy,
        }
    }

    /// Context built from analyzer characteristics.
    pub fn from_characteristics(duration: f64, characteristics: &SongCharacteristics) -> Self {
        Self {
            duration,
            tempo: Some(characteristics.tempo),
            percussive_ratio: characteristics.percussive_ratio,
            rms_energy: characteristics.rms_energy,
        }
    }

    /// Base selector spacing: half a beat, never below the tier's gap.
    pub fn base_spacing(&self, min_gap: f64) -> f64 {
        match self.tempo {
            Some(tempo) if tempo.is_finite() && tempo > 0.0 => {
                (60.0 / (tempo * 2.0)).max(min_gap)
            }
            _ => min_gap,
        }
    }
}

/// Result of a tuning run.
#[derive(Debug, Clone, PartialEq)]
pub struct TuneOutcome {
    /// Multipliers used by the final iteration.
    pub params: SelectionParameters,
    /// Selected times per second of audio.
    pub achieved_density: f64,
    /// Whether the density is within tolerance of the target.
    pub converged: bool,
    /// Iterations spent, never more than the configured maximum.
    pub iterations: usize,
    /// Selected times, ascending.
    pub times: Vec<f64>,
}

/// Steers the selector toward a tier's target density.
#[derive(Debug, Clone)]
pub struct DensityController<'a> {
    config: &'a GenerationConfig,
    selector: CandidateSelector,
}

impl<'a> DensityController<'a> {
    /// Creates a controller for a config.
    pub fn new(config: &'a GenerationConfig) -> Self {
        Self {
            config,
            selector: CandidateSelector::new(config.base_threshold),
        }
    }

    /// Multipliers for a density estimate, before characteristic corrections.
    ///
    /// Multipliers always restart from 1.0; nothing carries over from the
    /// previous iteration except the estimate itself.
    pub fn adjust(&self, estimate: f64, target: f64) -> SelectionParameters {
        let raw = estimate.max(RAW_DENSITY_FLOOR);
        let cap = self.config.max_density_ratio;
        let ratio = (target / raw).clamp(1.0 / cap, cap);
        let scale = if ratio < 1.0 { 1.0 / ratio } else { ratio };
        SelectionParameters {
            threshold_multiplier: scale,
            spacing_multiplier: scale,
        }
    }

    /// Applies song-characteristic corrections to the threshold.
    pub fn correct(
        &self,
        mut params: SelectionParameters,
        context: &TuningContext,
    ) -> SelectionParameters {
        if context.percussive_ratio > PERCUSSIVE_CUTOFF {
            params.threshold_multiplier *= 1.2;
        }
        if context.rms_energy < QUIET_RMS_CUTOFF {
            params.threshold_multiplier *= 0.8;
        }
        params
    }

    /// Tunes selection over `candidates` for `tier`.
    ///
    /// When a selection overshoots the upper tolerance bound it is thinned
    /// evenly to the target count. An empty selection is retried once with
    /// unit multipliers within the same iteration; if that is empty too the
    /// run ends with [`GenerateError::EmptyCandidatePool`].
    ///
    /// # Arguments
    /// * `candidates` - Windowed, normalised pool
    /// * `tier` - Difficulty whose target density is tracked
    /// * `context` - Duration, tempo, and song characteristics
    ///
    /// # Returns
    /// The converged outcome, or the last one with `iterations` equal to the
    /// configured maximum when no iteration landed within tolerance.
    pub fn tune(
        &self,
        candidates: &[OnsetCandidate],
        tier: DifficultyTier,
        context: &TuningContext,
    ) -> GenerateResult<TuneOutcome> {
        if !(context.duration.is_finite() && context.duration > 0.0) {
            return Err(GenerateError::invalid_request(format!(
                "duration must be positive, got {}",
                context.duration
            )));
        }

        let settings = self.config.tier(tier);
        let target = settings.target_density;
        let tolerance = self.config.tolerance;
        let duration = context.duration;
        let spacing = context.base_spacing(settings.min_gap);
        let target_count = ((target * duration).round() as usize).max(1);
        let upper = target * (1.0 + tolerance);

        let mut estimate = candidates.len() as f64 / duration;
        let mut last: Option<TuneOutcome> = None;

        for iteration in 1..=self.config.max_iterations {
            let mut params = self.correct(self.adjust(estimate, target), context);
            let mut times = self.selector.select(candidates, &params, spacing);
            if times.is_empty() {
                debug!(
                    "iteration {}: empty selection from {} candidates, retrying with unit multipliers",
                    iteration,
                    candidates.len()
                );
                params = SelectionParameters::UNIT;
                times = self.selector.select(candidates, &params, spacing);
                if times.is_empty() {
                    return Err(GenerateError::EmptyCandidatePool {
                        candidates: candidates.len(),
                    });
                }
            }

            if times.len() as f64 / duration > upper {
                times = thin_evenly(&times, target_count);
            }

            let achieved = times.len() as f64 / duration;
            let error = (achieved - target).abs() / target;
            debug!(
                "iteration {}: threshold x{:.3}, spacing x{:.3}, {} events, {:.3}/s (target {:.3}/s, error {:.1}%)",
                iteration,
                params.threshold_multiplier,
                params.spacing_multiplier,
                times.len(),
                achieved,
                target,
                error * 100.0
            );

            let converged = error <= tolerance;
            let outcome = TuneOutcome {
                params,
                achieved_density: achieved,
                converged,
                iterations: iteration,
                times,
            };
            if converged {
                return Ok(outcome);
            }
            estimate = achieved;
            last = Some(outcome);
        }

        match last {
            Some(mut outcome) => {
                outcome.iterations = self.config.max_iterations;
                warn!(
                    "density did not converge for {} after {} iterations: {} candidates, {:.3}/s vs target {:.3}/s",
                    tier,
                    outcome.iterations,
                    candidates.len(),
                    outcome.achieved_density,
                    target
                );
                Ok(outcome)
            }
            None => Err(GenerateError::EmptyCandidatePool {
                candidates: candidates.len(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beatmapper_spec::Band;

    fn even_pool(count: usize, step: f64, strength: f64) -> Vec<OnsetCandidate> {
        (0..count)
            .map(|i| OnsetCandidate::new(i as f64 * step, strength, Band::Kick))
            .collect()
    }

    #[test]
    fn test_easy_converges_on_even_pool() {
        let config = GenerationConfig::default();
        let controller = DensityController::new(&config);
        let pool = even_pool(200, 0.5, 1.0);

        let outcome = controller
            .tune(&pool, DifficultyTier::Easy, &TuningContext::new(100.0))
            .unwrap();

        assert!(outcome.converged);
        assert!((72..=88).contains(&outcome.times.len()), "{}", outcome.times.len());
        assert!(outcome.iterations <= config.max_iterations);
    }

    #[test]
    fn test_adjust_scales_symmetrically_by_ratio() {
        let config = GenerationConfig::default();
        let controller = DensityController::new(&config);

        let too_many = controller.adjust(2.0, 0.8);
        assert!((too_many.threshold_multiplier - 2.5).abs() < 1e-12);
        assert_eq!(too_many.threshold_multiplier, too_many.spacing_multiplier);

        let too_few = controller.adjust(0.5, 1.5);
        assert!((too_few.threshold_multiplier - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_adjust_clamps_ratio() {
        let config = GenerationConfig::default();
        let controller = DensityController::new(&config);
        let params = controller.adjust(1000.0, 0.8);
        assert_eq!(params.threshold_multiplier, config.max_density_ratio);
    }

    #[test]
    fn test_estimate_floor_avoids_division_blowup() {
        let config = GenerationConfig::default();
        let controller = DensityController::new(&config);
        let params = controller.adjust(0.0, 0.8);
        assert!((params.threshold_multiplier - 8.0).abs() < 1e-12);
    }

    #[test]
    fn test_corrections() {
        let config = GenerationConfig::default();
        let controller = DensityController::new(&config);
        let mut context = TuningContext::new(10.0);
        context.percussive_ratio = 0.9;
        let params = controller.correct(SelectionParameters::UNIT, &context);
        assert!((params.threshold_multiplier - 1.2).abs() < 1e-12);
        assert_eq!(params.spacing_multiplier, 1.0);

        context.percussive_ratio = 0.5;
        context.rms_energy = 0.01;
        let params = controller.correct(SelectionParameters::UNIT, &context);
        assert!((params.threshold_multiplier - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_sparse_pool_reports_non_convergence() {
        let config = GenerationConfig::default();
        let controller = DensityController::new(&config);
        let pool = even_pool(5, 10.0, 1.0);

        let outcome = controller
            .tune(&pool, DifficultyTier::Extreme, &TuningContext::new(60.0))
            .unwrap();

        assert!(!outcome.converged);
        assert_eq!(outcome.iterations, config.max_iterations);
        assert!(!outcome.times.is_empty());
    }

    #[test]
    fn test_empty_pool_is_soft_error() {
        let config = GenerationConfig::default();
        let controller = DensityController::new(&config);
        let err = controller
            .tune(&[], DifficultyTier::Easy, &TuningContext::new(30.0))
            .unwrap_err();
        assert!(matches!(err, GenerateError::EmptyCandidatePool { candidates: 0 }));
        assert!(err.is_soft());
    }

    #[test]
    fn test_unit_retry_recovers_from_overshooting_threshold() {
        let config = GenerationConfig::default();
        let controller = DensityController::new(&config);
        // 0.5 strength clears the base threshold but not a x2.5 multiplier.
        let pool = even_pool(200, 0.5, 0.5);

        let outcome = controller
            .tune(&pool, DifficultyTier::Easy, &TuningContext::new(100.0))
            .unwrap();

        assert!(outcome.converged);
        assert_eq!(outcome.params, SelectionParameters::UNIT);
        assert_eq!(outcome.iterations, 1);
    }

    #[test]
    fn test_base_spacing_uses_half_beat() {
        let mut context = TuningContext::new(10.0);
        context.tempo = Some(120.0);
        assert_eq!(context.base_spacing(0.1), 0.25);
        assert_eq!(context.base_spacing(0.3), 0.3);
        context.tempo = None;
        assert_eq!(context.base_spacing(0.1), 0.1);
    }

    #[test]
    fn test_rejects_non_positive_duration() {
        let config = GenerationConfig::default();
        let controller = DensityController::new(&config);
        let pool = even_pool(10, 1.0, 1.0);
        let err = controller
            .tune(&pool, DifficultyTier::Easy, &TuningContext::new(0.0))
            .unwrap_err();
        assert!(matches!(err, GenerateError::InvalidRequest { .. }));
    }
}
