//! Strategy selection and fallback.
//!
//! [`GeneratorOrchestrator::generate`] checks the analyzer and reference once,
//! picks a starting [`Strategy`], and walks the static fallback chain until a
//! strategy produces a non-empty stream. The last-resort grid closes every
//! chain, so a request with a positive duration always yields events.
//!
//! All per-request state (attempted strategies, attempt log, memoised
//! analysis) lives in an [`OrchestrationRun`] owned by the `generate` call.

use std::collections::BTreeSet;

use log::{debug, error, info, warn};

use beatmapper_spec::{
    AttemptOutcome, Band, ChartError, DifficultyTier, GenerationAttempt, GenerationConfig,
    GenerationReport, NoteEvent, ReportWarning, Strategy, WarningCode,
};

use crate::analyzer::{
    AnalysisReport, AudioAnalyzer, AudioSamples, ReferenceEvent, TimingReference,
};
use crate::classify::EventClassifier;
use crate::density::{DensityController, TuningContext};
use crate::error::{GenerateError, GenerateResult};
use crate::humanize::humanize;
use crate::postprocess::PostProcessor;
use crate::rng::create_strategy_rng;
use crate::source::{self, CandidatePool};

/// One generation request.
#[derive(Debug, Clone, Copy)]
pub struct GenerationRequest<'a> {
    /// Difficulty to chart.
    pub tier: DifficultyTier,
    /// Track length in seconds.
    pub duration: f64,
    /// Seed for every random draw in this request.
    pub seed: u32,
    /// Audio handed to the analyzer.
    pub audio: AudioSamples<'a>,
    /// Overrides the detected starting strategy.
    pub start_with: Option<Strategy>,
}

impl GenerationRequest<'static> {
    /// A request without samples, for analyzers that need none.
    pub fn new(tier: DifficultyTier, duration: f64) -> Self {
        Self {
            tier,
            duration,
            seed: 0,
            audio: AudioSamples::empty(),
            start_with: None,
        }
    }
}

impl<'a> GenerationRequest<'a> {
    /// Sets the seed used for humanisation.
    pub fn with_seed(mut self, seed: u32) -> Self {
        self.seed = seed;
        self
    }

    /// Attaches audio for the analyzer.
    ///
    /// # Arguments
    /// * `audio` - Samples the analyzer runs on; may outlive `self` or not
    ///
    /// # Returns
    /// The same request borrowing `audio` instead
    pub fn with_audio<'b>(self, audio: AudioSamples<'b>) -> GenerationRequest<'b> {
        GenerationRequest {
            tier: self.tier,
            duration: self.duration,
            seed: self.seed,
            audio,
            start_with: self.start_with,
        }
    }

    /// Starts the fallback chain at `strategy` instead of the detected one.
    pub fn starting_with(mut self, strategy: Strategy) -> Self {
        self.start_with = Some(strategy);
        self
    }
}

/// A finished chart and the report describing how it was made.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationOutput {
    /// Finished, validated events.
    pub events: Vec<NoteEvent>,
    pub report: GenerationReport,
}

/// Orchestrator state for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrchestratorState {
    NotStarted,
    Attempting(Strategy),
    Succeeded(Strategy),
    ExhaustedFallback,
}

/// Result of the once-per-request capability check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    pub analyzer: bool,
    pub reference: bool,
}

impl Capabilities {
    /// Starting strategy implied by the available capabilities.
    pub fn initial_strategy(&self) -> Strategy {
        if self.reference {
            Strategy::ReferenceTiming
        } else if self.analyzer {
            Strategy::OnsetDriven
        } else {
            Strategy::BeatSubdivision
        }
    }
}

/// Request-scoped bookkeeping.
#[derive(Debug)]
pub struct OrchestrationRun {
    state: OrchestratorState,
    attempted: BTreeSet<Strategy>,
    attempts: Vec<GenerationAttempt>,
    analysis: Option<Result<AnalysisReport, String>>,
}

impl OrchestrationRun {
    fn new() -> Self {
        Self {
            state: OrchestratorState::NotStarted,
            attempted: BTreeSet::new(),
            attempts: Vec::new(),
            analysis: None,
        }
    }

    pub fn attempts(&self) -> &[GenerationAttempt] {
        &self.attempts
    }

    fn transition(&mut self, next: OrchestratorState) {
        debug!("orchestrator: {:?} -> {:?}", self.state, next);
        self.state = next;
    }
}

/// Next strategy after `failed`: the first untried entry of its chain, then
/// the last-resort grid if it has not run yet.
pub fn next_strategy(failed: Strategy, attempted: &BTreeSet<Strategy>) -> Option<Strategy> {
    failed
        .fallbacks()
        .iter()
        .copied()
        .chain(std::iter::once(Strategy::LastResortGrid))
        .find(|s| !attempted.contains(s))
}

struct StrategyOutcome {
    events: Vec<NoteEvent>,
    achieved_density: f64,
    converged: bool,
    iterations: usize,
}

/// Drives strategies until one yields a chart.
pub struct GeneratorOrchestrator<'a> {
    config: &'a GenerationConfig,
    analyzer: Option<&'a dyn AudioAnalyzer>,
    reference: Option<&'a dyn TimingReference>,
    classifier: EventClassifier,
}

impl<'a> GeneratorOrchestrator<'a> {
    /// Creates an orchestrator with no analyzer and no reference.
    pub fn new(config: &'a GenerationConfig) -> Self {
        Self {
            config,
            analyzer: None,
            reference: None,
            classifier: EventClassifier::default(),
        }
    }

    /// Uses `analyzer` for onsets, beats, and song characteristics.
    pub fn with_analyzer(mut self, analyzer: &'a dyn AudioAnalyzer) -> Self {
        self.analyzer = Some(analyzer);
        self
    }

    /// Uses `reference` as a timing source ahead of the analyzer.
    pub fn with_reference(mut self, reference: &'a dyn TimingReference) -> Self {
        self.reference = Some(reference);
        self
    }

    /// Asks the analyzer and reference whether they are available.
    pub fn capabilities(&self) -> Capabilities {
        Capabilities {
            analyzer: self.analyzer.is_some_and(|a| a.available()),
            reference: self.reference.is_some_and(|r| r.available()),
        }
    }

    /// Generates a chart for `request`.
    ///
    /// Walks the fallback chain from the detected (or forced) strategy until
    /// one produces a non-empty stream. Soft failures move on to the next
    /// strategy; anything else is recorded and the walk continues too.
    ///
    /// # Errors
    /// [`GenerateError::InvalidRequest`] for a non-positive or non-finite
    /// duration, [`GenerateError::AllStrategiesExhausted`] if even the
    /// last-resort grid fails.
    pub fn generate(&self, request: &GenerationRequest<'_>) -> GenerateResult<GenerationOutput> {
        if !(request.duration.is_finite() && request.duration > 0.0) {
            return Err(GenerateError::invalid_request(format!(
                "duration must be positive and finite, got {}",
                request.duration
            )));
        }

        let capabilities = self.capabilities();
        let first = request
            .start_with
            .unwrap_or_else(|| capabilities.initial_strategy());
        debug!(
            "capabilities: analyzer={}, reference={}; starting with {}",
            capabilities.analyzer, capabilities.reference, first
        );

        let mut run = OrchestrationRun::new();
        let mut current = Some(first);

        while let Some(strategy) = current {
            run.attempted.insert(strategy);
            run.transition(OrchestratorState::Attempting(strategy));
            info!("attempting strategy {} for {}", strategy, request.tier);

            match self.attempt(strategy, request, &capabilities, &mut run) {
                Ok(outcome) => {
                    run.attempts
                        .push(GenerationAttempt::success(strategy, outcome.events.len()));
                    run.transition(OrchestratorState::Succeeded(strategy));
                    info!(
                        "strategy {} produced {} events ({:.3}/s)",
                        strategy,
                        outcome.events.len(),
                        outcome.achieved_density
                    );
                    return Ok(self.finish(strategy, request, outcome, run));
                }
                Err(err) if err.is_soft() => {
                    let detail = self.soft_failure_detail(&err, request.tier);
                    warn!("strategy {} failed softly: {}", strategy, detail);
                    run.attempts.push(GenerationAttempt::failure(
                        strategy,
                        AttemptOutcome::SoftFailure,
                        detail,
                    ));
                }
                Err(err) => {
                    error!("strategy {} failed [{}]: {}", strategy, err.code(), err);
                    run.attempts.push(GenerationAttempt::failure(
                        strategy,
                        AttemptOutcome::HardFailure,
                        format!("{}: {}", err.code(), err),
                    ));
                }
            }

            current = next_strategy(strategy, &run.attempted);
        }

        run.transition(OrchestratorState::ExhaustedFallback);
        error!("all strategies exhausted after {} attempts", run.attempts().len());
        Err(GenerateError::AllStrategiesExhausted {
            attempts: run.attempts().len(),
        })
    }

    fn finish(
        &self,
        strategy: Strategy,
        request: &GenerationRequest<'_>,
        outcome: StrategyOutcome,
        run: OrchestrationRun,
    ) -> GenerationOutput {
        let target = self.config.tier(request.tier).target_density;
        let mut warnings = Vec::new();
        if !outcome.converged {
            warnings.push(ReportWarning::new(
                WarningCode::ConvergenceNotReached,
                format!(
                    "achieved {:.3}/s against target {:.3}/s",
                    outcome.achieved_density, target
                ),
            ));
        }
        if run.attempts.len() > 1 {
            warnings.push(ReportWarning::new(
                WarningCode::FallbackUsed,
                format!("chart produced by fallback strategy {}", strategy),
            ));
        }

        let report = GenerationReport {
            strategy,
            tier: request.tier,
            event_count: outcome.events.len(),
            achieved_density: outcome.achieved_density,
            target_density: target,
            converged: outcome.converged,
            iterations: outcome.iterations,
            attempts: run.attempts,
            warnings,
        };
        GenerationOutput {
            events: outcome.events,
            report,
        }
    }

    /// Error code and message plus whatever density figures the failure
    /// left behind. An empty pool achieved nothing, so its density is zero.
    fn soft_failure_detail(&self, err: &GenerateError, tier: DifficultyTier) -> String {
        let target = self.config.tier(tier).target_density;
        match err.candidate_count() {
            Some(candidates) => format!(
                "{}: {} ({} candidates, achieved 0.000/s against target {:.3}/s)",
                err.code(),
                err,
                candidates,
                target
            ),
            None => format!("{}: {} (target {:.3}/s)", err.code(), err, target),
        }
    }

    fn attempt(
        &self,
        strategy: Strategy,
        request: &GenerationRequest<'_>,
        capabilities: &Capabilities,
        run: &mut OrchestrationRun,
    ) -> GenerateResult<StrategyOutcome> {
        let duration = request.duration;
        let start = self.config.effective_start(duration);
        let (pool, context) = match strategy {
            Strategy::LastResortGrid => return self.last_resort(request),
            Strategy::ReferenceTiming => {
                let events = self.reference_events(capabilities)?;
                let context = match self.analysis(request, capabilities, run) {
                    Ok(report) => {
                        TuningContext::from_characteristics(duration, &report.characteristics())
                    }
                    Err(_) => TuningContext::new(duration),
                };
                let raw = source::reference_candidates(&events);
                (CandidatePool::new(raw, start, duration), context)
            }
            Strategy::OnsetDriven => {
                let report = self.analysis(request, capabilities, run)?;
                let raw = report.onsets();
                (CandidatePool::new(raw, start, duration), context_for(duration, report))
            }
            Strategy::BeatSubdivision => {
                let report = self.analysis(request, capabilities, run)?;
                let raw =
                    source::beat_subdivisions(&report.beat_grid(), &report.onsets(), request.tier);
                (CandidatePool::new(raw, start, duration), context_for(duration, report))
            }
            Strategy::TempoGrid => {
                let report = self.analysis(request, capabilities, run)?;
                let phase = report.beat_times.iter().copied().fold(f64::INFINITY, f64::min);
                let phase = if phase.is_finite() { phase } else { 0.0 };
                let raw = source::tempo_grid(report.tempo, phase, start, duration);
                (CandidatePool::new(raw, start, duration), context_for(duration, report))
            }
        };

        if pool.is_empty() {
            return Err(GenerateError::EmptyCandidatePool { candidates: 0 });
        }
        debug!("strategy {}: {} candidates", strategy, pool.len());

        let controller = DensityController::new(self.config);
        let tuned = controller.tune(pool.candidates(), request.tier, &context)?;
        let mut events = self.classifier.classify(&tuned.times, |t| pool.band_at(t));

        if self.config.humanize_amount > 0.0 {
            let mut rng = create_strategy_rng(request.seed, strategy.id());
            humanize(&mut events, self.config.humanize_amount, &mut rng);
        }

        let post = PostProcessor::new(self.config, request.tier, duration);
        let events = post.finalize(events);
        post.validate_non_empty(&events)?;

        let achieved_density = events.len() as f64 / duration;
        let target = self.config.tier(request.tier).target_density;
        Ok(StrategyOutcome {
            converged: tuned.converged
                && (achieved_density - target).abs() / target <= self.config.tolerance,
            achieved_density,
            iterations: tuned.iterations,
            events,
        })
    }

    fn last_resort(&self, request: &GenerationRequest<'_>) -> GenerateResult<StrategyOutcome> {
        let times = source::last_resort_times(self.config, request.tier, request.duration);
        let start = times.first().copied().unwrap_or_default();
        let spacing = source::last_resort_spacing(self.config, request.tier);
        let events = self.classifier.classify(&times, |t| {
            if ((t - start) / spacing).round() as i64 % 2 == 0 {
                Band::Kick
            } else {
                Band::HiHat
            }
        });

        let post = PostProcessor::new(self.config, request.tier, request.duration);
        let events = post.finalize(events);
        post.validate_non_empty(&events)?;

        let achieved_density = events.len() as f64 / request.duration;
        let target = self.config.tier(request.tier).target_density;
        Ok(StrategyOutcome {
            converged: (achieved_density - target).abs() / target <= self.config.tolerance,
            achieved_density,
            iterations: 0,
            events,
        })
    }

    fn reference_events(
        &self,
        capabilities: &Capabilities,
    ) -> GenerateResult<Vec<ReferenceEvent>> {
        let reference = match self.reference {
            Some(reference) if capabilities.reference => reference,
            _ => return Err(GenerateError::analysis_unavailable("no timing reference")),
        };
        reference
            .reference_events()
            .map_err(|e| GenerateError::analysis_unavailable(format!("timing reference: {}", e)))
    }

    /// Runs the analyzer on first use and memoises the outcome.
    fn analysis<'r>(
        &self,
        request: &GenerationRequest<'_>,
        capabilities: &Capabilities,
        run: &'r mut OrchestrationRun,
    ) -> GenerateResult<&'r AnalysisReport> {
        let memo = run.analysis.get_or_insert_with(|| {
            let analyzer = match self.analyzer {
                Some(analyzer) if capabilities.analyzer => analyzer,
                Some(_) => return Err("analyzer not available".to_string()),
                None => return Err("no analyzer configured".to_string()),
            };
            debug!("running analyzer");
            let report = analyzer.analyze(&request.audio).map_err(|e| e.to_string())?;
            report.check()?;
            Ok(report)
        });
        memo.as_ref()
            .map_err(|reason| GenerateError::analysis_unavailable(reason.clone()))
    }
}

fn context_for(duration: f64, report: &AnalysisReport) -> TuningContext {
    TuningContext::from_characteristics(duration, &report.characteristics())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::{AnalyzerError, RawOnset};
    use beatmapper_spec::{validate_stream, StreamBounds};
    use std::cell::Cell;

    struct FixedAnalyzer {
        report: AnalysisReport,
        calls: Cell<usize>,
    }

    impl FixedAnalyzer {
        fn new(report: AnalysisReport) -> Self {
            Self {
                report,
                calls: Cell::new(0),
            }
        }
    }

    impl AudioAnalyzer for FixedAnalyzer {
        fn analyze(&self, _: &AudioSamples<'_>) -> Result<AnalysisReport, AnalyzerError> {
            self.calls.set(self.calls.get() + 1);
            Ok(self.report.clone())
        }
    }

    struct FailingAnalyzer {
        calls: Cell<usize>,
    }

    impl AudioAnalyzer for FailingAnalyzer {
        fn analyze(&self, _: &AudioSamples<'_>) -> Result<AnalysisReport, AnalyzerError> {
            self.calls.set(self.calls.get() + 1);
            Err("decoder crashed".into())
        }
    }

    struct FixedReference(Vec<ReferenceEvent>);

    impl TimingReference for FixedReference {
        fn reference_events(&self) -> Result<Vec<ReferenceEvent>, AnalyzerError> {
            Ok(self.0.clone())
        }
    }

    fn report(duration: f64, onsets: Vec<RawOnset>) -> AnalysisReport {
        let beats = (0..(duration * 2.0) as usize).map(|i| i as f64 * 0.5).collect();
        AnalysisReport {
            tempo: 120.0,
            beat_times: beats,
            onset_candidates: onsets,
            duration,
            percussive_ratio: None,
            rms_energy: None,
        }
    }

    fn even_onsets(count: usize, step: f64) -> Vec<RawOnset> {
        (0..count)
            .map(|i| RawOnset {
                time: i as f64 * step,
                strength: 1.0,
                band: (i % 5) as u32,
            })
            .collect()
    }

    fn bounds(config: &GenerationConfig, tier: DifficultyTier, duration: f64) -> StreamBounds {
        PostProcessor::new(config, tier, duration).bounds
    }

    #[test]
    fn test_onset_driven_success() {
        let config = GenerationConfig::default();
        let analyzer = FixedAnalyzer::new(report(100.0, even_onsets(200, 0.5)));
        let orchestrator = GeneratorOrchestrator::new(&config).with_analyzer(&analyzer);

        let output = orchestrator
            .generate(&GenerationRequest::new(DifficultyTier::Easy, 100.0))
            .unwrap();

        assert_eq!(output.report.strategy, Strategy::OnsetDriven);
        assert_eq!(output.report.attempts.len(), 1);
        assert!(output.report.converged);
        assert!((72..=88).contains(&output.events.len()));
        let bounds = bounds(&config, DifficultyTier::Easy, 100.0);
        assert!(validate_stream(&output.events, &bounds).is_ok());
    }

    #[test]
    fn test_empty_onsets_fall_back_without_reanalysing() {
        let config = GenerationConfig::default();
        let analyzer = FixedAnalyzer::new(report(60.0, Vec::new()));
        let orchestrator = GeneratorOrchestrator::new(&config).with_analyzer(&analyzer);

        let output = orchestrator
            .generate(&GenerationRequest::new(DifficultyTier::Medium, 60.0))
            .unwrap();

        assert_eq!(output.report.strategy, Strategy::BeatSubdivision);
        assert_eq!(output.report.attempts[0].outcome, AttemptOutcome::SoftFailure);
        assert_eq!(
            output.report.attempts[0].detail.as_deref(),
            Some(
                "GEN_002: empty candidate pool (0 raw candidates) \
                 (0 candidates, achieved 0.000/s against target 1.500/s)"
            )
        );
        assert_eq!(analyzer.calls.get(), 1);
        assert!(output
            .report
            .warnings
            .iter()
            .any(|w| w.code == WarningCode::FallbackUsed));
    }

    #[test]
    fn test_failing_analyzer_reaches_last_resort() {
        let config = GenerationConfig::default();
        let analyzer = FailingAnalyzer {
            calls: Cell::new(0),
        };
        let orchestrator = GeneratorOrchestrator::new(&config).with_analyzer(&analyzer);

        let output = orchestrator
            .generate(&GenerationRequest::new(DifficultyTier::Hard, 60.0))
            .unwrap();

        let tried: Vec<Strategy> = output.report.attempts.iter().map(|a| a.strategy).collect();
        assert_eq!(
            tried,
            vec![
                Strategy::OnsetDriven,
                Strategy::BeatSubdivision,
                Strategy::TempoGrid,
                Strategy::LastResortGrid,
            ]
        );
        assert_eq!(analyzer.calls.get(), 1);
        assert!(!output.events.is_empty());
        let bounds = bounds(&config, DifficultyTier::Hard, 60.0);
        assert!(validate_stream(&output.events, &bounds).is_ok());
    }

    #[test]
    fn test_no_analyzer_starts_at_beat_subdivision() {
        let config = GenerationConfig::default();
        let orchestrator = GeneratorOrchestrator::new(&config);
        assert_eq!(orchestrator.capabilities().initial_strategy(), Strategy::BeatSubdivision);

        let output = orchestrator
            .generate(&GenerationRequest::new(DifficultyTier::Easy, 30.0))
            .unwrap();
        assert_eq!(output.report.strategy, Strategy::LastResortGrid);
        assert_eq!(output.report.attempts.len(), 3);
    }

    #[test]
    fn test_reference_timing_preferred() {
        let config = GenerationConfig::default();
        let reference = FixedReference(
            (0..100)
                .map(|i| ReferenceEvent {
                    time: 3.0 + i as f64 * 1.25,
                    band: Band::Snare,
                })
                .collect(),
        );
        let orchestrator = GeneratorOrchestrator::new(&config).with_reference(&reference);

        let output = orchestrator
            .generate(&GenerationRequest::new(DifficultyTier::Easy, 120.0))
            .unwrap();
        assert_eq!(output.report.strategy, Strategy::ReferenceTiming);
        assert!(output.events.iter().all(|e| e.band == Band::Snare));
    }

    #[test]
    fn test_forced_strategy() {
        let config = GenerationConfig::default();
        let analyzer = FixedAnalyzer::new(report(60.0, even_onsets(120, 0.5)));
        let orchestrator = GeneratorOrchestrator::new(&config).with_analyzer(&analyzer);

        let request =
            GenerationRequest::new(DifficultyTier::Easy, 60.0).starting_with(Strategy::TempoGrid);
        let output = orchestrator.generate(&request).unwrap();
        assert_eq!(output.report.strategy, Strategy::TempoGrid);
    }

    #[test]
    fn test_rejects_bad_duration() {
        let config = GenerationConfig::default();
        let orchestrator = GeneratorOrchestrator::new(&config);
        for duration in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let err = orchestrator
                .generate(&GenerationRequest::new(DifficultyTier::Easy, duration))
                .unwrap_err();
            assert!(matches!(err, GenerateError::InvalidRequest { .. }));
        }
    }

    #[test]
    fn test_next_strategy_never_repeats() {
        let mut attempted = BTreeSet::new();
        attempted.insert(Strategy::ReferenceTiming);
        attempted.insert(Strategy::OnsetDriven);
        assert_eq!(
            next_strategy(Strategy::ReferenceTiming, &attempted),
            Some(Strategy::BeatSubdivision)
        );

        attempted.extend(Strategy::ALL);
        assert_eq!(next_strategy(Strategy::TempoGrid, &attempted), None);
    }

    #[test]
    fn test_last_resort_failure_exhausts() {
        let attempted: BTreeSet<Strategy> = [Strategy::LastResortGrid].into_iter().collect();
        assert_eq!(next_strategy(Strategy::LastResortGrid, &attempted), None);
    }

    #[test]
    fn test_last_resort_survives_off_step_offset() {
        let config = GenerationConfig {
            start_offset: 3.004,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
        let orchestrator = GeneratorOrchestrator::new(&config);

        let output = orchestrator
            .generate(&GenerationRequest::new(DifficultyTier::Easy, 3.05))
            .unwrap();
        assert_eq!(output.report.strategy, Strategy::LastResortGrid);
        let times: Vec<f64> = output.events.iter().map(|e| e.time).collect();
        assert_eq!(times, vec![3.01]);
        let bounds = bounds(&config, DifficultyTier::Easy, 3.05);
        assert!(validate_stream(&output.events, &bounds).is_ok());
    }

    #[test]
    fn test_seeded_humanisation_is_reproducible() {
        let config = GenerationConfig::relaxed();
        let analyzer = FixedAnalyzer::new(report(60.0, even_onsets(240, 0.25)));
        let orchestrator = GeneratorOrchestrator::new(&config).with_analyzer(&analyzer);
        let request = GenerationRequest::new(DifficultyTier::Hard, 60.0).with_seed(11);

        let first = orchestrator.generate(&request).unwrap();
        let second = orchestrator.generate(&request).unwrap();
        assert_eq!(first.events, second.events);
        let bounds = bounds(&config, DifficultyTier::Hard, 60.0);
        assert!(validate_stream(&first.events, &bounds).is_ok());
    }
}
