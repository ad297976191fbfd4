//! Greedy candidate selection under a strength threshold and spacing rule.

use beatmapper_spec::{OnsetCandidate, SelectionParameters};

/// Picks note times from a candidate pool.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CandidateSelector {
    base_threshold: f64,
}

impl CandidateSelector {
    /// Creates a selector with the given base strength threshold.
    pub fn new(base_threshold: f64) -> Self {
        Self { base_threshold }
    }

    /// Selects times from `candidates`.
    ///
    /// Candidates weaker than `base_threshold * threshold_multiplier` are
    /// dropped. The rest are visited strongest first (earliest first on
    /// ties) and accepted only when no accepted time lies closer than
    /// `min_spacing * spacing_multiplier`. The result is ascending.
    ///
    /// # Arguments
    /// * `candidates` - Pool to pick from, any order
    /// * `params` - Threshold and spacing multipliers for this iteration
    /// * `min_spacing` - Base spacing in seconds before the multiplier
    pub fn select(
        &self,
        candidates: &[OnsetCandidate],
        params: &SelectionParameters,
        min_spacing: f64,
    ) -> Vec<f64> {
        let threshold = self.base_threshold * params.threshold_multiplier;
        let spacing = min_spacing * params.spacing_multiplier;

        let mut ranked: Vec<&OnsetCandidate> = candidates
            .iter()
            .filter(|c| c.time.is_finite() && c.strength >= threshold)
            .collect();
        ranked.sort_by(|a, b| {
            b.strength
                .total_cmp(&a.strength)
                .then(a.time.total_cmp(&b.time))
        });

        let mut accepted: Vec<f64> = Vec::new();
        for candidate in ranked {
            let at = accepted.partition_point(|&t| t < candidate.time);
            let clear_before = at == 0 || candidate.time - accepted[at - 1] >= spacing;
            let clear_after = at == accepted.len() || accepted[at] - candidate.time >= spacing;
            if clear_before && clear_after {
                accepted.insert(at, candidate.time);
            }
        }
        accepted
    }
}

/// Keeps `count` of `times`, spread evenly across the input.
///
/// Index `i` of the output is input index `floor(i * len / count)`, so the
/// first time always survives and the order is preserved.
pub fn thin_evenly(times: &[f64], count: usize) -> Vec<f64> {
    if count >= times.len() {
        return times.to_vec();
    }
    (0..count).map(|i| times[i * times.len() / count]).collect()
}
