//! Final cleanup of a classified event stream.
//!
//! [`PostProcessor::finalize`] is idempotent: running it on its own output
//! returns that output unchanged.

use beatmapper_spec::validation::GAP_EPSILON;
use beatmapper_spec::{DifficultyTier, GenerationConfig, NoteEvent, StreamBounds};

use crate::error::{GenerateError, GenerateResult};

pub use beatmapper_spec::event::{quantize, quantize_up, TIME_STEPS_PER_SECOND};

/// Cleans a stream for one tier and track.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PostProcessor {
    pub bounds: StreamBounds,
    pub dedupe_epsilon: f64,
}

impl PostProcessor {
    /// Builds a post-processor for `tier` on a track of `duration` seconds.
    pub fn new(config: &GenerationConfig, tier: DifficultyTier, duration: f64) -> Self {
        Self {
            bounds: StreamBounds {
                start_offset: config.effective_start(duration),
                duration,
                min_gap: config.tier(tier).min_gap,
            },
            dedupe_epsilon: config.dedupe_epsilon,
        }
    }

    /// Quantises, range-filters, sorts, dedupes, and spaces `events`.
    ///
    /// # Arguments
    /// * `events` - Events in any order, possibly non-finite or out of range
    ///
    /// # Returns
    /// A stream that is ascending, unique, in range, and at least `min_gap` apart.
    /// Running it again returns the same stream.
    pub fn finalize(&self, events: Vec<NoteEvent>) -> Vec<NoteEvent> {
        let mut events: Vec<NoteEvent> = events
            .into_iter()
            .filter(|e| e.time.is_finite())
            .map(|e| e.at(quantize(e.time)))
            .filter(|e| e.time >= self.bounds.start_offset && e.time < self.bounds.duration)
            .collect();
        sort_by_time(&mut events);
        let events = dedupe(events, self.dedupe_epsilon);
        enforce_min_spacing(events, self.bounds.min_gap)
    }

    /// Fails with [`GenerateError::EmptyStream`] if a positive-duration
    /// track ended up with no events.
    pub fn validate_non_empty(&self, events: &[NoteEvent]) -> GenerateResult<()> {
        if events.is_empty() && self.bounds.duration > 0.0 {
            return Err(GenerateError::EmptyStream {
                duration: self.bounds.duration,
            });
        }
        Ok(())
    }
}

/// Stable ascending sort by time.
pub fn sort_by_time(events: &mut [NoteEvent]) {
    events.sort_by(|a, b| a.time.total_cmp(&b.time));
}

/// Collapses events closer than `epsilon` to the first event of their run.
///
/// The survivor keeps the earliest time and takes the role, band, and
/// attributes of the highest-priority event in the run. Expects sorted input.
pub fn dedupe(events: Vec<NoteEvent>, epsilon: f64) -> Vec<NoteEvent> {
    let mut out: Vec<NoteEvent> = Vec::with_capacity(events.len());
    let mut anchor = f64::NEG_INFINITY;
    for event in events {
        if let Some(kept) = out.last_mut() {
            if event.time - anchor < epsilon {
                if event.role > kept.role {
                    *kept = event.at(kept.time);
                }
                continue;
            }
        }
        anchor = event.time;
        out.push(event);
    }
    out
}

/// Drops every event closer than `min_gap` to the previous kept event.
/// Expects sorted input.
pub fn enforce_min_spacing(events: Vec<NoteEvent>, min_gap: f64) -> Vec<NoteEvent> {
    let mut out: Vec<NoteEvent> = Vec::with_capacity(events.len());
    for event in events {
        let too_close = out
            .last()
            .is_some_and(|kept| event.time - kept.time + GAP_EPSILON < min_gap);
        if !too_close {
            out.push(event);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use beatmapper_spec::{validate_stream, Band, NoteRole};
    use pretty_assertions::assert_eq;

    fn kick(time: f64) -> NoteEvent {
        NoteEvent::new(time, NoteRole::Primary, Band::Kick)
    }

    fn processor(duration: f64) -> PostProcessor {
        PostProcessor::new(&GenerationConfig::default(), DifficultyTier::Easy, duration)
    }

    #[test]
    fn test_dedupe_collapses_near_duplicates() {
        let events = vec![kick(10.0), kick(10.0005)];
        assert_eq!(dedupe(events, 0.001).len(), 1);
    }

    #[test]
    fn test_dedupe_prefers_higher_role() {
        let events = vec![
            kick(10.0),
            NoteEvent::new(10.0004, NoteRole::Accent, Band::Crash),
        ];
        let out = dedupe(events, 0.001);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].role, NoteRole::Accent);
        assert_eq!(out[0].time, 10.0);
    }

    #[test]
    fn test_enforce_min_spacing_keeps_earlier() {
        let out = enforce_min_spacing(vec![kick(5.0), kick(5.05), kick(5.1), kick(5.3)], 0.1);
        let times: Vec<f64> = out.iter().map(|e| e.time).collect();
        assert_eq!(times, vec![5.0, 5.1, 5.3]);
    }

    #[test]
    fn test_finalize_filters_range_and_sorts() {
        let out = processor(20.0).finalize(vec![
            kick(12.0),
            kick(1.0),
            kick(f64::NAN),
            kick(20.0),
            kick(4.333),
        ]);
        let times: Vec<f64> = out.iter().map(|e| e.time).collect();
        assert_eq!(times, vec![4.33, 12.0]);
    }

    #[test]
    fn test_finalize_is_idempotent() {
        let post = processor(30.0);
        let raw: Vec<NoteEvent> = (0..200).map(|i| kick(2.9 + i as f64 * 0.037)).collect();
        let once = post.finalize(raw);
        let twice = post.finalize(once.clone());
        assert_eq!(once, twice);
        assert!(validate_stream(&once, &post.bounds).is_ok());
    }

    #[test]
    fn test_short_track_starts_at_zero() {
        let post = processor(2.0);
        assert_eq!(post.bounds.start_offset, 0.0);
        assert_eq!(post.finalize(vec![kick(0.5)]).len(), 1);
    }

    #[test]
    fn test_validate_non_empty() {
        let post = processor(30.0);
        assert!(matches!(
            post.validate_non_empty(&[]),
            Err(GenerateError::EmptyStream { .. })
        ));
        assert!(post.validate_non_empty(&[kick(4.0)]).is_ok());
    }
}
