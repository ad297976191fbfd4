//! Stream invariant checks for finished charts.
//!
//! `validate_stream` reports every violated invariant rather than stopping at
//! the first, so a defective generator shows up with its full footprint.

use std::fmt;

use crate::event::NoteEvent;

/// Slack for floating-point gap comparisons, in seconds.
pub const GAP_EPSILON: f64 = 1e-9;

/// Invariant codes for accepted streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InvariantCode {
    /// I001: times not strictly ascending.
    Unordered,
    /// I002: two consecutive events closer than the minimum gap.
    SpacingViolated,
    /// I003: an event outside `[start_offset, duration)`.
    OutOfRange,
    /// I004: empty stream for a positive duration.
    EmptyStream,
    /// I005: non-finite time.
    NonFiniteTime,
}

impl InvariantCode {
    /// Returns the code string (e.g. "I001").
    pub fn code(&self) -> &'static str {
        match self {
            InvariantCode::Unordered => "I001",
            InvariantCode::SpacingViolated => "I002",
            InvariantCode::OutOfRange => "I003",
            InvariantCode::EmptyStream => "I004",
            InvariantCode::NonFiniteTime => "I005",
        }
    }
}

impl fmt::Display for InvariantCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// One violated invariant, with the index of the offending event.
#[derive(Debug, Clone, PartialEq)]
pub struct InvariantViolation {
    pub code: InvariantCode,
    pub message: String,
    pub index: Option<usize>,
}

impl InvariantViolation {
    fn at(code: InvariantCode, index: usize, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            index: Some(index),
        }
    }
}

impl fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.index {
            Some(index) => write!(f, "{}: {} (at event {})", self.code, self.message, index),
            None => write!(f, "{}: {}", self.code, self.message),
        }
    }
}

/// Bounds a stream is validated against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StreamBounds {
    pub start_offset: f64,
    pub duration: f64,
    pub min_gap: f64,
}

/// Checks ordering, spacing, range, and non-emptiness of a stream.
pub fn validate_stream(
    events: &[NoteEvent],
    bounds: &StreamBounds,
) -> Result<(), Vec<InvariantViolation>> {
    let mut violations = Vec::new();

    if events.is_empty() && bounds.duration > 0.0 {
        violations.push(InvariantViolation {
            code: InvariantCode::EmptyStream,
            message: format!("no events for duration {:.2}s", bounds.duration),
            index: None,
        });
    }

    for (i, event) in events.iter().enumerate() {
        if !event.time.is_finite() {
            violations.push(InvariantViolation::at(
                InvariantCode::NonFiniteTime,
                i,
                format!("time is {}", event.time),
            ));
            continue;
        }
        if event.time < bounds.start_offset || event.time >= bounds.duration {
            violations.push(InvariantViolation::at(
                InvariantCode::OutOfRange,
                i,
                format!(
                    "time {:.3} outside [{:.2}, {:.2})",
                    event.time, bounds.start_offset, bounds.duration
                ),
            ));
        }
    }

    for (i, pair) in events.windows(2).enumerate() {
        let gap = pair[1].time - pair[0].time;
        if gap <= 0.0 {
            violations.push(InvariantViolation::at(
                InvariantCode::Unordered,
                i + 1,
                format!("{:.3} does not follow {:.3}", pair[1].time, pair[0].time),
            ));
        } else if gap + GAP_EPSILON < bounds.min_gap {
            violations.push(InvariantViolation::at(
                InvariantCode::SpacingViolated,
                i + 1,
                format!("gap {:.4}s below minimum {:.4}s", gap, bounds.min_gap),
            ));
        }
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(violations)
    }
}
