//! Role and attribute assignment for selected times.

use beatmapper_spec::{Band, NoteEvent, NoteRole};

/// Assigns a role, band, and attributes to every selected time.
///
/// Every `accent_period`-th event (counting from the first) is an accent and
/// every `secondary_period`-th is a secondary accent. A band whose own role
/// ranks higher than the positional role wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventClassifier {
    pub accent_period: usize,
    pub secondary_period: usize,
}

impl Default for EventClassifier {
    fn default() -> Self {
        Self {
            accent_period: 8,
            secondary_period: 4,
        }
    }
}

impl EventClassifier {
    /// Role implied by an event's position in the stream.
    pub fn positional_role(&self, index: usize) -> NoteRole {
        if self.accent_period > 0 && index % self.accent_period == 0 {
            NoteRole::Accent
        } else if self.secondary_period > 0 && index % self.secondary_period == 0 {
            NoteRole::SecondaryAccent
        } else {
            NoteRole::Primary
        }
    }

    /// Classifies ascending `times`, looking bands up through `band_of`.
    pub fn classify<F>(&self, times: &[f64], band_of: F) -> Vec<NoteEvent>
    where
        F: Fn(f64) -> Band,
    {
        times
            .iter()
            .enumerate()
            .map(|(i, &time)| {
                let band = band_of(time);
                let role = self.positional_role(i).max(band.base_role());
                NoteEvent::new(time, role, band)
            })
            .collect()
    }
}
