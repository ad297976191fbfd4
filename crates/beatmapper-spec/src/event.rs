//! Output events: bands, roles, and the fixed attribute record.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Frequency band tag attached to candidates and events.
///
/// Analyzer bands are plain integers; [`Band::from_index`] clamps anything
/// above the highest band to [`Band::Crash`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Band {
    Kick,
    LowTom,
    Snare,
    HiHat,
    Crash,
}

impl Band {
    /// Number of distinct bands.
    pub const COUNT: usize = 5;

    /// Maps an analyzer band index to a band.
    pub fn from_index(index: u32) -> Band {
        match index {
            0 => Band::Kick,
            1 => Band::LowTom,
            2 => Band::Snare,
            3 => Band::HiHat,
            _ => Band::Crash,
        }
    }

    /// Returns the analyzer band index.
    pub fn index(&self) -> u32 {
        match self {
            Band::Kick => 0,
            Band::LowTom => 1,
            Band::Snare => 2,
            Band::HiHat => 3,
            Band::Crash => 4,
        }
    }

    /// Role implied by the band alone, before positional promotion.
    pub fn base_role(&self) -> NoteRole {
        match self {
            Band::Kick | Band::LowTom | Band::HiHat => NoteRole::Primary,
            Band::Snare => NoteRole::SecondaryAccent,
            Band::Crash => NoteRole::Accent,
        }
    }

    /// Attribute record for a plain note in this band.
    pub fn attributes(&self) -> NoteAttributes {
        match self {
            Band::Kick => NoteAttributes::new(1, 2, 2, 7),
            Band::LowTom => NoteAttributes::new(1, 3, 3, 7),
            Band::Snare => NoteAttributes::new(1, 2, 2, 7),
            Band::HiHat => NoteAttributes::new(1, 1, 1, 6),
            Band::Crash => NoteAttributes::new(2, 5, 6, 5),
        }
    }
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Band::Kick => "kick",
            Band::LowTom => "low_tom",
            Band::Snare => "snare",
            Band::HiHat => "hihat",
            Band::Crash => "crash",
        };
        f.write_str(name)
    }
}

/// Output time steps per second (centisecond resolution).
pub const TIME_STEPS_PER_SECOND: f64 = 100.0;

/// Rounds `time` to the nearest output step.
pub fn quantize(time: f64) -> f64 {
    (time * TIME_STEPS_PER_SECOND).round() / TIME_STEPS_PER_SECOND
}

/// Smallest output step at or after `time`.
///
/// Quantising the result leaves it unchanged, and it is never below `time`.
pub fn quantize_up(time: f64) -> f64 {
    let nearest = quantize(time);
    if nearest >= time {
        nearest
    } else {
        quantize(nearest + 1.0 / TIME_STEPS_PER_SECOND)
    }
}

/// Gameplay role of an event.
///
/// Variants are ordered by priority: when two events collapse into one, the
/// greater role wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteRole {
    Primary,
    SecondaryAccent,
    Accent,
}

impl NoteRole {
    /// Attribute record for this role, falling back to the band's record
    /// for plain notes.
    pub fn attributes_for(&self, band: Band) -> NoteAttributes {
        match self {
            NoteRole::Accent => NoteAttributes::new(2, 5, 6, 5),
            NoteRole::SecondaryAccent => NoteAttributes::new(1, 2, 2, 7),
            NoteRole::Primary => band.attributes(),
        }
    }
}

/// Fixed attribute record consumed by the chart export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NoteAttributes {
    /// Enemy type code.
    pub enemy_type: u8,
    /// First auxiliary color code.
    pub color1: u8,
    /// Second auxiliary color code.
    pub color2: u8,
    /// Auxiliary lane code.
    pub aux: u8,
}

impl NoteAttributes {
    /// Creates an attribute record.
    pub const fn new(enemy_type: u8, color1: u8, color2: u8, aux: u8) -> Self {
        Self {
            enemy_type,
            color1,
            color2,
            aux,
        }
    }
}

/// A single timed gameplay event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoteEvent {
    /// Event time in seconds.
    pub time: f64,
    /// Gameplay role.
    pub role: NoteRole,
    /// Source band.
    pub band: Band,
    /// Export attributes.
    pub attributes: NoteAttributes,
}

impl NoteEvent {
    /// Creates an event whose attributes follow from its role and band.
    pub fn new(time: f64, role: NoteRole, band: Band) -> Self {
        Self {
            time,
            role,
            band,
            attributes: role.attributes_for(band),
        }
    }

    /// Returns a copy of this event at a different time.
    pub fn at(&self, time: f64) -> Self {
        Self { time, ..*self }
    }
}
