//! Command implementations for the BeatMapper CLI

pub mod generate;
pub mod inspect;
pub mod tiers;
