//! Micro-timing jitter.

use rand::Rng;

use beatmapper_spec::NoteEvent;

/// Shifts every event by a uniform offset in `[-amount, amount]` seconds.
///
/// Does nothing unless `amount` is positive and finite. The caller re-sorts and
/// re-spaces afterwards.
pub fn humanize<R: Rng>(events: &mut [NoteEvent], amount: f64, rng: &mut R) {
    if !(amount > 0.0 && amount.is_finite()) {
        return;
    }
    for event in events.iter_mut() {
        event.time += rng.gen_range(-amount..=amount);
    }
}
