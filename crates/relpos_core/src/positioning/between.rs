//! Randomized split of an open interval.

use super::error::{PlacementError, PlacementResult};
use super::{MAX_POSITION, MIN_POSITION, START_POSITION};
use rand::Rng;

/// Draws a value uniformly from the open interval `(low, high)`.
///
/// Bounds given in reverse order are swapped. The practical range is
/// `[low.next_up(), high.next_down()]`, so the result is strictly greater
/// than `low` and strictly less than `high`.
///
/// # Errors
/// - `NonFiniteBound` when either bound is NaN or infinite.
/// - `Exhausted` when the bounds are equal or adjacent floats.
pub fn position_between<G: Rng + ?Sized>(
    rng: &mut G,
    low: f64,
    high: f64,
) -> PlacementResult<f64> {
    for bound in [low, high] {
        if !bound.is_finite() {
            return Err(PlacementError::NonFiniteBound(bound));
        }
    }
    let (low, high) = if low <= high { (low, high) } else { (high, low) };

    let floor = low.next_up();
    let ceiling = high.next_down();
    if floor > ceiling {
        return Err(PlacementError::Exhausted { low, high });
    }

    // Interpolating from both ends keeps `ceiling - floor` from overflowing
    // when the interval spans the whole f64 range.
    let t: f64 = rng.random();
    let value = floor * (1.0 - t) + ceiling * t;
    Ok(value.clamp(floor, ceiling))
}

/// Returns true when at least one float lies strictly between the bounds.
pub fn has_room(low: f64, high: f64) -> bool {
    low.next_up() < high
}

/// Narrows sentinel-bounded intervals to within `ideal_distance` of the
/// real bound.
///
/// The returned interval is always contained in `(low, high)`. Intervals with
/// two real bounds are returned unchanged (sorted).
///
/// A stored position equal to `MIN_POSITION`/`MAX_POSITION` counts as an open
/// side too; draws next to it exhaust and go through rebalance.
pub fn draw_window(low: f64, high: f64, ideal_distance: f64) -> (f64, f64) {
    let (low, high) = if low <= high { (low, high) } else { (high, low) };

    match (low == MIN_POSITION, high == MAX_POSITION) {
        (true, true) => (
            START_POSITION - ideal_distance,
            START_POSITION + ideal_distance,
        ),
        (true, false) => {
            let narrowed = high - ideal_distance;
            if narrowed > low && has_room(narrowed, high) {
                (narrowed, high)
            } else {
                (low, high)
            }
        }
        (false, true) => {
            let narrowed = low + ideal_distance;
            if narrowed < high && has_room(low, narrowed) {
                (low, narrowed)
            } else {
                (low, high)
            }
        }
        (false, false) => (low, high),
    }
}
