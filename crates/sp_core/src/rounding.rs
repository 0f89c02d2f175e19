//! Rounding and clamping helpers for fractional seat quantities.
//!
//! Seat math mixes fractions (allocation percentages, ratios) with integer
//! seats. Every fraction→seat conversion in the engine goes through
//! `round_half_even` so halfway cases resolve the same way everywhere.

/// Round to the nearest integer, ties to the even neighbor.
///
/// Notes:
/// - Non-finite input maps to 0 (callers validate upstream; this keeps the
///   helper total).
/// - Exact halfway values pick the even neighbor: 0.5 → 0, 1.5 → 2, −2.5 → −2.
pub fn round_half_even(x: f64) -> i64 {
    if !x.is_finite() {
        return 0;
    }
    let floor = x.floor();
    let diff = x - floor;
    let below = floor as i64;
    if diff > 0.5 {
        below + 1
    } else if diff < 0.5 {
        below
    } else if below % 2 == 0 {
        below
    } else {
        below + 1
    }
}

/// Round a non-negative seat quantity, saturating at 0.
pub fn round_seats(x: f64) -> u32 {
    round_half_even(x).max(0) as u32
}

/// Clamp an allocation fraction into `[min, max]`.
#[inline]
pub fn clamp_fraction(x: f64, min: f64, max: f64) -> f64 {
    x.clamp(min, max)
}

/* ---------------------------------- Tests --------------------------------- */
