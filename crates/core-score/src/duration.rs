//! Duration codes and tick arithmetic.
//!
//! A duration code `d >= 0` names a power-of-two note value (0 = whole,
//! 1 = half, 2 = quarter, ...). Its basic length is `WHOLE_NOTE_TICKS >> d`
//! and every augmentation dot adds the next smaller power of two. Negative
//! codes are "specials": the magnitude is the tick count itself and dots are
//! ignored.
//!
//! All arithmetic is integer; tuplet and grace scaling floor toward zero so
//! that measure totals compose the same way regardless of grouping.

/// Tick count type used throughout the score model.
pub type Ticks = i32;

/// Ticks in a whole note. Divisible by 3 down to the 128th so triplets of
/// common values stay exact.
pub const WHOLE_NOTE_TICKS: Ticks = 1536;

/// Largest regular duration code (1536 >> 8 == 6 ticks).
pub const MAX_DURATION_CODE: i32 = 8;

/// Shift beyond which a dot would contribute zero ticks.
const MAX_TICK_SHIFT: i32 = 10;

/// Upper bound for special (negative-code) durations: a breve.
pub const MAX_SPECIAL_TICKS: Ticks = WHOLE_NOTE_TICKS * 2;

/// Default divisor applied to grace-note durations for display.
pub const GRACE_MULTIPLIER: Ticks = 4;

/// Largest duration code that never carries a beam (quarter note or longer).
pub const UNBEAMED_MAX_CODE: i32 = 2;

/// Basic (untupleted) length of a duration code with `dots` augmentation dots.
///
/// Malformed codes never fail: regular codes above `MAX_DURATION_CODE` clamp
/// to it, specials clamp to `MAX_SPECIAL_TICKS`.
pub fn basic_ticks(code: i32, dots: u8) -> Ticks {
    if code < 0 {
        let magnitude = code.unsigned_abs().min(MAX_SPECIAL_TICKS as u32);
        return magnitude as Ticks;
    }
    let code = code.min(MAX_DURATION_CODE);
    let mut ticks = WHOLE_NOTE_TICKS >> code;
    for dot in 1..=i32::from(dots) {
        let shift = code + dot;
        if shift > MAX_TICK_SHIFT {
            break;
        }
        ticks += WHOLE_NOTE_TICKS >> shift;
    }
    ticks
}

/// Scale `basic` by a tuplet ratio (`numerator / denominator`), flooring.
/// A zero denominator is treated as 1:1.
pub fn tuplet_ticks(basic: Ticks, numerator: u32, denominator: u32) -> Ticks {
    if denominator == 0 {
        return basic;
    }
    let scaled = i64::from(basic) * i64::from(numerator) / i64::from(denominator);
    scaled.clamp(0, i64::from(i32::MAX)) as Ticks
}

/// Display length of a grace note: `basic / multiplier`.
pub fn grace_ticks(basic: Ticks, multiplier: Ticks) -> Ticks {
    if multiplier <= 0 { basic } else { basic / multiplier }
}

/// Capacity of a measure in the given time signature.
pub fn ticks_per_measure(numerator: u32, denominator: u32) -> Ticks {
    if denominator == 0 {
        return WHOLE_NOTE_TICKS;
    }
    let cap = i64::from(WHOLE_NOTE_TICKS) * i64::from(numerator) / i64::from(denominator);
    cap.clamp(0, i64::from(i32::MAX)) as Ticks
}

/// Length of one beat. Compound meters (numerator divisible by 3 with a
/// denominator above 4) group three notated beats into one.
pub fn ticks_per_beat(numerator: u32, denominator: u32) -> Ticks {
    let den = if denominator == 0 { 4 } else { denominator };
    let mut beat = WHOLE_NOTE_TICKS / den as Ticks;
    if numerator % 3 == 0 && den > 4 {
        beat *= 3;
    }
    beat.max(1)
}
