//! Normalized signed duration.
//!
//! # Responsibility
//! - Represent day/second/microsecond durations with one canonical shape.
//! - Parse `H:MM:SS` durations with unbounded hours.
//!
//! # Invariants
//! - `seconds` stays in `[0, 86_400)` and `micros` in `[0, 1_000_000)`;
//!   negative durations carry their sign on `days` only.
//! - Addition and subtraction saturate at [`TimeDelta::MAX`] /
//!   [`TimeDelta::MIN`] instead of overflowing.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt::{Display, Formatter};
use std::ops::{Add, Neg, Sub};

static TIME_DELTA_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+):([0-5]\d):([0-5]\d)$").expect("valid time delta regex"));

const SECONDS_PER_DAY: i64 = 86_400;
const MICROS_PER_SECOND: i64 = 1_000_000;
const MAX_DAYS: i64 = 999_999_999;

/// Signed duration normalized the same way on every code path.
///
/// The split mirrors the persisted duration shape: a signed day count plus
/// non-negative second and microsecond remainders. `-1 day + 1 hour` is
/// stored as `days = -1, seconds = 3600`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TimeDelta {
    days: i64,
    seconds: i32,
    micros: i32,
}

impl TimeDelta {
    /// The zero duration.
    pub const ZERO: TimeDelta = TimeDelta {
        days: 0,
        seconds: 0,
        micros: 0,
    };

    /// Sentinel for an unbounded positive duration (`infinite - finite`).
    pub const MAX: TimeDelta = TimeDelta {
        days: MAX_DAYS,
        seconds: SECONDS_PER_DAY as i32 - 1,
        micros: MICROS_PER_SECOND as i32 - 1,
    };

    /// Sentinel for an unbounded negative duration.
    pub const MIN: TimeDelta = TimeDelta {
        days: -MAX_DAYS,
        seconds: 0,
        micros: 0,
    };

    /// Creates a normalized duration from possibly denormalized components.
    pub fn new(days: i64, seconds: i64, micros: i64) -> TimeDelta {
        Self::from_micros(
            days.saturating_mul(SECONDS_PER_DAY)
                .saturating_add(seconds)
                .saturating_mul(MICROS_PER_SECOND)
                .saturating_add(micros) as i128,
        )
    }

    /// Creates a duration from whole seconds.
    pub fn from_seconds(seconds: i64) -> TimeDelta {
        Self::new(0, seconds, 0)
    }

    /// Creates a duration from whole hours.
    pub fn from_hours(hours: i64) -> TimeDelta {
        Self::from_seconds(hours.saturating_mul(3600))
    }

    fn from_micros(total: i128) -> TimeDelta {
        let per_day = (SECONDS_PER_DAY * MICROS_PER_SECOND) as i128;
        let days = total.div_euclid(per_day);
        if days > MAX_DAYS as i128 {
            return Self::MAX;
        }
        if days < -MAX_DAYS as i128 {
            return Self::MIN;
        }
        let rest = total.rem_euclid(per_day);
        TimeDelta {
            days: days as i64,
            seconds: (rest / MICROS_PER_SECOND as i128) as i32,
            micros: (rest % MICROS_PER_SECOND as i128) as i32,
        }
    }

    /// Converts a chrono duration, saturating at the sentinels.
    pub fn from_chrono(duration: chrono::Duration) -> TimeDelta {
        Self::from_micros(
            duration.num_microseconds().map(i128::from).unwrap_or_else(|| {
                i128::from(duration.num_milliseconds()) * 1_000
            }),
        )
    }

    /// Signed day component.
    pub fn days(&self) -> i64 {
        self.days
    }

    /// Second remainder, always in `[0, 86_400)`.
    pub fn seconds(&self) -> i32 {
        self.seconds
    }

    /// Microsecond remainder, always in `[0, 1_000_000)`.
    pub fn micros(&self) -> i32 {
        self.micros
    }

    /// Whether the duration is negative.
    pub fn is_negative(&self) -> bool {
        self.days < 0
    }

    fn total_micros(&self) -> i128 {
        (self.days as i128) * (SECONDS_PER_DAY * MICROS_PER_SECOND) as i128
            + (self.seconds as i128) * MICROS_PER_SECOND as i128
            + self.micros as i128
    }

    /// Splits the duration into hours, minutes and seconds.
    ///
    /// For a negative duration the magnitude is
    /// `(|days| - 1) * 86_400 + (86_400 - seconds)` and the sign is carried
    /// on the hour component, so `-1 day + 1 hour` reports `(-23, 0, 0)`.
    pub fn hours_minutes_seconds(&self) -> (i64, i64, i64) {
        if self.is_negative() {
            let total = (self.days.abs() - 1) * SECONDS_PER_DAY
                + (SECONDS_PER_DAY - self.seconds as i64);
            (-(total / 3600), total % 3600 / 60, total % 60)
        } else {
            let total = self.days * SECONDS_PER_DAY + self.seconds as i64;
            (total / 3600, total % 3600 / 60, total % 60)
        }
    }
}

impl Add for TimeDelta {
    type Output = TimeDelta;

    fn add(self, other: TimeDelta) -> TimeDelta {
        // The sentinels absorb arithmetic so open-ended durations stay open.
        if self == Self::MAX || other == Self::MAX {
            return Self::MAX;
        }
        if self == Self::MIN || other == Self::MIN {
            return Self::MIN;
        }
        Self::from_micros(self.total_micros() + other.total_micros())
    }
}

impl Sub for TimeDelta {
    type Output = TimeDelta;

    fn sub(self, other: TimeDelta) -> TimeDelta {
        self + (-other)
    }
}

impl Neg for TimeDelta {
    type Output = TimeDelta;

    fn neg(self) -> TimeDelta {
        if self == Self::MAX {
            return Self::MIN;
        }
        if self == Self::MIN {
            return Self::MAX;
        }
        Self::from_micros(-self.total_micros())
    }
}

impl Display for TimeDelta {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let (hours, minutes, seconds) = self.hours_minutes_seconds();
        write!(f, "{hours}:{minutes:02}:{seconds:02}")
    }
}

/// Parses `H:MM:SS` with unbounded hours.
///
/// Invalid input falls back to [`TimeDelta::ZERO`]; parsing never fails.
pub fn parse_time_delta(input: &str) -> TimeDelta {
    let Some(captures) = TIME_DELTA_RE.captures(input.trim()) else {
        return TimeDelta::ZERO;
    };
    let hours: i64 = captures[1].parse().unwrap_or(0);
    let minutes: i64 = captures[2].parse().unwrap_or(0);
    let seconds: i64 = captures[3].parse().unwrap_or(0);
    TimeDelta::from_seconds(hours * 3600 + minutes * 60 + seconds)
}

#[cfg(test)]
mod tests {
    use super::{parse_time_delta, TimeDelta};

    #[test]
    fn new_normalizes_components() {
        let delta = TimeDelta::new(0, 90_000, 0);
        assert_eq!(delta.days(), 1);
        assert_eq!(delta.seconds(), 3_600);
    }

    #[test]
    fn negative_split_carries_sign_on_hours() {
        let delta = TimeDelta::new(-1, 3_600, 0);
        assert_eq!(delta.days(), -1);
        assert_eq!(delta.seconds(), 3_600);
        assert_eq!(delta.hours_minutes_seconds(), (-23, 0, 0));
    }

    #[test]
    fn sentinels_absorb_arithmetic() {
        assert_eq!(TimeDelta::MAX + TimeDelta::from_hours(5), TimeDelta::MAX);
        assert_eq!(TimeDelta::MIN - TimeDelta::from_hours(5), TimeDelta::MIN);
        assert_eq!(-TimeDelta::MAX, TimeDelta::MIN);
    }

    #[test]
    fn parse_accepts_unbounded_hours_and_rejects_garbage() {
        assert_eq!(parse_time_delta("100:30:15"), TimeDelta::new(0, 361_815, 0));
        assert_eq!(parse_time_delta("1:75:00"), TimeDelta::ZERO);
        assert_eq!(parse_time_delta("nope"), TimeDelta::ZERO);
    }
}
