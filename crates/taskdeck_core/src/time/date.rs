//! Calendar date with an explicit open-ended variant.
//!
//! # Responsibility
//! - Model "never / open-ended" dates without `Option` spreading through
//!   every signature.
//! - Provide weekday navigation, ISO week numbers and tolerant parsing.
//!
//! # Invariants
//! - `Infinite` absorbs date arithmetic and orders after every finite date.
//! - `Infinite - Infinite` is the zero duration.
//! - Parsing falls back to a caller-supplied default, never to an error.

use crate::time::delta::TimeDelta;
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt::{Display, Formatter};
use std::ops::{Add, Sub};

static DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4})-(\d{2})-(\d{2})$").expect("valid date regex"));

/// A calendar day, either a concrete date or the open-ended sentinel.
///
/// The derived ordering places `Infinite` after every finite date, which is
/// what due-date sorting relies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Date {
    Finite(NaiveDate),
    Infinite,
}

impl Date {
    /// Today's local date.
    pub fn today() -> Date {
        Date::Finite(chrono::Local::now().date_naive())
    }

    /// Creates a finite date, or `Infinite` when the components are not a
    /// real calendar day.
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Date {
        NaiveDate::from_ymd_opt(year, month, day)
            .map(Date::Finite)
            .unwrap_or(Date::Infinite)
    }

    /// Whether this is a concrete calendar day.
    pub fn is_finite(&self) -> bool {
        matches!(self, Date::Finite(_))
    }

    /// The underlying chrono date for finite values.
    pub fn naive(&self) -> Option<NaiveDate> {
        match self {
            Date::Finite(date) => Some(*date),
            Date::Infinite => None,
        }
    }

    /// The smallest finite date `>= self` whose weekday is `weekday`.
    ///
    /// `Infinite` stays `Infinite`; so does a finite date that would run off
    /// the calendar range.
    pub fn next_weekday(&self, weekday: Weekday) -> Date {
        let Date::Finite(start) = self else {
            return Date::Infinite;
        };
        let mut candidate = *start;
        while candidate.weekday() != weekday {
            match candidate.succ_opt() {
                Some(next) => candidate = next,
                None => return Date::Infinite,
            }
        }
        Date::Finite(candidate)
    }

    /// ISO 8601 week number, `None` for `Infinite`.
    pub fn week_number(&self) -> Option<u32> {
        self.naive().map(|date| date.iso_week().week())
    }
}

impl Add<TimeDelta> for Date {
    type Output = Date;

    /// Day-granular shift; the sub-day remainder of `delta` is ignored.
    /// Calendar overflow saturates to `Infinite`.
    fn add(self, delta: TimeDelta) -> Date {
        match self {
            Date::Infinite => Date::Infinite,
            Date::Finite(date) => date
                .checked_add_signed(Duration::days(delta.days()))
                .map(Date::Finite)
                .unwrap_or(Date::Infinite),
        }
    }
}

impl Sub for Date {
    type Output = TimeDelta;

    fn sub(self, other: Date) -> TimeDelta {
        match (self, other) {
            (Date::Infinite, Date::Infinite) => TimeDelta::ZERO,
            (Date::Infinite, Date::Finite(_)) => TimeDelta::MAX,
            (Date::Finite(_), Date::Infinite) => TimeDelta::MIN,
            (Date::Finite(this), Date::Finite(that)) => {
                TimeDelta::from_chrono(this.signed_duration_since(that))
            }
        }
    }
}

impl Display for Date {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Date::Finite(date) => write!(f, "{}", date.format("%Y-%m-%d")),
            Date::Infinite => write!(f, "infinite"),
        }
    }
}

/// Parses a `YYYY-MM-DD` date.
///
/// Anything that does not match the pattern, or names a day that does not
/// exist, yields `default` instead of an error.
pub fn parse_date(input: &str, default: Date) -> Date {
    let Some(captures) = DATE_RE.captures(input.trim()) else {
        return default;
    };
    let year: i32 = match captures[1].parse() {
        Ok(value) => value,
        Err(_) => return default,
    };
    let month: u32 = captures[2].parse().unwrap_or(0);
    let day: u32 = captures[3].parse().unwrap_or(0);
    NaiveDate::from_ymd_opt(year, month, day)
        .map(Date::Finite)
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::{parse_date, Date};
    use crate::time::delta::TimeDelta;
    use chrono::Weekday;

    #[test]
    fn infinite_absorbs_addition() {
        assert_eq!(Date::Infinite + TimeDelta::new(1, 0, 0), Date::Infinite);
    }

    #[test]
    fn leap_day_plus_one_day() {
        let date = parse_date("2020-02-29", Date::Infinite);
        assert_eq!(date + TimeDelta::new(1, 0, 0), Date::from_ymd(2020, 3, 1));
    }

    #[test]
    fn parse_falls_back_to_default() {
        assert_eq!(parse_date("nope", Date::Infinite), Date::Infinite);
        assert_eq!(
            parse_date("2021-02-30", Date::from_ymd(2021, 1, 1)),
            Date::from_ymd(2021, 1, 1)
        );
    }

    #[test]
    fn subtraction_covers_all_variant_pairs() {
        assert_eq!(Date::Infinite - Date::Infinite, TimeDelta::ZERO);
        assert_eq!(Date::Infinite - Date::from_ymd(2021, 1, 1), TimeDelta::MAX);
        assert_eq!(Date::from_ymd(2021, 1, 1) - Date::Infinite, TimeDelta::MIN);
        assert_eq!(
            Date::from_ymd(2021, 1, 3) - Date::from_ymd(2021, 1, 1),
            TimeDelta::new(2, 0, 0)
        );
    }

    #[test]
    fn next_weekday_includes_self() {
        let friday = Date::from_ymd(2021, 1, 1);
        assert_eq!(friday.next_weekday(Weekday::Fri), friday);
        assert_eq!(
            friday.next_weekday(Weekday::Mon),
            Date::from_ymd(2021, 1, 4)
        );
        assert_eq!(friday.week_number(), Some(53));
    }
}
