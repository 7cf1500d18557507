//! Calendar date and duration vocabulary shared by the whole domain model.
//!
//! # Responsibility
//! - Provide a calendar `Date` with an explicit open-ended variant.
//! - Provide a normalized signed `TimeDelta` closed under arithmetic.
//!
//! # Invariants
//! - `Date::Infinite` absorbs additions and orders after every finite date.
//! - `TimeDelta` components stay normalized (`seconds` and `micros`
//!   non-negative) through every operation.

pub mod date;
pub mod delta;

pub use date::{parse_date, Date};
pub use delta::{parse_time_delta, TimeDelta};
