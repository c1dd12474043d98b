//! Working-day calendar: a weekend rule plus a per-year holiday set.
//!
//! All functions take their inputs explicitly. Nothing here reads the
//! system clock; callers pass "today" in.

mod holidays;
mod working_days;

pub use holidays::*;
pub use working_days::*;

use chrono::NaiveDate;
use thiserror::Error;

/// Calendar errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CalendarError {
    #[error("No working day within {searched_days} days of {from}")]
    NoWorkingDay { from: NaiveDate, searched_days: u32 },

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Date out of supported range")]
    OutOfRange,
}

pub type CalendarResult<T> = Result<T, CalendarError>;
