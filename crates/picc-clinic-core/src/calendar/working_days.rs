//! Working-day predicate and the next/previous working-day search.

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use super::{CalendarError, CalendarResult, HolidaySet};

/// Upper bound on the working-day search: three years of days.
pub const DEFAULT_MAX_SEARCH_DAYS: u32 = 3 * 366;

/// The two weekdays the clinic is closed every week.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekendRule(pub [Weekday; 2]);

impl Default for WeekendRule {
    fn default() -> Self {
        WeekendRule([Weekday::Sat, Weekday::Sun])
    }
}

impl WeekendRule {
    pub fn is_weekend(&self, date: NaiveDate) -> bool {
        self.0.contains(&date.weekday())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Forward,
    Backward,
}

/// Pure working-day arithmetic over a weekend rule and a holiday set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarService {
    weekend: WeekendRule,
    max_search_days: u32,
}

impl Default for CalendarService {
    fn default() -> Self {
        Self::new(WeekendRule::default(), DEFAULT_MAX_SEARCH_DAYS)
    }
}

impl CalendarService {
    pub fn new(weekend: WeekendRule, max_search_days: u32) -> Self {
        Self {
            weekend,
            max_search_days,
        }
    }

    pub fn weekend(&self) -> WeekendRule {
        self.weekend
    }

    /// False on weekend days and on dates in `holidays`.
    pub fn is_working_day(&self, date: NaiveDate, holidays: &HolidaySet) -> bool {
        !self.weekend.is_weekend(date) && !holidays.contains(date)
    }

    /// Smallest working day on or after `date`.
    pub fn next_working_day(
        &self,
        date: NaiveDate,
        holidays: &HolidaySet,
    ) -> CalendarResult<NaiveDate> {
        self.search(date, holidays, Direction::Forward)
    }

    /// Largest working day on or before `date`.
    pub fn previous_working_day(
        &self,
        date: NaiveDate,
        holidays: &HolidaySet,
    ) -> CalendarResult<NaiveDate> {
        self.search(date, holidays, Direction::Backward)
    }

    /// First working day strictly after `date`.
    pub fn following_working_day(
        &self,
        date: NaiveDate,
        holidays: &HolidaySet,
    ) -> CalendarResult<NaiveDate> {
        let start = date.succ_opt().ok_or(CalendarError::OutOfRange)?;
        self.next_working_day(start, holidays)
    }

    /// Last working day strictly before `date`.
    pub fn preceding_working_day(
        &self,
        date: NaiveDate,
        holidays: &HolidaySet,
    ) -> CalendarResult<NaiveDate> {
        let start = date.pred_opt().ok_or(CalendarError::OutOfRange)?;
        self.previous_working_day(start, holidays)
    }

    fn search(
        &self,
        from: NaiveDate,
        holidays: &HolidaySet,
        direction: Direction,
    ) -> CalendarResult<NaiveDate> {
        let mut current = from;
        for _ in 0..=self.max_search_days {
            if self.is_working_day(current, holidays) {
                return Ok(current);
            }
            let step = match direction {
                Direction::Forward => current.succ_opt(),
                Direction::Backward => current.pred_opt(),
            };
            current = step.ok_or(CalendarError::OutOfRange)?;
        }
        Err(CalendarError::NoWorkingDay {
            from,
            searched_days: self.max_search_days,
        })
    }
}
