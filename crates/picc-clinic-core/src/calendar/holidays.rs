//! Holiday sets, one per calendar year.

use std::collections::BTreeSet;

use chrono::{Datelike, NaiveDate};
use tracing::warn;

use super::{CalendarError, CalendarResult};

/// Holidays of a single year, as published by the clinic API.
///
/// Immutable once built; a refetch replaces the whole set. Dates outside
/// `year` are never holidays as far as this set is concerned.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HolidaySet {
    year: i32,
    dates: BTreeSet<NaiveDate>,
}

impl HolidaySet {
    pub fn new(year: i32, dates: impl IntoIterator<Item = NaiveDate>) -> Self {
        let dates = dates
            .into_iter()
            .filter(|d| {
                let in_year = d.year() == year;
                if !in_year {
                    warn!(date = %d, year, "Ignoring holiday outside its year");
                }
                in_year
            })
            .collect();
        Self { year, dates }
    }

    /// An empty set for `year` (nothing loaded yet, or no holidays).
    pub const fn empty(year: i32) -> Self {
        Self {
            year,
            dates: BTreeSet::new(),
        }
    }

    /// Build from the ISO `YYYY-MM-DD` strings returned by `/calendar/holidays`.
    pub fn from_iso_strings<S: AsRef<str>>(year: i32, dates: &[S]) -> CalendarResult<Self> {
        let parsed = dates
            .iter()
            .map(|s| {
                let s = s.as_ref().trim();
                NaiveDate::parse_from_str(s, "%Y-%m-%d")
                    .map_err(|_| CalendarError::InvalidDate(s.to_string()))
            })
            .collect::<CalendarResult<Vec<_>>>()?;
        Ok(Self::new(year, parsed))
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year && self.dates.contains(&date)
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &NaiveDate> {
        self.dates.iter()
    }

    /// ISO strings, in date order.
    pub fn to_iso_strings(&self) -> Vec<String> {
        self.dates
            .iter()
            .map(|d| d.format("%Y-%m-%d").to_string())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_iso_strings() {
        let set = HolidaySet::from_iso_strings(2024, &["2024-12-25", "2024-12-26"]).unwrap();
        assert_eq!(set.len(), 2);
        assert!(set.contains(date(2024, 12, 25)));
        assert!(!set.contains(date(2024, 12, 24)));
        assert_eq!(set.to_iso_strings(), vec!["2024-12-25", "2024-12-26"]);
    }

    #[test]
    fn test_invalid_date_rejected() {
        let result = HolidaySet::from_iso_strings(2024, &["2024-02-30"]);
        assert_eq!(
            result,
            Err(CalendarError::InvalidDate("2024-02-30".to_string()))
        );
    }

    #[test]
    fn test_other_year_dates_are_dropped() {
        let set = HolidaySet::new(2024, [date(2024, 1, 1), date(2025, 1, 1)]);
        assert_eq!(set.len(), 1);
        assert!(!set.contains(date(2025, 1, 1)));
    }
}
