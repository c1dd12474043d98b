//! Day navigation and the slot board of the displayed day.
//!
//! The displayed date is a value owned by [`Agenda`]; nothing reads the
//! clock. Callers pass "today" in.

use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use tracing::{debug, info};

use super::store::AppointmentStore;
use crate::backend::{ClinicBackend, StoreError, StoreResult};
use crate::calendar::{CalendarResult, CalendarService, HolidaySet};
use crate::models::{Appointment, Slot, Track};

/// Stands in while no set is loaded. Matches no date.
static NO_HOLIDAYS: HolidaySet = HolidaySet::empty(0);

/// One (time, track) cell of the board.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlotCell {
    pub slot: Slot,
    pub appointments: Vec<Appointment>,
    pub remaining: usize,
    /// Whether the "add" affordance is shown
    pub can_add: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlotRow {
    pub time: &'static str,
    pub cells: Vec<SlotCell>,
}

/// The grid for one day, time-major.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlotBoard {
    pub date: NaiveDate,
    pub working_day: bool,
    pub tracks: Vec<Track>,
    pub rows: Vec<SlotRow>,
}

impl SlotBoard {
    pub fn cell(&self, slot: &Slot) -> Option<&SlotCell> {
        self.rows
            .iter()
            .flat_map(|row| row.cells.iter())
            .find(|cell| &cell.slot == slot)
    }

    pub fn appointment_count(&self) -> usize {
        self.rows
            .iter()
            .flat_map(|row| row.cells.iter())
            .map(|cell| cell.appointments.len())
            .sum()
    }
}

/// Navigator over working days.
#[derive(Debug, Clone)]
pub struct Agenda {
    calendar: CalendarService,
    current: NaiveDate,
    holidays: Option<HolidaySet>,
    /// Snap to a working day once the first holiday set arrives
    snap_pending: bool,
}

impl Agenda {
    /// Start on `today`. The date snaps to the next working day as soon as
    /// the holidays of its year are known.
    pub fn open(calendar: CalendarService, today: NaiveDate) -> Self {
        Self {
            calendar,
            current: today,
            holidays: None,
            snap_pending: true,
        }
    }

    pub fn current_date(&self) -> NaiveDate {
        self.current
    }

    pub fn calendar(&self) -> &CalendarService {
        &self.calendar
    }

    /// Holidays of the displayed year, if they have been loaded.
    pub fn holidays(&self) -> Option<&HolidaySet> {
        self.holidays
            .as_ref()
            .filter(|set| set.year() == self.current.year())
    }

    /// The year whose holidays must be fetched, if the loaded set is stale.
    pub fn needs_holidays_for(&self) -> Option<i32> {
        match &self.holidays {
            Some(set) if set.year() == self.current.year() => None,
            _ => Some(self.current.year()),
        }
    }

    /// Replace the holiday set wholesale.
    pub fn set_holidays(&mut self, holidays: HolidaySet) -> CalendarResult<()> {
        debug!(year = holidays.year(), count = holidays.len(), "Holidays replaced");
        let matches_year = holidays.year() == self.current.year();
        self.holidays = Some(holidays);
        if self.snap_pending && matches_year {
            self.current = self
                .calendar
                .next_working_day(self.current, self.active_holidays())?;
            self.snap_pending = false;
        }
        Ok(())
    }

    pub fn is_working_day(&self) -> bool {
        self.calendar
            .is_working_day(self.current, self.active_holidays())
    }

    /// New bookings are refused on non-working days.
    pub fn is_bookable(&self) -> bool {
        self.is_working_day()
    }

    pub fn go_today(&mut self, today: NaiveDate) -> CalendarResult<NaiveDate> {
        self.snap_pending = false;
        self.current = self
            .calendar
            .next_working_day(today, self.active_holidays())?;
        Ok(self.current)
    }

    pub fn go_next(&mut self) -> CalendarResult<NaiveDate> {
        self.snap_pending = false;
        self.current = self
            .calendar
            .following_working_day(self.current, self.active_holidays())?;
        Ok(self.current)
    }

    pub fn go_prev(&mut self) -> CalendarResult<NaiveDate> {
        self.snap_pending = false;
        self.current = self
            .calendar
            .preceding_working_day(self.current, self.active_holidays())?;
        Ok(self.current)
    }

    /// Jump to any date, working or not (date picker).
    pub fn go_to(&mut self, date: NaiveDate) -> NaiveDate {
        self.snap_pending = false;
        self.current = date;
        self.current
    }

    /// Fetch holidays if the year changed, then reload the displayed day.
    pub fn refresh<B: ClinicBackend>(&mut self, store: &mut AppointmentStore<B>) -> StoreResult<()> {
        if let Some(year) = self.needs_holidays_for() {
            let dates = store.backend().holidays(year)?;
            let holidays = HolidaySet::from_iso_strings(year, &dates)
                .map_err(|e| StoreError::remote(e.to_string()))?;
            info!(year, count = holidays.len(), "Fetched holidays");
            self.set_holidays(holidays)?;
        }
        store.load_day(self.current)?;
        Ok(())
    }

    /// Cells for the displayed day, from the store's cache.
    pub fn board<B: ClinicBackend>(&self, store: &AppointmentStore<B>) -> SlotBoard {
        let working_day = self.is_working_day();
        let grid = store.grid();
        let rows = super::grid::TIME_SLOTS
            .iter()
            .map(|&time| SlotRow {
                time,
                cells: grid
                    .tracks()
                    .iter()
                    .map(|track| {
                        let slot = Slot::new(time, *track);
                        let appointments: Vec<Appointment> = store
                            .for_slot(self.current, &slot)
                            .into_iter()
                            .cloned()
                            .collect();
                        let remaining = store.remaining(self.current, &slot);
                        SlotCell {
                            slot,
                            appointments,
                            remaining,
                            can_add: working_day && remaining > 0,
                        }
                    })
                    .collect(),
            })
            .collect();

        SlotBoard {
            date: self.current,
            working_day,
            tracks: grid.tracks().to_vec(),
            rows,
        }
    }

    /// A set never marks dates outside its own year, so the loaded one can
    /// be consulted for any date.
    fn active_holidays(&self) -> &HolidaySet {
        self.holidays.as_ref().unwrap_or(&NO_HOLIDAYS)
    }
}
