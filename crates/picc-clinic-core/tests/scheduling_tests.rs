//! Booking scenarios against the embedded store.

use chrono::NaiveDate;
use picc_clinic_core::calendar::{CalendarService, HolidaySet};
use picc_clinic_core::db::Database;
use picc_clinic_core::models::{AppointmentStatus, NewPatient, Patient, Slot, Track};
use picc_clinic_core::schedule::{Agenda, AppointmentStore, SlotGrid, WriteState};
use picc_clinic_core::StoreError;

fn monday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 10).unwrap()
}

fn services() -> Vec<String> {
    vec!["medicazione_semplice".to_string()]
}

fn add_patient(db: &Database, first: &str, last: &str) -> Patient {
    db.create_patient_from(&NewPatient::quick(first, last, None, "pta_centro"))
        .unwrap()
}

#[test]
fn test_third_booking_in_full_slot_is_refused() {
    let db = Database::open_in_memory().unwrap();
    let patients: Vec<Patient> = ["Rossi", "Verdi", "Bianchi"]
        .iter()
        .map(|last| add_patient(&db, "Anna", last))
        .collect();

    let mut store = AppointmentStore::new(db, SlotGrid::for_site("pta_centro", 2));
    store.load_day(monday()).unwrap();
    let slot = Slot::new("09:00", Track::Picc);

    for patient in &patients[..2] {
        store
            .create(Some(patient), monday(), &slot, &services())
            .unwrap();
    }
    assert_eq!(store.remaining(monday(), &slot), 0);

    let err = store
        .create(Some(&patients[2]), monday(), &slot, &services())
        .unwrap_err();
    assert!(matches!(err, StoreError::Capacity(_)));
    assert_eq!(store.for_slot(monday(), &slot).len(), 2);

    // Refused locally: never sent, so not tracked
    assert_eq!(store.writes().len(), 2);

    // The neighbouring track at the same time is independent
    let med = Slot::new("09:00", Track::Med);
    assert_eq!(store.remaining(monday(), &med), 2);
}

#[test]
fn test_stale_cache_booking_rejected_by_server() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("clinic.db");

    let db_a = Database::open(&path).unwrap();
    let db_b = Database::open(&path).unwrap();
    let first = add_patient(&db_a, "Mario", "Rossi");
    let second = add_patient(&db_a, "Luca", "Neri");
    let third = add_patient(&db_a, "Sara", "Conti");

    let slot = Slot::new("10:30", Track::Picc);
    let mut store_a = AppointmentStore::new(db_a, SlotGrid::for_site("pta_centro", 2));
    let mut store_b = AppointmentStore::new(db_b, SlotGrid::for_site("pta_centro", 2));
    store_a.load_day(monday()).unwrap();
    store_b.load_day(monday()).unwrap();

    store_a
        .create(Some(&first), monday(), &slot, &services())
        .unwrap();
    store_a
        .create(Some(&second), monday(), &slot, &services())
        .unwrap();

    // B still sees two free places and sends the booking
    assert_eq!(store_b.remaining(monday(), &slot), 2);
    let err = store_b
        .create(Some(&third), monday(), &slot, &services())
        .unwrap_err();
    assert!(matches!(err, StoreError::Capacity(_)));

    let last = store_b.writes().last().unwrap();
    assert!(matches!(last.state, WriteState::Rejected(StoreError::Capacity(_))));

    // The rejection refetched the day: B now sees A's two bookings
    assert_eq!(store_b.remaining(monday(), &slot), 0);
    let mut names: Vec<&str> = store_b
        .for_slot(monday(), &slot)
        .iter()
        .map(|a| a.patient_last_name.as_str())
        .collect();
    names.sort();
    assert_eq!(names, vec!["Neri", "Rossi"]);
}

#[test]
fn test_day_of_work_through_the_agenda() {
    let db = Database::open_in_memory().unwrap();
    db.replace_holidays(2024, &[NaiveDate::from_ymd_opt(2024, 6, 11).unwrap()])
        .unwrap();
    let patient = add_patient(&db, "Anna", "Verdi");
    let mut store = AppointmentStore::new(db, SlotGrid::for_site("pta_centro", 2));

    // Opened on a Saturday: snaps to Monday
    let mut agenda = Agenda::open(
        CalendarService::default(),
        NaiveDate::from_ymd_opt(2024, 6, 8).unwrap(),
    );
    agenda.refresh(&mut store).unwrap();
    assert_eq!(agenda.current_date(), monday());

    let slot = Slot::new("15:00", Track::Med);
    let booked = store
        .create(Some(&patient), monday(), &slot, &["catetere_vescicale".to_string()])
        .unwrap();
    let done = store
        .transition(&booked.id, AppointmentStatus::Done)
        .unwrap();
    assert_eq!(done.services, booked.services);

    // Tuesday is a holiday: next lands on Wednesday, whose grid is empty
    agenda.go_next().unwrap();
    agenda.refresh(&mut store).unwrap();
    assert_eq!(
        agenda.current_date(),
        NaiveDate::from_ymd_opt(2024, 6, 12).unwrap()
    );
    assert_eq!(agenda.board(&store).appointment_count(), 0);

    agenda.go_prev().unwrap();
    agenda.refresh(&mut store).unwrap();
    let board = agenda.board(&store);
    let cell = board.cell(&slot).unwrap();
    assert_eq!(cell.appointments[0].status, AppointmentStatus::Done);
    assert_eq!(cell.remaining, 1);
}

#[test]
fn test_holiday_set_for_other_year_does_not_apply() {
    let mut agenda = Agenda::open(
        CalendarService::default(),
        NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
    );
    agenda
        .set_holidays(HolidaySet::new(
            2024,
            [NaiveDate::from_ymd_opt(2024, 12, 25).unwrap()],
        ))
        .unwrap();
    // No set for 2025 yet: Jan 1 (a Wednesday) counts as working
    assert!(agenda.is_working_day());
    assert_eq!(agenda.needs_holidays_for(), Some(2025));
}
