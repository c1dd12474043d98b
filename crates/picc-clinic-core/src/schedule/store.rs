//! Day-scoped appointment cache in front of the authoritative backend.
//!
//! The local capacity check only gives early feedback. A booking is final
//! once the backend confirms it. When the backend reports the slot full, the
//! cached day is refetched so the grid shows the places actually taken.

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use super::grid::SlotGrid;
use super::lifecycle::StatusTransition;
use crate::backend::{ClinicBackend, StoreError, StoreResult};
use crate::models::{
    Appointment, AppointmentPatch, AppointmentStatus, NewAppointment, Patient, Slot,
};

/// Settled writes kept for inspection. Older ones are dropped first.
pub const MAX_SETTLED_WRITES: usize = 32;

/// Outcome of a booking sent to the backend.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteState {
    /// Sent, not yet answered
    Pending,
    Confirmed(Appointment),
    Rejected(StoreError),
}

/// A booking attempt and where it stands.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedWrite {
    pub seq: u64,
    pub request: NewAppointment,
    pub state: WriteState,
}

pub struct AppointmentStore<B: ClinicBackend> {
    backend: B,
    grid: SlotGrid,
    day: Option<NaiveDate>,
    cache: Vec<Appointment>,
    writes: Vec<TrackedWrite>,
    next_seq: u64,
}

impl<B: ClinicBackend> AppointmentStore<B> {
    pub fn new(backend: B, grid: SlotGrid) -> Self {
        Self {
            backend,
            grid,
            day: None,
            cache: Vec::new(),
            writes: Vec::new(),
            next_seq: 1,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn grid(&self) -> &SlotGrid {
        &self.grid
    }

    /// The day currently held in the cache.
    pub fn loaded_day(&self) -> Option<NaiveDate> {
        self.day
    }

    /// Refetch `date` and replace the cache wholesale.
    pub fn load_day(&mut self, date: NaiveDate) -> StoreResult<&[Appointment]> {
        let appointments = self
            .backend
            .list_appointments(self.grid.ambulatorio(), date)?;
        debug!(
            ambulatorio = self.grid.ambulatorio(),
            date = %date,
            count = appointments.len(),
            "Reloaded day"
        );
        self.cache = appointments;
        self.day = Some(date);
        Ok(&self.cache)
    }

    /// All appointments on `date`, fetching the day if it is not the cached one.
    pub fn appointments_on(&mut self, date: NaiveDate) -> StoreResult<&[Appointment]> {
        if self.day != Some(date) {
            self.load_day(date)?;
        }
        Ok(&self.cache)
    }

    /// Cached appointments occupying `slot` on `date`.
    pub fn for_slot(&self, date: NaiveDate, slot: &Slot) -> Vec<&Appointment> {
        self.cache
            .iter()
            .filter(|a| a.occupies(date, slot))
            .collect()
    }

    /// Places left in `slot` according to the cache.
    pub fn remaining(&self, date: NaiveDate, slot: &Slot) -> usize {
        self.grid
            .capacity_of(slot)
            .saturating_sub(self.for_slot(date, slot).len())
    }

    pub fn get(&self, id: &str) -> Option<&Appointment> {
        self.cache.iter().find(|a| a.id == id)
    }

    /// Book `patient` into `slot` on `date`.
    ///
    /// Validation and the cached capacity check happen before anything is
    /// sent. The backend has the final word on capacity.
    pub fn create(
        &mut self,
        patient: Option<&Patient>,
        date: NaiveDate,
        slot: &Slot,
        services: &[String],
    ) -> StoreResult<Appointment> {
        let patient =
            patient.ok_or_else(|| StoreError::Validation("Select a patient".to_string()))?;
        self.grid.check_slot(slot)?;
        if !patient.can_book_into(slot.track) {
            return Err(StoreError::Validation(format!(
                "{} cannot be booked on the {} track",
                patient.display_name(),
                slot.track
            )));
        }
        self.grid.validate_services(slot.track, services)?;

        if self.day == Some(date) && self.remaining(date, slot) == 0 {
            return Err(StoreError::Capacity(format!("{} {}", date, slot)));
        }

        let request = NewAppointment {
            patient_id: patient.id.clone(),
            ambulatorio: self.grid.ambulatorio().to_string(),
            date,
            time: slot.time.clone(),
            track: slot.track,
            services: services.to_vec(),
        };
        let index = self.track_write(request.clone());

        match self.backend.create_appointment(&request) {
            Ok(created) => {
                info!(appointment_id = %created.id, date = %date, slot = %slot, "Booking confirmed");
                if self.day == Some(created.date) {
                    self.upsert(created.clone());
                }
                self.settle(index, WriteState::Confirmed(created.clone()));
                Ok(created)
            }
            Err(e) => {
                self.settle(index, WriteState::Rejected(e.clone()));
                if matches!(e, StoreError::Capacity(_)) {
                    warn!(date = %date, slot = %slot, "Booking rejected by server: slot full");
                    if self.day == Some(date) {
                        if let Err(reload) = self.load_day(date) {
                            warn!(date = %date, error = %reload, "Could not refresh day after rejection");
                        }
                    }
                }
                Err(e)
            }
        }
    }

    /// Set the status of an appointment. Services are untouched.
    pub fn transition(&mut self, id: &str, status: AppointmentStatus) -> StoreResult<Appointment> {
        if let Some(current) = self.get(id) {
            let transition = StatusTransition::new(current.status, status);
            if transition.is_noop() {
                return Ok(current.clone());
            }
            debug!(
                appointment_id = %id,
                from = transition.from.as_str(),
                to = transition.to.as_str(),
                "Status transition"
            );
        }

        let updated = self
            .backend
            .update_appointment(id, &AppointmentPatch::status(status))?;
        self.upsert(updated.clone());
        Ok(updated)
    }

    /// Replace the selected services. Empty lists are refused before any write.
    pub fn replace_services(&mut self, id: &str, services: &[String]) -> StoreResult<Appointment> {
        if services.is_empty() {
            return Err(StoreError::Validation(
                "Select at least one service".to_string(),
            ));
        }
        let track = match self.get(id) {
            Some(current) => current.track,
            None => self.backend.get_appointment(id)?.track,
        };
        self.grid.validate_services(track, services)?;

        let updated = self
            .backend
            .update_appointment(id, &AppointmentPatch::services(services.to_vec()))?;
        debug!(appointment_id = %id, services = ?services, "Services replaced");
        self.upsert(updated.clone());
        Ok(updated)
    }

    pub fn delete(&mut self, id: &str) -> StoreResult<()> {
        self.backend.delete_appointment(id)?;
        self.cache.retain(|a| a.id != id);
        info!(appointment_id = %id, "Appointment deleted");
        Ok(())
    }

    /// Recent booking attempts made through this store, oldest first.
    pub fn writes(&self) -> &[TrackedWrite] {
        &self.writes
    }

    fn track_write(&mut self, request: NewAppointment) -> usize {
        self.writes.push(TrackedWrite {
            seq: self.next_seq,
            request,
            state: WriteState::Pending,
        });
        self.next_seq += 1;
        self.writes.len() - 1
    }

    fn settle(&mut self, index: usize, state: WriteState) {
        self.writes[index].state = state;
        let settled = self
            .writes
            .iter()
            .filter(|w| w.state != WriteState::Pending)
            .count();
        let mut excess = settled.saturating_sub(MAX_SETTLED_WRITES);
        self.writes.retain(|w| {
            if excess > 0 && w.state != WriteState::Pending {
                excess -= 1;
                false
            } else {
                true
            }
        });
    }

    fn upsert(&mut self, appointment: Appointment) {
        if self.day != Some(appointment.date) {
            self.cache.retain(|a| a.id != appointment.id);
            return;
        }
        match self.cache.iter_mut().find(|a| a.id == appointment.id) {
            Some(existing) => *existing = appointment,
            None => self.cache.push(appointment),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::models::{NewPatient, Track, TrackTag};

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 10).unwrap()
    }

    fn setup() -> (AppointmentStore<Database>, Vec<Patient>) {
        let db = Database::open_in_memory().unwrap();
        let patients = ["Rossi", "Verdi", "Bianchi"]
            .iter()
            .map(|surname| {
                db.create_patient_from(&NewPatient::quick("Anna", *surname, None, "pta_centro"))
                    .unwrap()
            })
            .collect();
        let store = AppointmentStore::new(db, SlotGrid::for_site("pta_centro", 2));
        (store, patients)
    }

    fn picc_nine() -> Slot {
        Slot::new("09:00", Track::Picc)
    }

    fn services() -> Vec<String> {
        vec!["medicazione_semplice".to_string()]
    }

    #[test]
    fn test_create_until_full() {
        let (mut store, patients) = setup();
        store.load_day(monday()).unwrap();

        let first = store
            .create(Some(&patients[0]), monday(), &picc_nine(), &services())
            .unwrap();
        assert_eq!(first.status, AppointmentStatus::Pending);
        store
            .create(Some(&patients[1]), monday(), &picc_nine(), &services())
            .unwrap();
        assert_eq!(store.remaining(monday(), &picc_nine()), 0);

        let third = store.create(Some(&patients[2]), monday(), &picc_nine(), &services());
        assert!(matches!(third, Err(StoreError::Capacity(_))));
        assert_eq!(store.for_slot(monday(), &picc_nine()).len(), 2);
        // The local check refused it; nothing was sent
        assert_eq!(store.writes().len(), 2);
    }

    #[test]
    fn test_validation_errors() {
        let (mut store, patients) = setup();
        store.load_day(monday()).unwrap();

        assert!(matches!(
            store.create(None, monday(), &picc_nine(), &services()),
            Err(StoreError::Validation(_))
        ));
        assert!(matches!(
            store.create(Some(&patients[0]), monday(), &picc_nine(), &[]),
            Err(StoreError::Validation(_))
        ));
        assert!(matches!(
            store.create(
                Some(&patients[0]),
                monday(),
                &Slot::new("14:00", Track::Picc),
                &services()
            ),
            Err(StoreError::Validation(_))
        ));
        assert!(store.load_day(monday()).unwrap().is_empty());
        assert!(store.writes().is_empty());
    }

    #[test]
    fn test_track_tag_is_enforced() {
        let (mut store, mut patients) = setup();
        store.load_day(monday()).unwrap();
        let med_slot = Slot::new("10:00", Track::Med);

        let result = store.create(Some(&patients[0]), monday(), &med_slot, &services());
        assert!(matches!(result, Err(StoreError::Validation(_))));

        patients[0].track_tag = TrackTag::PiccMed;
        assert!(store
            .create(Some(&patients[0]), monday(), &med_slot, &services())
            .is_ok());
    }

    #[test]
    fn test_write_states_are_tracked() {
        let (mut store, patients) = setup();
        let created = store
            .create(Some(&patients[0]), monday(), &picc_nine(), &services())
            .unwrap();
        assert_eq!(store.writes()[0].state, WriteState::Confirmed(created));

        let ghost = Patient {
            id: "ghost".into(),
            ..patients[1].clone()
        };
        let rejected = store.create(Some(&ghost), monday(), &picc_nine(), &services());
        assert!(rejected.is_err());
        assert!(matches!(store.writes()[1].state, WriteState::Rejected(_)));
    }

    #[test]
    fn test_settled_writes_are_capped() {
        let (mut store, patients) = setup();
        let ghost = Patient {
            id: "ghost".into(),
            ..patients[0].clone()
        };
        for _ in 0..40 {
            assert!(store
                .create(Some(&ghost), monday(), &picc_nine(), &services())
                .is_err());
        }
        let writes = store.writes();
        assert_eq!(writes.len(), MAX_SETTLED_WRITES);
        assert_eq!(writes.first().unwrap().seq, 9);
        assert_eq!(writes.last().unwrap().seq, 40);

        let created = store
            .create(Some(&patients[0]), monday(), &picc_nine(), &services())
            .unwrap();
        assert_eq!(store.writes().len(), MAX_SETTLED_WRITES);
        assert_eq!(
            store.writes().last().unwrap().state,
            WriteState::Confirmed(created)
        );
    }

    #[test]
    fn test_server_full_slot_refreshes_day() {
        let (mut store, patients) = setup();
        store.load_day(monday()).unwrap();

        // Another desk fills the slot behind this store's back
        for patient in &patients[..2] {
            store
                .backend()
                .insert_appointment(&NewAppointment {
                    patient_id: patient.id.clone(),
                    ambulatorio: "pta_centro".into(),
                    date: monday(),
                    time: "09:00".into(),
                    track: Track::Picc,
                    services: services(),
                })
                .unwrap();
        }
        assert_eq!(store.remaining(monday(), &picc_nine()), 2);

        let err = store
            .create(Some(&patients[2]), monday(), &picc_nine(), &services())
            .unwrap_err();
        assert!(matches!(err, StoreError::Capacity(_)));
        assert_eq!(store.remaining(monday(), &picc_nine()), 0);
        assert_eq!(store.for_slot(monday(), &picc_nine()).len(), 2);
        assert!(matches!(
            store.writes().last().unwrap().state,
            WriteState::Rejected(StoreError::Capacity(_))
        ));
    }

    #[test]
    fn test_transition_keeps_services() {
        let (mut store, patients) = setup();
        store.load_day(monday()).unwrap();
        let mut svc = services();
        svc.push("irrigazione_catetere".into());
        let appt = store
            .create(Some(&patients[0]), monday(), &picc_nine(), &svc)
            .unwrap();

        for status in [
            AppointmentStatus::Done,
            AppointmentStatus::Pending,
            AppointmentStatus::NoShow,
        ] {
            let updated = store.transition(&appt.id, status).unwrap();
            assert_eq!(updated.status, status);
            assert_eq!(updated.services, svc);
            assert_eq!(store.get(&appt.id).unwrap().status, status);
        }
    }

    #[test]
    fn test_transition_unknown_id() {
        let (mut store, _) = setup();
        let result = store.transition("missing", AppointmentStatus::Done);
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[test]
    fn test_replace_services() {
        let (mut store, patients) = setup();
        store.load_day(monday()).unwrap();
        let appt = store
            .create(Some(&patients[0]), monday(), &picc_nine(), &services())
            .unwrap();

        let result = store.replace_services(&appt.id, &[]);
        assert!(matches!(result, Err(StoreError::Validation(_))));
        assert_eq!(store.get(&appt.id).unwrap().services, services());

        let updated = store
            .replace_services(&appt.id, &["irrigazione_catetere".to_string()])
            .unwrap();
        assert_eq!(updated.services, vec!["irrigazione_catetere".to_string()]);
    }

    #[test]
    fn test_replace_services_checks_catalogue_off_the_loaded_day() {
        let (mut store, patients) = setup();
        store.load_day(monday()).unwrap();
        let appt = store
            .create(Some(&patients[0]), monday(), &picc_nine(), &services())
            .unwrap();

        let tuesday = monday().succ_opt().unwrap();
        store.load_day(tuesday).unwrap();
        assert!(store.get(&appt.id).is_none());

        for bad in ["catetere_vescicale", "not_a_service"] {
            let result = store.replace_services(&appt.id, &[bad.to_string()]);
            assert!(matches!(result, Err(StoreError::Validation(_))));
        }
        assert!(matches!(
            store.replace_services("missing", &services()),
            Err(StoreError::NotFound(_))
        ));

        store.load_day(monday()).unwrap();
        assert_eq!(store.get(&appt.id).unwrap().services, services());
    }

    #[test]
    fn test_delete_frees_the_slot() {
        let (mut store, patients) = setup();
        store.load_day(monday()).unwrap();
        let appt = store
            .create(Some(&patients[0]), monday(), &picc_nine(), &services())
            .unwrap();
        store.delete(&appt.id).unwrap();
        assert_eq!(store.remaining(monday(), &picc_nine()), 2);
        assert!(matches!(
            store.delete(&appt.id),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn test_appointments_on_refetches_other_days() {
        let (mut store, patients) = setup();
        store
            .create(Some(&patients[0]), monday(), &picc_nine(), &services())
            .unwrap();
        let tuesday = monday().succ_opt().unwrap();
        assert!(store.appointments_on(tuesday).unwrap().is_empty());
        assert_eq!(store.appointments_on(monday()).unwrap().len(), 1);
        assert_eq!(store.loaded_day(), Some(monday()));
    }
}
