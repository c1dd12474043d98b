//! Booking and editing dialogs as plain state.
//!
//! Dropping a draft discards everything it holds; nothing is written until
//! `submit`/`save_services`/`set_status`/`delete` is called.

use chrono::NaiveDate;

use super::agenda::Agenda;
use super::lifecycle::StatusTransition;
use super::store::AppointmentStore;
use crate::backend::{ClinicBackend, StoreError, StoreResult};
use crate::models::{
    Appointment, AppointmentStatus, NewPatient, Patient, ServiceDescriptor, Slot, Track,
};

/// Patients bookable on `track` whose first or last name contains `query`.
pub fn search_patients<'a>(patients: &'a [Patient], query: &str, track: Track) -> Vec<&'a Patient> {
    patients
        .iter()
        .filter(|p| p.can_book_into(track) && p.matches_query(query))
        .collect()
}

fn toggle(services: &mut Vec<String>, id: &str) {
    match services.iter().position(|s| s == id) {
        Some(index) => {
            services.remove(index);
        }
        None => services.push(id.to_string()),
    }
}

/// State of the "new appointment" dialog for one slot.
#[derive(Debug, Clone, PartialEq)]
pub struct BookingDraft {
    date: NaiveDate,
    slot: Slot,
    query: String,
    patient: Option<Patient>,
    services: Vec<String>,
}

impl BookingDraft {
    /// Open the dialog for `slot` on the agenda's day. Refused on
    /// non-working days and on slots the cache already shows as full.
    pub fn open<B: ClinicBackend>(
        agenda: &Agenda,
        store: &AppointmentStore<B>,
        slot: Slot,
    ) -> StoreResult<Self> {
        let date = agenda.current_date();
        if !agenda.is_bookable() {
            return Err(StoreError::Validation(format!(
                "{} is not a working day",
                date
            )));
        }
        store.grid().check_slot(&slot)?;
        if store.remaining(date, &slot) == 0 {
            return Err(StoreError::Capacity(format!("{} {}", date, slot)));
        }
        Ok(Self {
            date,
            slot,
            query: String::new(),
            patient: None,
            services: Vec::new(),
        })
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn slot(&self) -> &Slot {
        &self.slot
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    /// Typing in the search box drops the current selection.
    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
        self.patient = None;
    }

    pub fn candidates<'a>(&self, patients: &'a [Patient]) -> Vec<&'a Patient> {
        search_patients(patients, &self.query, self.slot.track)
    }

    pub fn select_patient(&mut self, patient: Patient) {
        self.query = patient.display_name();
        self.patient = Some(patient);
    }

    pub fn selected_patient(&self) -> Option<&Patient> {
        self.patient.as_ref()
    }

    pub fn services_catalogue<B: ClinicBackend>(
        &self,
        store: &AppointmentStore<B>,
    ) -> &'static [ServiceDescriptor] {
        store.grid().services_catalogue_for(self.slot.track)
    }

    pub fn toggle_service(&mut self, id: &str) {
        toggle(&mut self.services, id);
    }

    pub fn services(&self) -> &[String] {
        &self.services
    }

    /// Create a patient from the dialog and select it. The track tag follows
    /// the slot.
    pub fn create_patient<B: ClinicBackend>(
        &mut self,
        store: &AppointmentStore<B>,
        first_name: &str,
        last_name: &str,
    ) -> StoreResult<Patient> {
        let request = NewPatient::quick(
            first_name.trim(),
            last_name.trim(),
            Some(self.slot.track),
            store.grid().ambulatorio(),
        );
        let missing = request.missing_fields();
        if !missing.is_empty() {
            return Err(StoreError::Validation(format!(
                "Missing required fields: {}",
                missing.join(", ")
            )));
        }
        let patient = store.backend().create_patient(&request)?;
        self.select_patient(patient.clone());
        Ok(patient)
    }

    /// Send the booking. On failure the draft is kept so the user can retry.
    pub fn submit<B: ClinicBackend>(
        &self,
        store: &mut AppointmentStore<B>,
    ) -> StoreResult<Appointment> {
        store.create(self.patient.as_ref(), self.date, &self.slot, &self.services)
    }
}

/// State of the "edit appointment" dialog.
#[derive(Debug, Clone, PartialEq)]
pub struct EditDraft {
    appointment: Appointment,
    services: Vec<String>,
}

impl EditDraft {
    pub fn open(appointment: Appointment) -> Self {
        let services = appointment.services.clone();
        Self {
            appointment,
            services,
        }
    }

    pub fn appointment(&self) -> &Appointment {
        &self.appointment
    }

    pub fn services(&self) -> &[String] {
        &self.services
    }

    pub fn toggle_service(&mut self, id: &str) {
        toggle(&mut self.services, id);
    }

    pub fn has_unsaved_services(&self) -> bool {
        self.services != self.appointment.services
    }

    /// How the appointment would look with `status`.
    pub fn preview_status(&self, status: AppointmentStatus) -> Appointment {
        StatusTransition::new(self.appointment.status, status).apply(&self.appointment)
    }

    pub fn save_services<B: ClinicBackend>(
        &mut self,
        store: &mut AppointmentStore<B>,
    ) -> StoreResult<Appointment> {
        let updated = store.replace_services(&self.appointment.id, &self.services)?;
        self.appointment = updated.clone();
        Ok(updated)
    }

    /// Status buttons write immediately; toggled services stay unsaved.
    pub fn set_status<B: ClinicBackend>(
        &mut self,
        store: &mut AppointmentStore<B>,
        status: AppointmentStatus,
    ) -> StoreResult<Appointment> {
        let updated = store.transition(&self.appointment.id, status)?;
        self.appointment = updated.clone();
        Ok(updated)
    }

    pub fn delete<B: ClinicBackend>(self, store: &mut AppointmentStore<B>) -> StoreResult<()> {
        store.delete(&self.appointment.id)
    }
}
