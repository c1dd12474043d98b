//! Boundary to the authoritative clinic store.
//!
//! The agenda and the record editor only talk to a [`ClinicBackend`]. The
//! embedded [`Database`](crate::db::Database) and the REST [`HttpBackend`]
//! both implement it and answer with the same record shapes.

mod http;

pub use http::*;

use chrono::NaiveDate;
use thiserror::Error;

use crate::calendar::CalendarError;
use crate::db::DbError;
use crate::models::{
    Appointment, AppointmentPatch, ImplantRecord, NewAppointment, NewPatient, Patient,
};

/// Errors surfaced to the user. None are retried and none are fatal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A required field is missing or a value is not allowed
    #[error("Validation error: {0}")]
    Validation(String),

    /// The slot already holds its maximum number of appointments
    #[error("Slot full: {0}")]
    Capacity(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Transport or server failure, with the server's message when it sent one
    #[error("Remote error: {message}")]
    Remote { message: String },
}

pub type StoreResult<T> = Result<T, StoreError>;

impl StoreError {
    pub fn remote(message: impl Into<String>) -> Self {
        StoreError::Remote {
            message: message.into(),
        }
    }
}

impl From<DbError> for StoreError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::NotFound(what) => StoreError::NotFound(what),
            DbError::Capacity(what) => StoreError::Capacity(what),
            DbError::Constraint(what) => StoreError::Validation(what),
            other => StoreError::remote(other.to_string()),
        }
    }
}

impl From<CalendarError> for StoreError {
    fn from(e: CalendarError) -> Self {
        StoreError::Validation(e.to_string())
    }
}

/// The clinic API as seen by the core.
pub trait ClinicBackend {
    /// `GET /appointments?ambulatorio&data`
    fn list_appointments(&self, ambulatorio: &str, date: NaiveDate)
        -> StoreResult<Vec<Appointment>>;

    /// `GET /appointments/{id}`
    fn get_appointment(&self, id: &str) -> StoreResult<Appointment>;

    /// `POST /appointments`. Rejects with `Capacity` when the slot is full.
    fn create_appointment(&self, request: &NewAppointment) -> StoreResult<Appointment>;

    /// `PUT /appointments/{id}`
    fn update_appointment(&self, id: &str, patch: &AppointmentPatch) -> StoreResult<Appointment>;

    /// `DELETE /appointments/{id}`
    fn delete_appointment(&self, id: &str) -> StoreResult<()>;

    /// `GET /patients?ambulatorio&status`
    fn list_patients(&self, ambulatorio: &str, status: &str) -> StoreResult<Vec<Patient>>;

    /// `POST /patients`
    fn create_patient(&self, request: &NewPatient) -> StoreResult<Patient>;

    /// `GET /calendar/holidays?anno`, as ISO date strings.
    fn holidays(&self, year: i32) -> StoreResult<Vec<String>>;

    /// `GET /schede-impianto-picc?patient_id`
    fn list_implant_records(&self, patient_id: &str) -> StoreResult<Vec<ImplantRecord>>;

    /// `POST /schede-impianto-picc`. Attachments come back with server ids.
    fn create_implant_record(&self, record: &ImplantRecord) -> StoreResult<ImplantRecord>;

    /// `PUT /schede-impianto-picc/{id}`
    fn update_implant_record(&self, id: &str, record: &ImplantRecord)
        -> StoreResult<ImplantRecord>;

    /// `DELETE /schede-impianto-picc/{id}`
    fn delete_implant_record(&self, id: &str) -> StoreResult<()>;

    /// `GET /schede-impianto-picc/{id}/pdf`
    fn implant_record_pdf(&self, id: &str) -> StoreResult<Vec<u8>>;
}

macro_rules! forward_backend {
    ($($ptr:ty),*) => {$(
        impl<T: ClinicBackend + ?Sized> ClinicBackend for $ptr {
            fn list_appointments(&self, ambulatorio: &str, date: NaiveDate)
                -> StoreResult<Vec<Appointment>> {
                (**self).list_appointments(ambulatorio, date)
            }
            fn get_appointment(&self, id: &str) -> StoreResult<Appointment> {
                (**self).get_appointment(id)
            }
            fn create_appointment(&self, request: &NewAppointment) -> StoreResult<Appointment> {
                (**self).create_appointment(request)
            }
            fn update_appointment(&self, id: &str, patch: &AppointmentPatch)
                -> StoreResult<Appointment> {
                (**self).update_appointment(id, patch)
            }
            fn delete_appointment(&self, id: &str) -> StoreResult<()> {
                (**self).delete_appointment(id)
            }
            fn list_patients(&self, ambulatorio: &str, status: &str) -> StoreResult<Vec<Patient>> {
                (**self).list_patients(ambulatorio, status)
            }
            fn create_patient(&self, request: &NewPatient) -> StoreResult<Patient> {
                (**self).create_patient(request)
            }
            fn holidays(&self, year: i32) -> StoreResult<Vec<String>> {
                (**self).holidays(year)
            }
            fn list_implant_records(&self, patient_id: &str) -> StoreResult<Vec<ImplantRecord>> {
                (**self).list_implant_records(patient_id)
            }
            fn create_implant_record(&self, record: &ImplantRecord) -> StoreResult<ImplantRecord> {
                (**self).create_implant_record(record)
            }
            fn update_implant_record(&self, id: &str, record: &ImplantRecord)
                -> StoreResult<ImplantRecord> {
                (**self).update_implant_record(id, record)
            }
            fn delete_implant_record(&self, id: &str) -> StoreResult<()> {
                (**self).delete_implant_record(id)
            }
            fn implant_record_pdf(&self, id: &str) -> StoreResult<Vec<u8>> {
                (**self).implant_record_pdf(id)
            }
        }
    )*};
}

forward_backend!(&T, Box<T>, std::sync::Arc<T>);
