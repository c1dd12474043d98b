//! The embedded database as a [`ClinicBackend`].

use chrono::NaiveDate;

use super::Database;
use crate::backend::{ClinicBackend, StoreError, StoreResult};
use crate::models::{
    Appointment, AppointmentPatch, ImplantRecord, NewAppointment, NewPatient, Patient,
};

impl ClinicBackend for Database {
    fn list_appointments(
        &self,
        ambulatorio: &str,
        date: NaiveDate,
    ) -> StoreResult<Vec<Appointment>> {
        Ok(self.list_appointments_on(ambulatorio, date)?)
    }

    fn get_appointment(&self, id: &str) -> StoreResult<Appointment> {
        self.get_appointment(id)?
            .ok_or_else(|| StoreError::NotFound(format!("appointment {}", id)))
    }

    fn create_appointment(&self, request: &NewAppointment) -> StoreResult<Appointment> {
        Ok(self.insert_appointment(request)?)
    }

    fn update_appointment(&self, id: &str, patch: &AppointmentPatch) -> StoreResult<Appointment> {
        Ok(self.patch_appointment(id, patch)?)
    }

    fn delete_appointment(&self, id: &str) -> StoreResult<()> {
        if self.delete_appointment_by_id(id)? {
            Ok(())
        } else {
            Err(StoreError::NotFound(format!("appointment {}", id)))
        }
    }

    fn list_patients(&self, ambulatorio: &str, status: &str) -> StoreResult<Vec<Patient>> {
        Ok(self.list_patients_at(ambulatorio, status)?)
    }

    fn create_patient(&self, request: &NewPatient) -> StoreResult<Patient> {
        Ok(self.create_patient_from(request)?)
    }

    fn holidays(&self, year: i32) -> StoreResult<Vec<String>> {
        Ok(self.holidays_for_year(year)?)
    }

    fn list_implant_records(&self, patient_id: &str) -> StoreResult<Vec<ImplantRecord>> {
        Ok(self.list_implant_records_for(patient_id)?)
    }

    fn create_implant_record(&self, record: &ImplantRecord) -> StoreResult<ImplantRecord> {
        Ok(self.insert_implant_record(record)?)
    }

    fn update_implant_record(
        &self,
        id: &str,
        record: &ImplantRecord,
    ) -> StoreResult<ImplantRecord> {
        Ok(self.replace_implant_record(id, record)?)
    }

    fn delete_implant_record(&self, id: &str) -> StoreResult<()> {
        if self.delete_implant_record_by_id(id)? {
            Ok(())
        } else {
            Err(StoreError::NotFound(format!("implant record {}", id)))
        }
    }

    fn implant_record_pdf(&self, id: &str) -> StoreResult<Vec<u8>> {
        if self.get_implant_record(id)?.is_none() {
            return Err(StoreError::NotFound(format!("implant record {}", id)));
        }
        Err(StoreError::remote(
            "PDF export is only available from the clinic server",
        ))
    }
}
