//! Appointment database operations.
//!
//! Slot capacity is checked and the row inserted inside one IMMEDIATE
//! transaction, so concurrent writers cannot both take the last place.

use chrono::NaiveDate;
use rusqlite::{params, OptionalExtension, Row, Transaction, TransactionBehavior};
use tracing::{debug, info, warn};

use super::{Database, DbError, DbResult};
use crate::models::{Appointment, AppointmentPatch, AppointmentStatus, NewAppointment, Track};
use crate::schedule::catalogue_for;

const APPOINTMENT_SELECT: &str = r#"
    SELECT a.id, a.patient_id, COALESCE(p.nome, ''), COALESCE(p.cognome, ''),
           a.ambulatorio, a.data, a.ora, a.tipo, a.stato, a.prestazioni
    FROM appointments a
    LEFT JOIN patients p ON p.id = a.patient_id
"#;

impl Database {
    /// Book an appointment, enforcing slot capacity.
    pub fn insert_appointment(&self, request: &NewAppointment) -> DbResult<Appointment> {
        if request.services.is_empty() {
            return Err(DbError::Constraint("Select at least one service".into()));
        }
        check_catalogue(request.track, &request.services)?;

        let tx = Transaction::new_unchecked(&self.conn, TransactionBehavior::Immediate)?;

        let patient_exists: bool = tx
            .query_row(
                "SELECT 1 FROM patients WHERE id = ?",
                [&request.patient_id],
                |_| Ok(true),
            )
            .optional()?
            .unwrap_or(false);
        if !patient_exists {
            return Err(DbError::Constraint(format!(
                "Unknown patient: {}",
                request.patient_id
            )));
        }

        let data = date_to_string(request.date);
        let occupied: i64 = tx.query_row(
            r#"
            SELECT COUNT(*) FROM appointments
            WHERE ambulatorio = ?1 AND data = ?2 AND ora = ?3 AND tipo = ?4
            "#,
            params![request.ambulatorio, data, request.time, request.track.as_str()],
            |row| row.get(0),
        )?;

        if occupied as usize >= self.slot_capacity {
            warn!(
                ambulatorio = %request.ambulatorio,
                data = %data,
                slot = %request.slot(),
                occupied,
                "Rejecting booking: slot full"
            );
            return Err(DbError::Capacity(format!("{} {}", data, request.slot())));
        }

        let id = uuid::Uuid::new_v4().to_string();
        tx.execute(
            r#"
            INSERT INTO appointments (id, patient_id, ambulatorio, data, ora, tipo, stato, prestazioni)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                id,
                request.patient_id,
                request.ambulatorio,
                data,
                request.time,
                request.track.as_str(),
                AppointmentStatus::Pending.as_str(),
                serde_json::to_string(&request.services)?,
            ],
        )?;
        tx.commit()?;

        info!(appointment_id = %id, data = %data, slot = %request.slot(), "Appointment booked");
        self.get_appointment(&id)?
            .ok_or_else(|| DbError::NotFound(id.clone()))
    }

    /// Get an appointment by ID, with the patient's names filled in.
    pub fn get_appointment(&self, id: &str) -> DbResult<Option<Appointment>> {
        self.conn
            .query_row(
                &format!("{} WHERE a.id = ?", APPOINTMENT_SELECT),
                [id],
                AppointmentRow::from_row,
            )
            .optional()?
            .map(Appointment::try_from)
            .transpose()
    }

    /// All appointments of a site on a day, in slot order.
    pub fn list_appointments_on(&self, ambulatorio: &str, date: NaiveDate) -> DbResult<Vec<Appointment>> {
        let mut stmt = self.conn.prepare(&format!(
            "{} WHERE a.ambulatorio = ?1 AND a.data = ?2 ORDER BY a.ora, a.tipo, a.created_at",
            APPOINTMENT_SELECT
        ))?;

        let rows = stmt.query_map(
            params![ambulatorio, date_to_string(date)],
            AppointmentRow::from_row,
        )?;

        let mut appointments = Vec::new();
        for row in rows {
            appointments.push(row?.try_into()?);
        }
        debug!(ambulatorio, date = %date, count = appointments.len(), "Loaded day");
        Ok(appointments)
    }

    /// Apply a partial update. Absent fields are left as they are.
    pub fn patch_appointment(&self, id: &str, patch: &AppointmentPatch) -> DbResult<Appointment> {
        if let Some(services) = &patch.services {
            if services.is_empty() {
                return Err(DbError::Constraint("Select at least one service".into()));
            }
            let current = self
                .get_appointment(id)?
                .ok_or_else(|| DbError::NotFound(format!("appointment {}", id)))?;
            check_catalogue(current.track, services)?;
        }

        let services_json = patch
            .services
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let rows_affected = self.conn.execute(
            r#"
            UPDATE appointments SET
                stato = COALESCE(?2, stato),
                prestazioni = COALESCE(?3, prestazioni),
                updated_at = datetime('now')
            WHERE id = ?1
            "#,
            params![id, patch.status.map(|s| s.as_str()), services_json],
        )?;
        if rows_affected == 0 {
            return Err(DbError::NotFound(format!("appointment {}", id)));
        }

        self.get_appointment(id)?
            .ok_or_else(|| DbError::NotFound(format!("appointment {}", id)))
    }

    /// Delete an appointment.
    pub fn delete_appointment_by_id(&self, id: &str) -> DbResult<bool> {
        let rows_affected = self
            .conn
            .execute("DELETE FROM appointments WHERE id = ?", [id])?;
        Ok(rows_affected > 0)
    }
}

fn check_catalogue(track: Track, services: &[String]) -> DbResult<()> {
    let catalogue = catalogue_for(track);
    for (i, service) in services.iter().enumerate() {
        if !catalogue.iter().any(|d| d.id == service.as_str()) {
            return Err(DbError::Constraint(format!(
                "Service {} is not offered on the {} track",
                service, track
            )));
        }
        if services[..i].contains(service) {
            return Err(DbError::Constraint(format!("Service {} selected twice", service)));
        }
    }
    Ok(())
}

pub(super) fn date_to_string(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub(super) fn string_to_date(s: &str) -> Result<NaiveDate, DbError> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| DbError::Constraint(format!("Invalid date: {}", s)))
}

/// Intermediate row struct for database mapping.
struct AppointmentRow {
    id: String,
    patient_id: String,
    nome: String,
    cognome: String,
    ambulatorio: String,
    data: String,
    ora: String,
    tipo: String,
    stato: String,
    prestazioni: String,
}

impl AppointmentRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(AppointmentRow {
            id: row.get(0)?,
            patient_id: row.get(1)?,
            nome: row.get(2)?,
            cognome: row.get(3)?,
            ambulatorio: row.get(4)?,
            data: row.get(5)?,
            ora: row.get(6)?,
            tipo: row.get(7)?,
            stato: row.get(8)?,
            prestazioni: row.get(9)?,
        })
    }
}

impl TryFrom<AppointmentRow> for Appointment {
    type Error = DbError;

    fn try_from(row: AppointmentRow) -> Result<Self, Self::Error> {
        let track: Track = row.tipo.parse().map_err(DbError::Constraint)?;
        let status = AppointmentStatus::parse(&row.stato)
            .ok_or_else(|| DbError::Constraint(format!("Unknown status: {}", row.stato)))?;

        Ok(Appointment {
            id: row.id,
            patient_id: row.patient_id,
            patient_first_name: row.nome,
            patient_last_name: row.cognome,
            ambulatorio: row.ambulatorio,
            date: string_to_date(&row.data)?,
            time: row.ora,
            track,
            status,
            services: serde_json::from_str(&row.prestazioni)?,
        })
    }
}
