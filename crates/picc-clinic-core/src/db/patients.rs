//! Patient database operations.

use rusqlite::{params, OptionalExtension, Row};

use super::{Database, DbError, DbResult};
use crate::models::{NewPatient, Patient, TrackTag};

const PATIENT_COLUMNS: &str = "id, nome, cognome, tipo, ambulatorio, status";

impl Database {
    /// Insert a new patient.
    pub fn insert_patient(&self, patient: &Patient) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO patients (id, nome, cognome, tipo, ambulatorio, status)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                patient.id,
                patient.first_name,
                patient.last_name,
                tag_to_string(patient.track_tag),
                patient.ambulatorio,
                patient.status,
            ],
        )?;
        Ok(())
    }

    /// Validate and insert a patient from a quick-creation request.
    pub fn create_patient_from(&self, request: &NewPatient) -> DbResult<Patient> {
        let missing = request.missing_fields();
        if !missing.is_empty() {
            return Err(DbError::Constraint(format!(
                "Missing required fields: {}",
                missing.join(", ")
            )));
        }
        let patient = Patient::from_request(request);
        self.insert_patient(&patient)?;
        Ok(patient)
    }

    /// Get a patient by ID.
    pub fn get_patient(&self, id: &str) -> DbResult<Option<Patient>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM patients WHERE id = ?", PATIENT_COLUMNS),
                [id],
                PatientRow::from_row,
            )
            .optional()?
            .map(Patient::try_from)
            .transpose()
    }

    /// Patients of a site with the given status, ordered by surname.
    pub fn list_patients_at(&self, ambulatorio: &str, status: &str) -> DbResult<Vec<Patient>> {
        let mut stmt = self.conn.prepare(&format!(
            r#"
            SELECT {}
            FROM patients
            WHERE ambulatorio = ?1 AND status = ?2
            ORDER BY cognome, nome
            "#,
            PATIENT_COLUMNS
        ))?;

        let rows = stmt.query_map(params![ambulatorio, status], PatientRow::from_row)?;

        let mut patients = Vec::new();
        for row in rows {
            patients.push(row?.try_into()?);
        }
        Ok(patients)
    }

    /// Search patients by name (substring match on first or last name).
    pub fn search_patients(&self, ambulatorio: &str, query: &str, limit: usize) -> DbResult<Vec<Patient>> {
        let pattern = format!("%{}%", query.trim());
        let mut stmt = self.conn.prepare(&format!(
            r#"
            SELECT {}
            FROM patients
            WHERE ambulatorio = ?1 AND (nome LIKE ?2 OR cognome LIKE ?2)
            ORDER BY cognome, nome
            LIMIT ?3
            "#,
            PATIENT_COLUMNS
        ))?;

        let rows = stmt.query_map(
            params![ambulatorio, pattern, limit as i64],
            PatientRow::from_row,
        )?;

        let mut patients = Vec::new();
        for row in rows {
            patients.push(row?.try_into()?);
        }
        Ok(patients)
    }

    /// Delete a patient.
    pub fn delete_patient(&self, id: &str) -> DbResult<bool> {
        let rows_affected = self.conn.execute("DELETE FROM patients WHERE id = ?", [id])?;
        Ok(rows_affected > 0)
    }
}

/// Intermediate row struct for database mapping.
struct PatientRow {
    id: String,
    nome: String,
    cognome: String,
    tipo: String,
    ambulatorio: String,
    status: String,
}

impl PatientRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(PatientRow {
            id: row.get(0)?,
            nome: row.get(1)?,
            cognome: row.get(2)?,
            tipo: row.get(3)?,
            ambulatorio: row.get(4)?,
            status: row.get(5)?,
        })
    }
}

impl TryFrom<PatientRow> for Patient {
    type Error = DbError;

    fn try_from(row: PatientRow) -> Result<Self, Self::Error> {
        Ok(Patient {
            id: row.id,
            first_name: row.nome,
            last_name: row.cognome,
            track_tag: string_to_tag(&row.tipo)?,
            ambulatorio: row.ambulatorio,
            status: row.status,
        })
    }
}

fn tag_to_string(tag: TrackTag) -> &'static str {
    match tag {
        TrackTag::Picc => "PICC",
        TrackTag::Med => "MED",
        TrackTag::PiccMed => "PICC_MED",
    }
}

fn string_to_tag(s: &str) -> Result<TrackTag, DbError> {
    match s {
        "PICC" => Ok(TrackTag::Picc),
        "MED" => Ok(TrackTag::Med),
        "PICC_MED" => Ok(TrackTag::PiccMed),
        _ => Err(DbError::Constraint(format!("Unknown patient track: {}", s))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::STATUS_IN_CARE;

    fn setup_db() -> Database {
        Database::open_in_memory().unwrap()
    }

    #[test]
    fn test_create_and_get() {
        let db = setup_db();

        let request = NewPatient::quick("Mario", "Rossi", None, "pta_centro");
        let patient = db.create_patient_from(&request).unwrap();

        let retrieved = db.get_patient(&patient.id).unwrap().unwrap();
        assert_eq!(retrieved.first_name, "Mario");
        assert_eq!(retrieved.last_name, "Rossi");
        assert_eq!(retrieved.track_tag, TrackTag::Picc);
        assert_eq!(retrieved.status, STATUS_IN_CARE);
    }

    #[test]
    fn test_missing_name_is_rejected() {
        let db = setup_db();
        let request = NewPatient::quick("Mario", "", None, "pta_centro");
        let result = db.create_patient_from(&request);
        assert!(matches!(result, Err(DbError::Constraint(_))));
    }

    #[test]
    fn test_list_by_site() {
        let db = setup_db();
        db.create_patient_from(&NewPatient::quick("Anna", "Verdi", None, "pta_centro"))
            .unwrap();
        db.create_patient_from(&NewPatient::quick("Luca", "Bianchi", None, "pta_centro"))
            .unwrap();
        db.create_patient_from(&NewPatient::quick("Sara", "Neri", None, "villa_ginestre"))
            .unwrap();

        let patients = db.list_patients_at("pta_centro", STATUS_IN_CARE).unwrap();
        assert_eq!(patients.len(), 2);
        assert_eq!(patients[0].last_name, "Bianchi");
        assert!(db.list_patients_at("pta_centro", "dimesso").unwrap().is_empty());
    }

    #[test]
    fn test_search_patients() {
        let db = setup_db();
        db.create_patient_from(&NewPatient::quick("Mario", "Rossi", None, "pta_centro"))
            .unwrap();
        db.create_patient_from(&NewPatient::quick("Maria", "Rossetti", None, "pta_centro"))
            .unwrap();
        db.create_patient_from(&NewPatient::quick("Luca", "Bianchi", None, "pta_centro"))
            .unwrap();

        let results = db.search_patients("pta_centro", "ross", 10).unwrap();
        assert_eq!(results.len(), 2);
        let results = db.search_patients("pta_centro", "mari", 10).unwrap();
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn test_delete_patient() {
        let db = setup_db();
        let patient = db
            .create_patient_from(&NewPatient::quick("Mario", "Rossi", None, "pta_centro"))
            .unwrap();
        assert!(db.delete_patient(&patient.id).unwrap());
        assert!(db.get_patient(&patient.id).unwrap().is_none());
    }
}
