//! SQLite schema definition.

/// Complete database schema for the clinic store.
pub const SCHEMA: &str = r#"
-- Enable foreign keys
PRAGMA foreign_keys = ON;

-- ============================================================================
-- Patients
-- ============================================================================

CREATE TABLE IF NOT EXISTS patients (
    id TEXT PRIMARY KEY,
    nome TEXT NOT NULL,
    cognome TEXT NOT NULL,
    tipo TEXT NOT NULL CHECK (tipo IN ('PICC', 'MED', 'PICC_MED')),
    ambulatorio TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'in_cura',
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_patients_site ON patients(ambulatorio, status);

-- ============================================================================
-- Appointments
-- ============================================================================

CREATE TABLE IF NOT EXISTS appointments (
    id TEXT PRIMARY KEY,
    patient_id TEXT NOT NULL REFERENCES patients(id),
    ambulatorio TEXT NOT NULL,
    data TEXT NOT NULL,                          -- YYYY-MM-DD
    ora TEXT NOT NULL,                           -- HH:MM
    tipo TEXT NOT NULL CHECK (tipo IN ('PICC', 'MED')),
    stato TEXT NOT NULL DEFAULT 'da_fare'
        CHECK (stato IN ('da_fare', 'effettuato', 'non_presentato')),
    prestazioni TEXT NOT NULL DEFAULT '[]',      -- JSON array of service ids
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_appointments_day ON appointments(ambulatorio, data);
CREATE INDEX IF NOT EXISTS idx_appointments_slot ON appointments(ambulatorio, data, ora, tipo);

-- ============================================================================
-- Holidays
-- ============================================================================

CREATE TABLE IF NOT EXISTS holidays (
    data TEXT PRIMARY KEY,                       -- YYYY-MM-DD
    anno INTEGER NOT NULL,
    descrizione TEXT
);

CREATE INDEX IF NOT EXISTS idx_holidays_year ON holidays(anno);

-- ============================================================================
-- Implant records (scheda impianto)
-- ============================================================================

CREATE TABLE IF NOT EXISTS implant_records (
    id TEXT PRIMARY KEY,
    patient_id TEXT NOT NULL,
    ambulatorio TEXT NOT NULL,
    body TEXT NOT NULL,                          -- JSON form fields
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_implant_records_patient ON implant_records(patient_id);

CREATE TABLE IF NOT EXISTS implant_attachments (
    id TEXT PRIMARY KEY,
    record_id TEXT NOT NULL REFERENCES implant_records(id) ON DELETE CASCADE,
    position INTEGER NOT NULL,
    image_data TEXT NOT NULL,                    -- base64 JPEG, no data: prefix
    descrizione TEXT NOT NULL DEFAULT '',
    data TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_implant_attachments_record ON implant_attachments(record_id, position);
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_schema_valid() {
        let conn = Connection::open_in_memory().unwrap();
        let result = conn.execute_batch(SCHEMA);
        assert!(result.is_ok(), "Schema should be valid SQL: {:?}", result);
    }

    #[test]
    fn test_schema_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA).unwrap();
        assert!(conn.execute_batch(SCHEMA).is_ok());
    }

    #[test]
    fn test_status_check_constraint() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA).unwrap();
        conn.execute(
            "INSERT INTO patients (id, nome, cognome, tipo, ambulatorio) VALUES ('p1', 'Mario', 'Rossi', 'PICC', 'pta_centro')",
            [],
        )
        .unwrap();

        let result = conn.execute(
            "INSERT INTO appointments (id, patient_id, ambulatorio, data, ora, tipo, stato) VALUES ('a1', 'p1', 'pta_centro', '2024-06-10', '09:00', 'PICC', 'annullato')",
            [],
        );
        assert!(result.is_err());

        let result = conn.execute(
            "INSERT INTO appointments (id, patient_id, ambulatorio, data, ora, tipo) VALUES ('a1', 'p1', 'pta_centro', '2024-06-10', '09:00', 'PICC')",
            [],
        );
        assert!(result.is_ok());
    }

    #[test]
    fn test_attachments_cascade() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA).unwrap();
        conn.execute(
            "INSERT INTO implant_records (id, patient_id, ambulatorio, body) VALUES ('r1', 'p1', 'pta_centro', '{}')",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO implant_attachments (id, record_id, position, image_data, data) VALUES ('f1', 'r1', 0, 'AAAA', '2024-06-10')",
            [],
        )
        .unwrap();
        conn.execute("DELETE FROM implant_records WHERE id = 'r1'", [])
            .unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM implant_attachments", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }
}
