//! Implant record (scheda impianto) operations.
//!
//! Form fields are stored as one JSON body; attachments get their own rows
//! and are replaced wholesale on every save.

use rusqlite::{params, OptionalExtension, Transaction};
use tracing::info;

use super::appointments::{date_to_string, string_to_date};
use super::{Database, DbError, DbResult};
use crate::models::{Attachment, ImplantRecord};

impl Database {
    /// Insert a record. Attachments without a server id get one; their
    /// temporary ids are echoed back so the caller can reconcile.
    pub fn insert_implant_record(&self, record: &ImplantRecord) -> DbResult<ImplantRecord> {
        check_required(record)?;
        let id = uuid::Uuid::new_v4().to_string();

        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            r#"
            INSERT INTO implant_records (id, patient_id, ambulatorio, body)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![id, record.patient_id, record.ambulatorio, body_json(record)?],
        )?;
        let attachments = save_attachments(&tx, &id, &record.attachments)?;
        tx.commit()?;

        info!(record_id = %id, attachments = attachments.len(), "Implant record created");
        Ok(saved(record, id, attachments))
    }

    /// Overwrite a record's fields and attachments.
    pub fn replace_implant_record(&self, id: &str, record: &ImplantRecord) -> DbResult<ImplantRecord> {
        check_required(record)?;

        let tx = self.conn.unchecked_transaction()?;
        let rows_affected = tx.execute(
            r#"
            UPDATE implant_records SET
                patient_id = ?2,
                ambulatorio = ?3,
                body = ?4,
                updated_at = datetime('now')
            WHERE id = ?1
            "#,
            params![id, record.patient_id, record.ambulatorio, body_json(record)?],
        )?;
        if rows_affected == 0 {
            return Err(DbError::NotFound(format!("implant record {}", id)));
        }
        let attachments = save_attachments(&tx, id, &record.attachments)?;
        tx.commit()?;

        Ok(saved(record, id.to_string(), attachments))
    }

    /// Get a record with its attachments.
    pub fn get_implant_record(&self, id: &str) -> DbResult<Option<ImplantRecord>> {
        let body: Option<String> = self
            .conn
            .query_row(
                "SELECT body FROM implant_records WHERE id = ?",
                [id],
                |row| row.get(0),
            )
            .optional()?;

        match body {
            Some(body) => {
                let mut record: ImplantRecord = serde_json::from_str(&body)?;
                record.id = Some(id.to_string());
                record.attachments = self.load_attachments(id)?;
                record.attachment_keys = record
                    .attachments
                    .iter()
                    .map(|a| a.key().to_string())
                    .collect();
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    /// Records of a patient, newest first.
    pub fn list_implant_records_for(&self, patient_id: &str) -> DbResult<Vec<ImplantRecord>> {
        let ids: Vec<String> = {
            let mut stmt = self.conn.prepare(
                "SELECT id FROM implant_records WHERE patient_id = ? ORDER BY created_at DESC, rowid DESC",
            )?;
            let rows = stmt.query_map([patient_id], |row| row.get(0))?;
            rows.collect::<Result<Vec<_>, _>>()?
        };

        let mut records = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(record) = self.get_implant_record(&id)? {
                records.push(record);
            }
        }
        Ok(records)
    }

    /// Delete a record and its attachments.
    pub fn delete_implant_record_by_id(&self, id: &str) -> DbResult<bool> {
        let rows_affected = self
            .conn
            .execute("DELETE FROM implant_records WHERE id = ?", [id])?;
        Ok(rows_affected > 0)
    }

    fn load_attachments(&self, record_id: &str) -> DbResult<Vec<Attachment>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, image_data, descrizione, data
            FROM implant_attachments
            WHERE record_id = ?
            ORDER BY position
            "#,
        )?;
        let rows = stmt.query_map([record_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?;

        let mut attachments = Vec::new();
        for row in rows {
            let (id, image_data, description, data) = row?;
            attachments.push(Attachment {
                id: Some(id),
                temp_id: None,
                image_data,
                description,
                created_on: string_to_date(&data)?,
            });
        }
        Ok(attachments)
    }
}

fn check_required(record: &ImplantRecord) -> DbResult<()> {
    let missing = record.missing_fields();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(DbError::Constraint(format!(
            "Missing required fields: {}",
            missing.join(", ")
        )))
    }
}

/// Form fields only; id and attachments live in their own columns/rows.
fn body_json(record: &ImplantRecord) -> DbResult<String> {
    let fields = ImplantRecord {
        id: None,
        attachment_keys: Vec::new(),
        attachments: Vec::new(),
        ..record.clone()
    };
    Ok(serde_json::to_string(&fields)?)
}

fn save_attachments(
    tx: &Transaction<'_>,
    record_id: &str,
    attachments: &[Attachment],
) -> DbResult<Vec<Attachment>> {
    tx.execute(
        "DELETE FROM implant_attachments WHERE record_id = ?",
        [record_id],
    )?;

    let mut saved = Vec::with_capacity(attachments.len());
    for (position, attachment) in attachments.iter().enumerate() {
        let id = attachment
            .id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        tx.execute(
            r#"
            INSERT INTO implant_attachments (id, record_id, position, image_data, descrizione, data)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                id,
                record_id,
                position as i64,
                attachment.image_data,
                attachment.description,
                date_to_string(attachment.created_on),
            ],
        )?;
        saved.push(Attachment {
            id: Some(id),
            ..attachment.clone()
        });
    }
    Ok(saved)
}

fn saved(record: &ImplantRecord, id: String, attachments: Vec<Attachment>) -> ImplantRecord {
    ImplantRecord {
        id: Some(id),
        attachment_keys: attachments.iter().map(|a| a.key().to_string()).collect(),
        attachments,
        ..record.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TriState;
    use chrono::NaiveDate;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 10).unwrap()
    }

    fn record_with_photo() -> ImplantRecord {
        let mut record = ImplantRecord::blank("p1", "pta_centro", today());
        record.ultrasound_guided = TriState::Yes;
        record.vein = "basilica".into();
        let photo = Attachment::uploaded("AAAA".into(), "sito.jpg".into(), today());
        record.attachment_keys = vec![photo.key().to_string()];
        record.attachments = vec![photo];
        record
    }

    #[test]
    fn test_insert_assigns_server_ids_and_echoes_temp_ids() {
        let db = Database::open_in_memory().unwrap();
        let record = record_with_photo();
        let temp_id = record.attachments[0].temp_id.clone();

        let saved = db.insert_implant_record(&record).unwrap();
        assert!(saved.id.is_some());
        let photo = &saved.attachments[0];
        assert!(photo.is_saved());
        assert_eq!(photo.temp_id, temp_id);
        assert_eq!(saved.attachment_keys, vec![photo.key().to_string()]);
    }

    #[test]
    fn test_get_roundtrips_fields() {
        let db = Database::open_in_memory().unwrap();
        let saved = db.insert_implant_record(&record_with_photo()).unwrap();
        let id = saved.id.clone().unwrap();

        let loaded = db.get_implant_record(&id).unwrap().unwrap();
        assert_eq!(loaded.ultrasound_guided, TriState::Yes);
        assert_eq!(loaded.hand_hygiene, TriState::Unset);
        assert_eq!(loaded.vein, "basilica");
        assert_eq!(loaded.attachments.len(), 1);
        assert_eq!(loaded.attachments[0].temp_id, None);
    }

    #[test]
    fn test_replace_keeps_saved_attachment_ids() {
        let db = Database::open_in_memory().unwrap();
        let saved = db.insert_implant_record(&record_with_photo()).unwrap();
        let id = saved.id.clone().unwrap();
        let photo_id = saved.attachments[0].id.clone();

        let mut edited = saved.clone();
        edited.attachments[0].image_data = "BBBB".into();
        edited
            .attachments
            .push(Attachment::uploaded("CCCC".into(), "rx.jpg".into(), today()));
        let updated = db.replace_implant_record(&id, &edited).unwrap();

        assert_eq!(updated.attachments.len(), 2);
        assert_eq!(updated.attachments[0].id, photo_id);
        let loaded = db.get_implant_record(&id).unwrap().unwrap();
        assert_eq!(loaded.attachments[0].image_data, "BBBB");
    }

    #[test]
    fn test_missing_placement_date_rejected() {
        let db = Database::open_in_memory().unwrap();
        let mut record = record_with_photo();
        record.placed_on = None;
        assert!(matches!(
            db.insert_implant_record(&record),
            Err(DbError::Constraint(_))
        ));
    }

    #[test]
    fn test_list_and_delete() {
        let db = Database::open_in_memory().unwrap();
        let first = db.insert_implant_record(&record_with_photo()).unwrap();
        db.insert_implant_record(&record_with_photo()).unwrap();
        assert_eq!(db.list_implant_records_for("p1").unwrap().len(), 2);

        assert!(db
            .delete_implant_record_by_id(first.id.as_deref().unwrap())
            .unwrap());
        assert_eq!(db.list_implant_records_for("p1").unwrap().len(), 1);
        assert!(matches!(
            db.replace_implant_record("gone", &record_with_photo()),
            Err(DbError::NotFound(_))
        ));
    }
}
