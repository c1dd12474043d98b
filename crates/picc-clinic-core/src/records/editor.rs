//! Create/update round trip of an implant record with its photos.

use tracing::info;

use super::attachments::AttachmentSet;
use super::RecordResult;
use crate::backend::{ClinicBackend, StoreError};
use crate::models::ImplantRecord;

/// A record open in the form, with its attachments.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordEditor {
    record: ImplantRecord,
    attachments: AttachmentSet,
}

impl RecordEditor {
    /// Edit a new or loaded record. Attachments carried by the record move
    /// into the attachment set.
    pub fn open(mut record: ImplantRecord) -> Self {
        let attachments = AttachmentSet::from_saved(std::mem::take(&mut record.attachments));
        Self {
            record,
            attachments,
        }
    }

    pub fn record(&self) -> &ImplantRecord {
        &self.record
    }

    pub fn record_mut(&mut self) -> &mut ImplantRecord {
        &mut self.record
    }

    pub fn attachments(&self) -> &AttachmentSet {
        &self.attachments
    }

    pub fn attachments_mut(&mut self) -> &mut AttachmentSet {
        &mut self.attachments
    }

    pub fn is_new(&self) -> bool {
        self.record.id.is_none()
    }

    /// The record as it is sent to the backend.
    pub fn outgoing(&self) -> ImplantRecord {
        ImplantRecord {
            attachment_keys: self.attachments.keys(),
            attachments: self.attachments.items().to_vec(),
            ..self.record.clone()
        }
    }

    /// Create or update the record, then adopt the server ids.
    pub fn save<B: ClinicBackend>(&mut self, backend: &B) -> RecordResult<ImplantRecord> {
        let missing = self.record.missing_fields();
        if !missing.is_empty() {
            return Err(StoreError::Validation(format!(
                "Missing required fields: {}",
                missing.join(", ")
            ))
            .into());
        }

        let outgoing = self.outgoing();
        let saved = match &self.record.id {
            Some(id) => backend.update_implant_record(id, &outgoing)?,
            None => backend.create_implant_record(&outgoing)?,
        };

        self.attachments.reconcile(&saved.attachments);
        self.record.id = saved.id.clone();
        info!(
            record_id = saved.id.as_deref().unwrap_or_default(),
            attachments = self.attachments.len(),
            "Implant record saved"
        );
        Ok(saved)
    }

    /// Delete a saved record. A record never saved has nothing to delete.
    pub fn delete<B: ClinicBackend>(self, backend: &B) -> RecordResult<()> {
        match &self.record.id {
            Some(id) => Ok(backend.delete_implant_record(id)?),
            None => Ok(()),
        }
    }
}
