//! Photos attached to one implant record.

use chrono::NaiveDate;
use picc_clinic_imaging::{decode_image, strip_data_uri, ImageDocument, RenderOptions};
use tracing::debug;

use super::{RecordError, RecordResult};
use crate::models::Attachment;

/// The attachments of the record being edited, in display order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttachmentSet {
    items: Vec<Attachment>,
}

impl AttachmentSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attachments as loaded with a saved record.
    pub fn from_saved(items: Vec<Attachment>) -> Self {
        Self { items }
    }

    pub fn items(&self) -> &[Attachment] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Keys sent as `allegati`: server id when saved, temporary id otherwise.
    pub fn keys(&self) -> Vec<String> {
        self.items.iter().map(|a| a.key().to_string()).collect()
    }

    pub fn get(&self, key: &str) -> Option<&Attachment> {
        self.items.iter().find(|a| a.key() == key)
    }

    /// Add an uploaded photo. The payload must decode as an image; any
    /// `data:` prefix is dropped.
    pub fn upload(
        &mut self,
        payload: &str,
        description: impl Into<String>,
        today: NaiveDate,
    ) -> RecordResult<&Attachment> {
        decode_image(payload)?;
        let attachment =
            Attachment::uploaded(strip_data_uri(payload).to_string(), description.into(), today);
        debug!(temp_id = attachment.key(), "Attachment uploaded");
        self.items.push(attachment);
        Ok(&self.items[self.items.len() - 1])
    }

    pub fn remove(&mut self, key: &str) -> bool {
        let before = self.items.len();
        self.items.retain(|a| a.key() != key);
        self.items.len() != before
    }

    /// Open the photo in the editor.
    pub fn open_editor(&self, key: &str, options: RenderOptions) -> RecordResult<ImageDocument> {
        let attachment = self
            .get(key)
            .ok_or_else(|| RecordError::UnknownAttachment(key.to_string()))?;
        Ok(ImageDocument::from_payload(&attachment.image_data)?.with_options(options))
    }

    /// Commit the document's pending edit and store the result as the
    /// attachment's payload. Nothing changes if rendering fails.
    pub fn apply_edit(&mut self, key: &str, document: &mut ImageDocument) -> RecordResult<()> {
        let index = self
            .items
            .iter()
            .position(|a| a.key() == key)
            .ok_or_else(|| RecordError::UnknownAttachment(key.to_string()))?;
        let rendered = document.commit()?;
        self.items[index].image_data = rendered.to_payload();
        Ok(())
    }

    /// Adopt the server ids returned on save, matched by temporary id.
    pub fn reconcile(&mut self, saved: &[Attachment]) {
        for item in self.items.iter_mut().filter(|a| !a.is_saved()) {
            let matched = saved
                .iter()
                .find(|s| s.temp_id.is_some() && s.temp_id == item.temp_id);
            if let Some(server) = matched {
                debug!(
                    temp_id = item.key(),
                    id = server.id.as_deref().unwrap_or_default(),
                    "Attachment reconciled"
                );
                item.id = server.id.clone();
            }
        }
    }
}
