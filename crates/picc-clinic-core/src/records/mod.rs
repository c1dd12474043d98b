//! Implant record editing: attachment photos and the save round trip.

mod attachments;
mod editor;

pub use attachments::*;
pub use editor::*;

use picc_clinic_imaging::ImageError;
use thiserror::Error;

use crate::backend::StoreError;

/// Record editing errors.
#[derive(Error, Debug)]
pub enum RecordError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Image(#[from] ImageError),

    #[error("No attachment with id {0}")]
    UnknownAttachment(String),
}

pub type RecordResult<T> = Result<T, RecordError>;
