//! Attachment photo editing for implant records.
//!
//! Photos attached to a clinical record are edited with a small, ordered
//! transform (quarter-turn rotation, uniform zoom, optional crop) and then
//! flattened into a new JPEG payload that replaces the stored one.
//!
//! ```text
//! base64 payload ──decode──▶ ImageDocument (baseline raster + pending Transform)
//!                                   │ rotate / zoom / crop
//!                                   ▼
//!                        render: crop → size canvas → center → rotate → scale → draw
//!                                   │
//!                      preview ◀────┴────▶ commit (new baseline, encoded payload)
//! ```

pub mod codec;
pub mod document;
pub mod render;
pub mod transform;

pub use codec::*;
pub use document::*;
pub use render::*;
pub use transform::*;

use thiserror::Error;

/// Image pipeline errors.
#[derive(Error, Debug)]
pub enum ImageError {
    #[error("Could not decode image: {0}")]
    Decode(String),

    #[error("Invalid image input: {0}")]
    InvalidInput(String),

    #[error("Could not encode image: {0}")]
    Encode(String),
}

pub type ImageResult<T> = Result<T, ImageError>;
