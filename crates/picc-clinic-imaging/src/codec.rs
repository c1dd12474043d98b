//! Base64 image payloads as exchanged with the record API.
//!
//! Payloads are plain base64 JPEG. A `data:` URI prefix is tolerated on input
//! and never produced on output.

use std::io::Cursor;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use image::{DynamicImage, ImageOutputFormat, RgbImage};

use super::{ImageError, ImageResult};

/// Prefix used when a payload has to be shown inline.
pub const JPEG_DATA_URI_PREFIX: &str = "data:image/jpeg;base64,";

/// Default JPEG quality for committed edits.
pub const DEFAULT_JPEG_QUALITY: u8 = 90;

/// Encoding used when flattening a rendered canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Jpeg { quality: u8 },
    Png,
}

impl Default for OutputFormat {
    fn default() -> Self {
        OutputFormat::Jpeg {
            quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

/// Remove a `data:...;base64,` prefix if present.
pub fn strip_data_uri(payload: &str) -> &str {
    let payload = payload.trim();
    if payload.starts_with("data:") {
        match payload.find(',') {
            Some(comma) => &payload[comma + 1..],
            None => "",
        }
    } else {
        payload
    }
}

/// Inline form of a payload, for previews.
pub fn to_data_uri(payload: &str) -> String {
    format!("{}{}", JPEG_DATA_URI_PREFIX, strip_data_uri(payload))
}

pub fn encode_payload(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

pub fn decode_payload(payload: &str) -> ImageResult<Vec<u8>> {
    STANDARD
        .decode(strip_data_uri(payload))
        .map_err(|e| ImageError::Decode(format!("Invalid base64 payload: {e}")))
}

/// Decode a base64 payload into a raster.
pub fn decode_image(payload: &str) -> ImageResult<DynamicImage> {
    let bytes = decode_payload(payload)?;
    if bytes.is_empty() {
        return Err(ImageError::Decode("Empty image payload".into()));
    }
    image::load_from_memory(&bytes).map_err(|e| ImageError::Decode(e.to_string()))
}

/// Flatten a canvas to encoded bytes.
pub fn encode_raster(canvas: &RgbImage, format: OutputFormat) -> ImageResult<Vec<u8>> {
    let output = match format {
        OutputFormat::Jpeg { quality } => ImageOutputFormat::Jpeg(quality.clamp(1, 100)),
        OutputFormat::Png => ImageOutputFormat::Png,
    };
    let dynamic = DynamicImage::ImageRgb8(canvas.clone());
    let mut cursor = Cursor::new(Vec::new());
    dynamic
        .write_to(&mut cursor, output)
        .map_err(|e| ImageError::Encode(e.to_string()))?;
    Ok(cursor.into_inner())
}
