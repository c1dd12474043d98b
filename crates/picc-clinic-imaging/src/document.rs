//! An attachment photo open in the editor.

use image::{DynamicImage, GenericImageView};
use tracing::info;

use super::codec::decode_image;
use super::render::{render, RenderOptions, RenderedImage};
use super::transform::{CropRect, RotateDirection, Transform};
use super::{ImageError, ImageResult};

/// Baseline raster plus the edit the user has not committed yet.
///
/// Edits are destructive and sequential: each [`commit`](Self::commit)
/// replaces the baseline with the rendered result and resets the pending
/// transform, so later edits act on the committed image rather than the
/// original upload.
#[derive(Debug, Clone)]
pub struct ImageDocument {
    baseline: DynamicImage,
    pending: Transform,
    options: RenderOptions,
    commits: u32,
}

impl ImageDocument {
    pub fn from_image(image: DynamicImage) -> ImageResult<Self> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(ImageError::InvalidInput("Image has zero dimension".into()));
        }
        Ok(Self {
            baseline: image,
            pending: Transform::default(),
            options: RenderOptions::default(),
            commits: 0,
        })
    }

    /// Open a stored base64 payload (with or without `data:` prefix).
    pub fn from_payload(payload: &str) -> ImageResult<Self> {
        Self::from_image(decode_image(payload)?)
    }

    pub fn with_options(mut self, options: RenderOptions) -> Self {
        self.options = options;
        self
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.baseline.dimensions()
    }

    pub fn pending(&self) -> &Transform {
        &self.pending
    }

    /// Number of edits committed since the document was opened.
    pub fn commits(&self) -> u32 {
        self.commits
    }

    pub fn rotate(&mut self, direction: RotateDirection) {
        self.pending.rotate(direction);
    }

    pub fn adjust_zoom(&mut self, delta: f64) {
        self.pending.adjust_zoom(delta);
    }

    pub fn set_crop(&mut self, crop: CropRect) {
        self.pending.set_crop(crop);
    }

    /// Replace the whole pending transform (e.g. restored from the UI).
    pub fn set_pending(&mut self, transform: Transform) {
        self.pending = transform;
        self.pending.set_zoom(transform.zoom);
    }

    /// Output canvas size for the current pending edit.
    pub fn preview_size(&self) -> ImageResult<(u32, u32)> {
        let (w, h) = self.dimensions();
        self.pending.canvas_size(w, h)
    }

    /// Render the pending edit without changing the document.
    pub fn preview(&self) -> ImageResult<RenderedImage> {
        render(&self.baseline, &self.pending, &self.options)
    }

    /// Render the pending edit and make it the new baseline.
    ///
    /// On error the document is left exactly as it was.
    pub fn commit(&mut self) -> ImageResult<RenderedImage> {
        let rendered = self.preview()?;
        let raster = image::load_from_memory(&rendered.bytes)
            .map_err(|e| ImageError::Decode(e.to_string()))?;
        self.baseline = raster;
        self.pending = Transform::default();
        self.commits += 1;
        info!(
            width = rendered.width,
            height = rendered.height,
            bytes = rendered.bytes.len(),
            commits = self.commits,
            "Committed attachment edit"
        );
        Ok(rendered)
    }

    /// Drop the pending edit.
    pub fn cancel(&mut self) {
        self.pending = Transform::default();
    }
}
