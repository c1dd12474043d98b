//! Pending transform applied to an attachment photo.

use serde::{Deserialize, Serialize};

use super::{ImageError, ImageResult};

/// Smallest zoom factor the editor allows.
pub const MIN_ZOOM: f64 = 0.1;
/// Largest zoom factor the editor allows.
pub const MAX_ZOOM: f64 = 3.0;

/// Rotation button pressed in the editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RotateDirection {
    /// Clockwise, +90°
    Cw,
    /// Counter-clockwise, -90°
    Ccw,
}

/// Rotation restricted to quarter turns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    /// Normalize any multiple of 90 degrees (negative included) to a quarter turn.
    pub fn from_degrees(degrees: i32) -> Option<Self> {
        if degrees % 90 != 0 {
            return None;
        }
        match degrees.rem_euclid(360) {
            0 => Some(Rotation::Deg0),
            90 => Some(Rotation::Deg90),
            180 => Some(Rotation::Deg180),
            270 => Some(Rotation::Deg270),
            _ => None,
        }
    }

    pub fn degrees(self) -> u16 {
        match self {
            Rotation::Deg0 => 0,
            Rotation::Deg90 => 90,
            Rotation::Deg180 => 180,
            Rotation::Deg270 => 270,
        }
    }

    /// One step in the given direction.
    pub fn turned(self, direction: RotateDirection) -> Self {
        let delta = match direction {
            RotateDirection::Cw => 90,
            RotateDirection::Ccw => -90,
        };
        // Always a multiple of 90, so this cannot miss.
        Rotation::from_degrees(self.degrees() as i32 + delta).unwrap_or_default()
    }

    /// Odd multiples of 90° swap the canvas width and height.
    pub fn swaps_axes(self) -> bool {
        matches!(self, Rotation::Deg90 | Rotation::Deg270)
    }

    /// Exact `(cos, sin)` of the angle, so quarter turns land on pixel centers.
    pub fn cos_sin(self) -> (f64, f64) {
        match self {
            Rotation::Deg0 => (1.0, 0.0),
            Rotation::Deg90 => (0.0, 1.0),
            Rotation::Deg180 => (-1.0, 0.0),
            Rotation::Deg270 => (0.0, -1.0),
        }
    }

    pub fn radians(self) -> f64 {
        self.degrees() as f64 * std::f64::consts::PI / 180.0
    }
}

impl From<Rotation> for u16 {
    fn from(rotation: Rotation) -> Self {
        rotation.degrees()
    }
}

impl TryFrom<u16> for Rotation {
    type Error = String;

    fn try_from(degrees: u16) -> Result<Self, Self::Error> {
        Rotation::from_degrees(degrees as i32)
            .filter(|_| degrees < 360)
            .ok_or_else(|| format!("Unsupported rotation: {}", degrees))
    }
}

/// Axis-aligned crop rectangle in source-pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CropRect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// The whole image.
    pub fn full(width: u32, height: u32) -> Self {
        Self::new(0, 0, width, height)
    }

    /// Intersect with a `width` x `height` image. `None` if nothing is left.
    pub fn clamp_to(&self, width: u32, height: u32) -> Option<CropRect> {
        if self.x >= width || self.y >= height {
            return None;
        }
        let w = self.width.min(width - self.x);
        let h = self.height.min(height - self.y);
        if w == 0 || h == 0 {
            return None;
        }
        Some(CropRect::new(self.x, self.y, w, h))
    }

    pub fn covers(&self, width: u32, height: u32) -> bool {
        self.x == 0 && self.y == 0 && self.width >= width && self.height >= height
    }
}

/// Edit state accumulated by the rotate/zoom/crop buttons before commit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub rotation: Rotation,
    pub zoom: f64,
    /// `None` means the full image.
    pub crop: Option<CropRect>,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            rotation: Rotation::Deg0,
            zoom: 1.0,
            crop: None,
        }
    }
}

impl Transform {
    pub fn rotate(&mut self, direction: RotateDirection) {
        self.rotation = self.rotation.turned(direction);
    }

    /// Add `delta` to the zoom, clamped to [`MIN_ZOOM`, `MAX_ZOOM`].
    ///
    /// The result is rounded to two decimals so that repeated ±0.1 steps
    /// return exactly to where they started.
    pub fn adjust_zoom(&mut self, delta: f64) {
        self.set_zoom(self.zoom + delta);
    }

    pub fn set_zoom(&mut self, zoom: f64) {
        let zoom = if zoom.is_finite() { zoom } else { 1.0 };
        let rounded = (zoom * 100.0).round() / 100.0;
        self.zoom = rounded.clamp(MIN_ZOOM, MAX_ZOOM);
    }

    pub fn set_crop(&mut self, crop: CropRect) {
        self.crop = Some(crop);
    }

    pub fn clear_crop(&mut self) {
        self.crop = None;
    }

    /// True when rendering would reproduce the source unchanged.
    pub fn is_identity(&self) -> bool {
        self.rotation == Rotation::Deg0 && self.zoom == 1.0 && self.crop.is_none()
    }

    /// Region of a `width` x `height` source that the render starts from.
    pub fn effective_crop(&self, width: u32, height: u32) -> ImageResult<CropRect> {
        if width == 0 || height == 0 {
            return Err(ImageError::InvalidInput(format!(
                "Source image has zero dimension ({}x{})",
                width, height
            )));
        }
        match self.crop {
            None => Ok(CropRect::full(width, height)),
            Some(rect) => rect.clamp_to(width, height).ok_or_else(|| {
                ImageError::InvalidInput(format!(
                    "Crop {}x{}+{}+{} lies outside the {}x{} image",
                    rect.width, rect.height, rect.x, rect.y, width, height
                ))
            }),
        }
    }

    /// Output canvas size for a `width` x `height` source.
    ///
    /// Crop first, swap axes on odd quarter turns, then scale both sides by
    /// the zoom, truncating to whole pixels.
    pub fn canvas_size(&self, width: u32, height: u32) -> ImageResult<(u32, u32)> {
        let crop = self.effective_crop(width, height)?;
        let (base_w, base_h) = if self.rotation.swaps_axes() {
            (crop.height, crop.width)
        } else {
            (crop.width, crop.height)
        };
        let canvas_w = (base_w as f64 * self.zoom).floor() as u32;
        let canvas_h = (base_h as f64 * self.zoom).floor() as u32;
        if canvas_w == 0 || canvas_h == 0 {
            return Err(ImageError::InvalidInput(format!(
                "Zoom {} leaves an empty canvas for a {}x{} image",
                self.zoom, base_w, base_h
            )));
        }
        Ok((canvas_w, canvas_h))
    }
}
