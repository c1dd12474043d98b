//! Deterministic compositing of a [`Transform`] onto a source raster.
//!
//! The canvas is built the way a 2D drawing context would: size the canvas,
//! move the origin to its center, rotate, scale, then draw the (cropped)
//! source centered on the origin. Each output pixel is produced by mapping its
//! center back through that chain and sampling the source bilinearly.

use image::imageops;
use image::{DynamicImage, Rgb, RgbImage, RgbaImage};
use tracing::debug;

use super::codec::{encode_payload, encode_raster, OutputFormat};
use super::transform::Transform;
use super::ImageResult;

/// Flattening options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    pub format: OutputFormat,
    /// Fill for canvas areas the source does not cover, and for transparency.
    pub background: [u8; 3],
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            format: OutputFormat::default(),
            background: [0, 0, 0],
        }
    }
}

/// An encoded render result.
#[derive(Debug, Clone)]
pub struct RenderedImage {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub format: OutputFormat,
}

impl RenderedImage {
    /// Base64 payload without any `data:` prefix.
    pub fn to_payload(&self) -> String {
        encode_payload(&self.bytes)
    }
}

/// Composite `source` through `transform` onto a fresh canvas.
pub fn render_raster(
    source: &RgbaImage,
    transform: &Transform,
    background: [u8; 3],
) -> ImageResult<RgbImage> {
    let (src_w, src_h) = source.dimensions();
    let (canvas_w, canvas_h) = transform.canvas_size(src_w, src_h)?;

    // Crop is a pre-step: everything after works on the cropped region.
    let crop = transform.effective_crop(src_w, src_h)?;
    let cropped;
    let region: &RgbaImage = if crop.covers(src_w, src_h) {
        source
    } else {
        cropped = imageops::crop_imm(source, crop.x, crop.y, crop.width, crop.height).to_image();
        &cropped
    };

    let (cos, sin) = transform.rotation.cos_sin();
    let zoom = transform.zoom;
    let half_canvas_w = canvas_w as f64 / 2.0;
    let half_canvas_h = canvas_h as f64 / 2.0;
    let half_src_w = region.width() as f64 / 2.0;
    let half_src_h = region.height() as f64 / 2.0;

    let mut canvas = RgbImage::new(canvas_w, canvas_h);
    for (x, y, pixel) in canvas.enumerate_pixels_mut() {
        // Pixel center relative to the translated origin.
        let dx = x as f64 + 0.5 - half_canvas_w;
        let dy = y as f64 + 0.5 - half_canvas_h;
        // Undo rotate then scale, then undo the centered draw offset.
        let sx = (cos * dx + sin * dy) / zoom + half_src_w;
        let sy = (-sin * dx + cos * dy) / zoom + half_src_h;
        *pixel = sample_bilinear(region, sx, sy, background);
    }

    debug!(
        source = format!("{src_w}x{src_h}"),
        crop = format!("{}x{}+{}+{}", crop.width, crop.height, crop.x, crop.y),
        rotation = transform.rotation.degrees(),
        zoom = zoom,
        canvas = format!("{canvas_w}x{canvas_h}"),
        "Rendered attachment transform"
    );

    Ok(canvas)
}

/// Render and flatten to the requested encoding.
pub fn render(
    source: &DynamicImage,
    transform: &Transform,
    options: &RenderOptions,
) -> ImageResult<RenderedImage> {
    let rgba = source.to_rgba8();
    let canvas = render_raster(&rgba, transform, options.background)?;
    let bytes = encode_raster(&canvas, options.format)?;
    Ok(RenderedImage {
        bytes,
        width: canvas.width(),
        height: canvas.height(),
        format: options.format,
    })
}

/// Decode a stored payload, render it and re-encode in one step.
pub fn render_payload(
    payload: &str,
    transform: &Transform,
    options: &RenderOptions,
) -> ImageResult<RenderedImage> {
    let source = super::codec::decode_image(payload)?;
    render(&source, transform, options)
}

/// Sample at continuous coordinates (pixel centers at `n + 0.5`).
fn sample_bilinear(source: &RgbaImage, sx: f64, sy: f64, background: [u8; 3]) -> Rgb<u8> {
    let (w, h) = source.dimensions();
    if sx < 0.0 || sy < 0.0 || sx >= w as f64 || sy >= h as f64 {
        return Rgb(background);
    }

    let fx = (sx - 0.5).max(0.0);
    let fy = (sy - 0.5).max(0.0);
    let x0 = (fx.floor() as u32).min(w - 1);
    let y0 = (fy.floor() as u32).min(h - 1);
    let x1 = (x0 + 1).min(w - 1);
    let y1 = (y0 + 1).min(h - 1);
    let tx = fx - x0 as f64;
    let ty = fy - y0 as f64;

    let p00 = source.get_pixel(x0, y0).0;
    let p10 = source.get_pixel(x1, y0).0;
    let p01 = source.get_pixel(x0, y1).0;
    let p11 = source.get_pixel(x1, y1).0;

    let mut channels = [0f64; 4];
    for (c, value) in channels.iter_mut().enumerate() {
        let top = p00[c] as f64 * (1.0 - tx) + p10[c] as f64 * tx;
        let bottom = p01[c] as f64 * (1.0 - tx) + p11[c] as f64 * tx;
        *value = top * (1.0 - ty) + bottom * ty;
    }

    let alpha = channels[3] / 255.0;
    let mut out = [0u8; 3];
    for c in 0..3 {
        let blended = channels[c] * alpha + background[c] as f64 * (1.0 - alpha);
        out[c] = blended.round().clamp(0.0, 255.0) as u8;
    }
    Rgb(out)
}
