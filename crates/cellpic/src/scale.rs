//! Decoding downloaded images and fitting them into the cell's bounding box.

use std::io::Cursor;

use image::error::{ParameterError, ParameterErrorKind};
use image::imageops::FilterType;
use image::{DynamicImage, ImageError, ImageFormat};
use serde::Serialize;

/// Target area for one embedded image, in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct BoundingBox {
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// A decoded image resized to its display size and re-encoded as PNG.
#[derive(Clone, Debug)]
pub struct ScaledImage {
    pub natural_width: u32,
    pub natural_height: u32,
    pub width: u32,
    pub height: u32,
    pub png: Vec<u8>,
}

/// Largest ratio that keeps `natural` inside `bbox` with its aspect ratio.
pub fn fit_ratio(natural: (u32, u32), bbox: BoundingBox) -> f64 {
    let (w, h) = natural;
    (f64::from(bbox.width) / f64::from(w)).min(f64::from(bbox.height) / f64::from(h))
}

/// Display size for an image of `natural` size.
///
/// Dimensions are truncated to whole pixels (with a small tolerance so that
/// the limiting side lands exactly on the box edge) and never drop below 1.
/// Without `allow_upscale`, images already inside the box keep their size.
pub fn scaled_size(natural: (u32, u32), bbox: BoundingBox, allow_upscale: bool) -> (u32, u32) {
    let mut ratio = fit_ratio(natural, bbox);
    if !allow_upscale {
        ratio = ratio.min(1.0);
    }
    let scale = |len: u32, limit: u32| {
        let scaled = (f64::from(len) * ratio + 1e-9).floor();
        (scaled as u32).clamp(1, limit.max(1))
    };
    (scale(natural.0, bbox.width), scale(natural.1, bbox.height))
}

/// Decode `bytes` (any supported format) and resize to fit `bbox`.
pub fn decode_and_fit(
    bytes: &[u8],
    bbox: BoundingBox,
    allow_upscale: bool,
) -> Result<ScaledImage, ImageError> {
    let decoded = image::load_from_memory(bytes)?;
    let natural = (decoded.width(), decoded.height());
    if natural.0 == 0 || natural.1 == 0 {
        return Err(ImageError::Parameter(ParameterError::from_kind(
            ParameterErrorKind::DimensionMismatch,
        )));
    }

    let (width, height) = scaled_size(natural, bbox, allow_upscale);
    let resized = if (width, height) == natural {
        decoded
    } else {
        decoded.resize_exact(width, height, FilterType::Triangle)
    };

    // The PNG encoder only takes 8/16-bit buffers; normalise first.
    let rgba = DynamicImage::ImageRgba8(resized.to_rgba8());
    let mut png = Cursor::new(Vec::new());
    rgba.write_to(&mut png, ImageFormat::Png)?;

    Ok(ScaledImage {
        natural_width: natural.0,
        natural_height: natural.1,
        width,
        height,
        png: png.into_inner(),
    })
}
