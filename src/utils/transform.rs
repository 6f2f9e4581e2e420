//! Geometric and photometric raster transforms
//!
//! Every function is pure: it borrows the source raster and returns a freshly
//! allocated one. Failures are limited to parameters outside their domain and
//! results that would have a zero-length side.

use crate::error::TransformError;
use crate::models::{BoundingBox, RasterImage};
use crate::utils::grayscale::average_channels;
use image::imageops::FilterType;
use serde::Serialize;

/// Exact quarter-turn rotations (clockwise)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Rotation {
    /// Identity
    Deg0,
    /// 90 degrees clockwise
    Deg90,
    /// Half turn
    Deg180,
    /// 270 degrees clockwise
    Deg270,
}

impl Rotation {
    /// All four orientations in attempt order
    pub const ALL: [Rotation; 4] = [
        Rotation::Deg0,
        Rotation::Deg90,
        Rotation::Deg180,
        Rotation::Deg270,
    ];

    /// Parse a multiple of 90 degrees
    pub fn from_degrees(degrees: u32) -> Result<Self, TransformError> {
        match degrees {
            0 => Ok(Rotation::Deg0),
            90 => Ok(Rotation::Deg90),
            180 => Ok(Rotation::Deg180),
            270 => Ok(Rotation::Deg270),
            other => Err(TransformError::InvalidParameter {
                name: "degrees",
                message: format!("expected 0, 90, 180 or 270, got {other}"),
            }),
        }
    }

    /// Angle in degrees
    pub fn degrees(&self) -> u32 {
        match self {
            Rotation::Deg0 => 0,
            Rotation::Deg90 => 90,
            Rotation::Deg180 => 180,
            Rotation::Deg270 => 270,
        }
    }
}

/// Axis along which a centre band is kept
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BandAxis {
    /// Full width, a centred slice of the height
    Horizontal,
    /// Full height, a centred slice of the width
    Vertical,
}

/// Uniformly downscale so that `max(width, height) <= max_dim`
///
/// Rasters already within bound are returned as an identity copy.
pub fn scale_to_max_dimension(
    image: &RasterImage,
    max_dim: usize,
) -> Result<RasterImage, TransformError> {
    if max_dim == 0 {
        return Err(TransformError::InvalidDimension {
            width: 0,
            height: 0,
        });
    }
    let (w, h) = (image.width(), image.height());
    let max_side = w.max(h);
    if max_side <= max_dim {
        return Ok(image.clone());
    }

    scale_long_side_to(image, max_dim)
}

/// Uniformly resample so that `max(width, height) == long_side` exactly
///
/// Scales up or down; used to clamp upscales to a bound.
pub fn scale_long_side_to(
    image: &RasterImage,
    long_side: usize,
) -> Result<RasterImage, TransformError> {
    let (w, h) = (image.width(), image.height());
    if long_side == 0 {
        return Err(TransformError::InvalidDimension {
            width: 0,
            height: 0,
        });
    }
    let max_side = w.max(h);
    if max_side == long_side {
        return Ok(image.clone());
    }

    let scale = long_side as f64 / max_side as f64;
    let short = |side: usize| ((side as f64 * scale).round() as usize).clamp(1, long_side);
    let (new_w, new_h) = if w >= h {
        (long_side, short(h))
    } else {
        (short(w), long_side)
    };
    resize_exact(image, new_w, new_h)
}

/// Uniformly resample by `factor` (values above 1 upscale)
pub fn scale_by(image: &RasterImage, factor: f32) -> Result<RasterImage, TransformError> {
    if !factor.is_finite() || factor <= 0.0 {
        return Err(TransformError::InvalidParameter {
            name: "factor",
            message: format!("scale factor must be positive and finite, got {factor}"),
        });
    }
    let new_w = (image.width() as f64 * factor as f64).round() as usize;
    let new_h = (image.height() as f64 * factor as f64).round() as usize;
    if new_w == 0 || new_h == 0 {
        return Err(TransformError::InvalidDimension {
            width: new_w,
            height: new_h,
        });
    }
    if new_w == image.width() && new_h == image.height() {
        return Ok(image.clone());
    }
    resize_exact(image, new_w, new_h)
}

fn resize_exact(
    image: &RasterImage,
    width: usize,
    height: usize,
) -> Result<RasterImage, TransformError> {
    let resized = image
        .to_dynamic()?
        .resize_exact(width as u32, height as u32, FilterType::Triangle);
    RasterImage::from_dynamic(&resized)
}

/// Rotate by an exact multiple of 90 degrees; width and height swap for 90/270
pub fn rotate(image: &RasterImage, rotation: Rotation) -> RasterImage {
    let (w, h, c) = (image.width(), image.height(), image.channels());
    if rotation == Rotation::Deg0 {
        return image.clone();
    }

    let (out_w, out_h) = match rotation {
        Rotation::Deg90 | Rotation::Deg270 => (h, w),
        _ => (w, h),
    };
    let src = image.data();
    let mut out = vec![0u8; src.len()];

    for y in 0..h {
        for x in 0..w {
            let (dx, dy) = match rotation {
                Rotation::Deg90 => (h - 1 - y, x),
                Rotation::Deg180 => (w - 1 - x, h - 1 - y),
                Rotation::Deg270 => (y, w - 1 - x),
                Rotation::Deg0 => (x, y),
            };
            let s = (y * w + x) * c;
            let d = (dy * out_w + dx) * c;
            out[d..d + c].copy_from_slice(&src[s..s + c]);
        }
    }

    RasterImage::from_raw_parts(out_w, out_h, c, out)
}

/// Rotate by `degrees`, which must be 0, 90, 180 or 270
pub fn rotate_degrees(image: &RasterImage, degrees: u32) -> Result<RasterImage, TransformError> {
    Ok(rotate(image, Rotation::from_degrees(degrees)?))
}

/// Keep a centred band covering `ratio` of the chosen axis
pub fn crop_center_band(
    image: &RasterImage,
    axis: BandAxis,
    ratio: f32,
) -> Result<RasterImage, TransformError> {
    if !ratio.is_finite() || ratio <= 0.0 || ratio > 1.0 {
        return Err(TransformError::InvalidParameter {
            name: "ratio",
            message: format!("band ratio must be in (0, 1], got {ratio}"),
        });
    }
    let (w, h) = (image.width(), image.height());
    let keep = |side: usize| ((side as f64 * ratio as f64).round() as usize).min(side);

    let bbox = match axis {
        BandAxis::Horizontal => {
            let band = keep(h);
            BoundingBox::new(0, (h - band) / 2, w, band)
        }
        BandAxis::Vertical => {
            let band = keep(w);
            BoundingBox::new((w - band) / 2, 0, band, h)
        }
    };
    match bbox {
        Some(bbox) => crop(image, &bbox),
        None => Err(match axis {
            BandAxis::Horizontal => TransformError::InvalidDimension {
                width: w,
                height: 0,
            },
            BandAxis::Vertical => TransformError::InvalidDimension {
                width: 0,
                height: h,
            },
        }),
    }
}

/// Crop to `bbox`, clamped to the raster bounds
pub fn crop(image: &RasterImage, bbox: &BoundingBox) -> Result<RasterImage, TransformError> {
    let Some(clamped) = bbox.clamp_to(image.width(), image.height()) else {
        return Err(TransformError::InvalidDimension {
            width: 0,
            height: 0,
        });
    };
    let c = image.channels();
    let mut out = Vec::with_capacity(clamped.area() * c);
    for y in clamped.y..clamped.bottom() {
        let row = image.row(y);
        out.extend_from_slice(&row[clamped.x * c..clamped.right() * c]);
    }
    RasterImage::new(clamped.width, clamped.height, c, out)
}

/// Average the color channels, then stretch contrast around the 128 midpoint
///
/// `output = factor * (luminance - 128) + 128`, clamped to [0, 255]. The result
/// is single-channel.
pub fn to_high_contrast_grayscale(
    image: &RasterImage,
    factor: f32,
) -> Result<RasterImage, TransformError> {
    if !factor.is_finite() || factor < 0.0 {
        return Err(TransformError::InvalidParameter {
            name: "factor",
            message: format!("contrast factor must be non-negative and finite, got {factor}"),
        });
    }
    let out = average_channels(image.data(), image.channels())
        .into_iter()
        .map(|lum| (factor * (lum as f32 - 128.0) + 128.0).round().clamp(0.0, 255.0) as u8)
        .collect();
    RasterImage::from_gray(image.width(), image.height(), out)
}
