use crate::error::{ScanError, TransformError};
use crate::utils::grayscale::{rgb_to_grayscale, rgba_to_grayscale};
use image::{DynamicImage, GrayImage, ImageBuffer, ImageOutputFormat, RgbImage, RgbaImage};
use std::io::Cursor;

/// An owned, immutable pixel buffer
///
/// Pixels are stored row-major with a fixed channel order: Gray (1), RGB (3)
/// or RGBA (4). The buffer length always equals `width * height * channels`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterImage {
    width: usize,
    height: usize,
    channels: usize,
    data: Vec<u8>,
}

impl RasterImage {
    /// Build a raster from raw bytes, validating the geometry
    pub fn new(
        width: usize,
        height: usize,
        channels: usize,
        data: Vec<u8>,
    ) -> Result<Self, TransformError> {
        if !matches!(channels, 1 | 3 | 4) {
            return Err(TransformError::UnsupportedChannels(channels));
        }
        if width == 0 || height == 0 {
            return Err(TransformError::InvalidDimension { width, height });
        }
        if data.len() != width * height * channels {
            return Err(TransformError::BufferMismatch {
                width,
                height,
                channels,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            channels,
            data,
        })
    }

    /// Geometry-preserving constructor for transforms that only permute pixels
    pub(crate) fn from_raw_parts(width: usize, height: usize, channels: usize, data: Vec<u8>) -> Self {
        debug_assert_eq!(data.len(), width * height * channels);
        Self {
            width,
            height,
            channels,
            data,
        }
    }

    /// Build a single-channel raster
    pub fn from_gray(width: usize, height: usize, data: Vec<u8>) -> Result<Self, TransformError> {
        Self::new(width, height, 1, data)
    }

    /// A raster where every byte has the same value
    pub fn filled(
        width: usize,
        height: usize,
        channels: usize,
        value: u8,
    ) -> Result<Self, TransformError> {
        Self::new(width, height, channels, vec![value; width * height * channels])
    }

    /// Decode JPEG/PNG/WebP (or anything else `image` understands) into a raster
    pub fn decode(bytes: &[u8]) -> Result<Self, ScanError> {
        if bytes.is_empty() {
            return Err(ScanError::EmptyInput);
        }
        let img = image::load_from_memory(bytes)?;
        Ok(Self::from_dynamic(&img)?)
    }

    /// Convert from an `image` crate buffer, keeping gray images single-channel
    pub fn from_dynamic(img: &DynamicImage) -> Result<Self, TransformError> {
        match img {
            DynamicImage::ImageLuma8(gray) => {
                let (w, h) = gray.dimensions();
                Self::new(w as usize, h as usize, 1, gray.as_raw().clone())
            }
            other if other.color().has_alpha() => {
                let rgba = other.to_rgba8();
                let (w, h) = rgba.dimensions();
                Self::new(w as usize, h as usize, 4, rgba.into_raw())
            }
            other => {
                let rgb = other.to_rgb8();
                let (w, h) = rgb.dimensions();
                Self::new(w as usize, h as usize, 3, rgb.into_raw())
            }
        }
    }

    /// Convert into an `image` crate buffer of the matching color type
    pub fn to_dynamic(&self) -> Result<DynamicImage, TransformError> {
        let (w, h) = (self.width as u32, self.height as u32);
        let data = self.data.clone();
        let img = match self.channels {
            1 => ImageBuffer::from_raw(w, h, data).map(|b: GrayImage| DynamicImage::ImageLuma8(b)),
            3 => ImageBuffer::from_raw(w, h, data).map(|b: RgbImage| DynamicImage::ImageRgb8(b)),
            4 => ImageBuffer::from_raw(w, h, data).map(|b: RgbaImage| DynamicImage::ImageRgba8(b)),
            other => return Err(TransformError::UnsupportedChannels(other)),
        };
        img.ok_or(TransformError::BufferMismatch {
            width: self.width,
            height: self.height,
            channels: self.channels,
            actual: self.data.len(),
        })
    }

    /// PNG-encode the raster (used for the detector upload and external tools)
    pub fn encode_png(&self) -> Result<Vec<u8>, ScanError> {
        let img = self.to_dynamic()?;
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageOutputFormat::Png)?;
        Ok(out.into_inner())
    }

    /// Raster width in pixels
    pub fn width(&self) -> usize {
        self.width
    }

    /// Raster height in pixels
    pub fn height(&self) -> usize {
        self.height
    }

    /// Channels per pixel (1, 3 or 4)
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Larger of width and height
    pub fn max_dimension(&self) -> usize {
        self.width.max(self.height)
    }

    /// Raw row-major pixel bytes
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Bytes of the pixel at (x, y)
    pub fn pixel(&self, x: usize, y: usize) -> &[u8] {
        let start = (y * self.width + x) * self.channels;
        &self.data[start..start + self.channels]
    }

    /// One row of pixel bytes
    pub fn row(&self, y: usize) -> &[u8] {
        let stride = self.width * self.channels;
        &self.data[y * stride..(y + 1) * stride]
    }

    /// Weighted luma plane (`0.299R + 0.587G + 0.114B`), one byte per pixel
    pub fn to_luma(&self) -> Vec<u8> {
        match self.channels {
            1 => self.data.clone(),
            3 => rgb_to_grayscale(&self.data, self.width, self.height),
            _ => rgba_to_grayscale(&self.data, self.width, self.height),
        }
    }

    /// Consume the raster and return its pixel bytes
    pub fn into_raw(self) -> Vec<u8> {
        self.data
    }
}
