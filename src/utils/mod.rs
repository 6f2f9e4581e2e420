//! Image processing helpers
//!
//! - Grayscale conversion (RGB/RGBA to luminance)
//! - Scanline binarization and run extraction for the 1D readers
//! - Raster transforms used to build decode variants

pub mod binarization;
pub mod grayscale;
pub mod transform;
