//! Error types shared across the pipeline
//!
//! Only input errors and programming errors surface as `Err`. Detector failures
//! and decode misses are values (see `detector::DetectError` and
//! `models::DecodeOutcome`).

use thiserror::Error;

/// Failure of a raster constructor or transform
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransformError {
    /// The requested operation would yield an empty raster
    #[error("invalid raster dimension {width}x{height}")]
    InvalidDimension {
        /// Resulting width
        width: usize,
        /// Resulting height
        height: usize,
    },
    /// A transform parameter was outside its domain
    #[error("invalid transform parameter '{name}': {message}")]
    InvalidParameter {
        /// Parameter name
        name: &'static str,
        /// Human readable reason
        message: String,
    },
    /// The pixel buffer does not match the declared geometry
    #[error("pixel buffer has {actual} bytes, expected {width}x{height}x{channels}")]
    BufferMismatch {
        /// Declared width
        width: usize,
        /// Declared height
        height: usize,
        /// Declared channel count
        channels: usize,
        /// Actual buffer length
        actual: usize,
    },
    /// Only Gray, RGB and RGBA layouts are supported
    #[error("unsupported channel count {0}")]
    UnsupportedChannels(usize),
}

/// Configuration values that cannot drive a pipeline run
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A list that must contain at least one entry was empty
    #[error("'{0}' must not be empty")]
    Empty(&'static str),
    /// A numeric setting was out of range
    #[error("'{name}' out of range: {message}")]
    OutOfRange {
        /// Setting name
        name: &'static str,
        /// Human readable reason
        message: String,
    },
}

/// Errors returned by the pipeline entry point
#[derive(Error, Debug)]
pub enum ScanError {
    /// Zero-byte upload
    #[error("image input is empty")]
    EmptyInput,
    /// Bytes could not be decoded as JPEG/PNG/WebP/...
    #[error("failed to decode image: {0}")]
    InvalidImage(#[from] image::ImageError),
    /// Transform misuse (a programming error, not a decode miss)
    #[error(transparent)]
    Transform(#[from] TransformError),
    /// Pipeline configuration rejected before the run
    #[error(transparent)]
    Config(#[from] ConfigError),
}
