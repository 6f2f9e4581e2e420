//! barcode_cascade - retail barcode localization and decoding
//!
//! Finds and reads the EAN/UPC (and other 1D) code on a product photo: an
//! optional ROI detector proposes regions, each region and the whole image
//! are expanded into transform variants, and an ordered cascade of decode
//! engines runs until one read passes GTIN checksum validation.

#![warn(missing_docs)]
#![allow(clippy::missing_docs_in_private_items)]

/// Pipeline tunables and environment overrides
pub mod config;
/// Checksum validation, the decode engine seam and the engine cascade
pub mod decoder;
/// Region-of-interest detection
pub mod detector;
/// Error types
pub mod error;
/// Core data structures (RasterImage, BoundingBox, ValidatedBarcode, etc.)
pub mod models;
/// Orchestrator: detection, variants, cascade
pub mod pipeline;
/// Synthetic barcode rendering for tests, benches and the CLI
pub mod synth;
/// Dataset and reading-rate helpers for the CLI and benches
pub mod tools;
/// Utility functions (grayscale, binarization, transforms)
pub mod utils;

pub use config::{DetectorConfig, FullImageFallback, PipelineConfig};
pub use decoder::{DecodeCascade, DecodeEngine};
pub use detector::{DetectError, RegionDetector};
pub use error::{ConfigError, ScanError, TransformError};
pub use models::{
    BoundingBox, DecodeOutcome, DetectionCandidate, RasterImage, Symbology, ValidatedBarcode,
};
pub use pipeline::{CancelToken, Orchestrator, ScanOutcome, ScanReport};

/// Scan encoded image bytes with the environment configuration
///
/// Uses the HTTP detector when `BARCODE_DETECTOR_URL` is set, the full-image
/// path otherwise.
pub fn scan(bytes: &[u8]) -> Result<ScanReport, ScanError> {
    Orchestrator::from_env()?.scan(bytes)
}

/// Scan encoded image bytes with an explicit configuration and no detector
pub fn scan_with_config(bytes: &[u8], config: PipelineConfig) -> Result<ScanReport, ScanError> {
    Orchestrator::new(config)?.scan(bytes)
}
