//! Region-of-interest detection
//!
//! The detector proposes boxes where a barcode probably is. It is an
//! optimisation only: every failure mode is recoverable and the pipeline
//! falls back to scanning the whole image.

/// Remote detector over HTTP
pub mod http;
/// Vendor response shapes to canonical candidates
pub mod normalize;

use crate::models::{DetectionCandidate, RasterImage};
use std::time::Duration;
use thiserror::Error;

pub use http::HttpRegionDetector;
pub use normalize::normalize_detections;

/// Recoverable detector failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DetectError {
    /// Network, auth, HTTP or response-format failure
    #[error("detector unavailable: {0}")]
    ServiceUnavailable(String),
    /// The service is warming up its model
    #[error("detector busy (estimated wait {estimated_wait:?})")]
    ServiceBusy {
        /// Wait time reported by the service, if any
        estimated_wait: Option<Duration>,
    },
    /// No answer within the configured timeout
    #[error("detector timed out after {0:?}")]
    Timeout(Duration),
}

/// Proposes candidate barcode regions for an image
pub trait RegionDetector: Send + Sync {
    /// Candidates in descending score order
    fn detect(&self, image: &RasterImage) -> Result<Vec<DetectionCandidate>, DetectError>;
}

impl<D: RegionDetector + ?Sized> RegionDetector for Box<D> {
    fn detect(&self, image: &RasterImage) -> Result<Vec<DetectionCandidate>, DetectError> {
        (**self).detect(image)
    }
}

impl<D: RegionDetector + ?Sized> RegionDetector for std::sync::Arc<D> {
    fn detect(&self, image: &RasterImage) -> Result<Vec<DetectionCandidate>, DetectError> {
        (**self).detect(image)
    }
}

/// Detector that never proposes anything (no endpoint configured)
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopDetector;

impl RegionDetector for NoopDetector {
    fn detect(&self, _image: &RasterImage) -> Result<Vec<DetectionCandidate>, DetectError> {
        Ok(Vec::new())
    }
}
