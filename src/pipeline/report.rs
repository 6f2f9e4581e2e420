//! What one scan did and what it found

use crate::models::{BoundingBox, DetectionCandidate, Symbology, ValidatedBarcode};
use serde::{Serialize, Serializer};
use std::time::Duration;

/// Orchestrator states, recorded in the order they were visited
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PipelineStage {
    /// Input accepted
    Idle,
    /// Waiting on the ROI detector
    Detecting,
    /// Detector answered (possibly with zero candidates)
    Detected,
    /// Detector failed, timed out, was cancelled or is not configured
    DetectionFailed,
    /// Building transform variants
    Transforming,
    /// Running the decode cascade
    Decoding,
    /// A validated code was found
    Found,
    /// The run ended without a code
    Exhausted,
}

/// How the detector step went
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DetectionStatus {
    /// Detector returned candidates
    Detected {
        /// Candidates after normalisation
        count: usize,
    },
    /// Detector answered with nothing
    NoCandidates,
    /// Network, auth, HTTP or format failure
    Unavailable {
        /// Failure description
        message: String,
    },
    /// Service is loading its model
    Busy {
        /// Wait reported by the service, in milliseconds
        estimated_wait_ms: Option<u64>,
    },
    /// No answer within the detector timeout
    TimedOut,
    /// Scan was cancelled while waiting
    Cancelled,
    /// No detector configured
    Skipped,
}

impl DetectionStatus {
    /// True when the full-image path ran because of a detector problem
    pub fn is_degraded(&self) -> bool {
        matches!(
            self,
            DetectionStatus::Unavailable { .. }
                | DetectionStatus::Busy { .. }
                | DetectionStatus::TimedOut
        )
    }
}

/// Why a run ended without a code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotFoundReason {
    /// Every variant was tried
    Exhausted,
    /// Attempt or time ceiling reached first
    BudgetExhausted,
    /// Cancelled by the caller
    Cancelled,
}

/// Terminal result of a scan
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ScanOutcome {
    /// First validated read in attempt order
    Found {
        /// The code
        barcode: ValidatedBarcode,
        /// Engine that read it
        engine: &'static str,
        /// Transform chain of the winning variant
        provenance: String,
        /// Detector candidate the variant came from (`None` for full image)
        candidate_index: Option<usize>,
        /// Zero-based attempt index
        attempt_index: usize,
    },
    /// Nothing validated
    NotFound {
        /// Why the run stopped
        reason: NotFoundReason,
    },
}

/// One returned barcode with the region it was found in
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarcodeHit {
    /// Validated digits
    pub text: String,
    /// Symbology of the read
    pub symbology: Symbology,
    /// Candidate box, when the hit came from a ROI
    #[serde(rename = "box")]
    pub bbox: Option<BoundingBox>,
    /// Candidate score, when the hit came from a ROI
    pub score: Option<f32>,
}

/// Diagnostics for one decode attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttemptRecord {
    /// Zero-based attempt index
    pub index: usize,
    /// Variant label
    pub provenance: String,
    /// Whether the cascade validated a code on it
    pub found: bool,
}

/// Full result of [`crate::pipeline::Orchestrator::scan`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanReport {
    /// Every detector candidate, even when a barcode was found
    pub boxes: Vec<DetectionCandidate>,
    /// Zero or one barcode
    pub barcodes: Vec<BarcodeHit>,
    /// Terminal result
    pub outcome: ScanOutcome,
    /// Detector step result
    pub detection: DetectionStatus,
    /// Visited states
    pub stages: Vec<PipelineStage>,
    /// Attempts made, in order
    pub attempts: Vec<AttemptRecord>,
    /// Wall-clock time of the run
    #[serde(rename = "elapsed_ms", serialize_with = "serialize_millis")]
    pub elapsed: Duration,
}

fn serialize_millis<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

impl ScanReport {
    /// The validated code, if any
    pub fn barcode(&self) -> Option<&ValidatedBarcode> {
        match &self.outcome {
            ScanOutcome::Found { barcode, .. } => Some(barcode),
            ScanOutcome::NotFound { .. } => None,
        }
    }

    /// True when a code was found
    pub fn is_found(&self) -> bool {
        matches!(self.outcome, ScanOutcome::Found { .. })
    }
}
