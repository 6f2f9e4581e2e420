//! The localize-and-decode cascade for one image
//!
//! Detector call first (bounded, optional), then every transform variant in
//! order through the decode cascade until one read validates.

/// Scan results and diagnostics
pub mod report;
/// Lazy attempt generation
pub mod variants;

pub use report::{
    AttemptRecord, BarcodeHit, DetectionStatus, NotFoundReason, PipelineStage, ScanOutcome,
    ScanReport,
};
pub use variants::{TransformVariant, VariantPlan, Variants};

use crate::config::{DetectorConfig, PipelineConfig};
use crate::decoder::{CallLimit, CascadeHit, DecodeCascade};
use crate::detector::{DetectError, HttpRegionDetector, RegionDetector};
use crate::error::{ConfigError, ScanError};
use crate::models::{DetectionCandidate, RasterImage};
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};

/// Granularity of cancellation checks while waiting on the detector
const DETECT_POLL: Duration = Duration::from_millis(20);

/// Cooperative cancellation shared between a caller and a running scan
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// A token that is not cancelled
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the scan to stop; takes effect before the next attempt and
    /// stops any external decoder process still running
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether [`CancelToken::cancel`] was called
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Runs detector, transforms and decode cascade for one image at a time
///
/// Holds no per-scan state; one instance can serve many threads.
#[derive(Clone)]
pub struct Orchestrator {
    config: PipelineConfig,
    detector: Option<Arc<dyn RegionDetector>>,
    cascade: Arc<DecodeCascade>,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("config", &self.config)
            .field("detector", &self.detector.is_some())
            .field("cascade", &self.cascade)
            .finish()
    }
}

impl Orchestrator {
    /// Standard cascade, no detector
    pub fn new(config: PipelineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            detector: None,
            cascade: Arc::new(DecodeCascade::standard()),
        })
    }

    /// Environment configuration; uses the HTTP detector when
    /// `BARCODE_DETECTOR_URL` is set
    pub fn from_env() -> Result<Self, ConfigError> {
        let orchestrator = Self::new(PipelineConfig::from_env())?;
        let Some(detector_config) = DetectorConfig::from_env(orchestrator.config.detector_timeout)
        else {
            return Ok(orchestrator);
        };
        match HttpRegionDetector::from_config(&detector_config) {
            Ok(detector) => Ok(orchestrator.with_detector(detector)),
            Err(err) => {
                warn!(endpoint = %detector_config.endpoint, %err, "detector disabled");
                Ok(orchestrator)
            }
        }
    }

    /// Use `detector` for ROI proposals
    pub fn with_detector(mut self, detector: impl RegionDetector + 'static) -> Self {
        self.detector = Some(Arc::new(detector));
        self
    }

    /// Replace the decode cascade
    pub fn with_cascade(mut self, cascade: DecodeCascade) -> Self {
        self.cascade = Arc::new(cascade);
        self
    }

    /// Active configuration
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Scan encoded image bytes
    pub fn scan(&self, bytes: &[u8]) -> Result<ScanReport, ScanError> {
        self.scan_with_cancel(bytes, &CancelToken::new())
    }

    /// Scan encoded image bytes, stopping early once `cancel` fires
    pub fn scan_with_cancel(
        &self,
        bytes: &[u8],
        cancel: &CancelToken,
    ) -> Result<ScanReport, ScanError> {
        if bytes.is_empty() {
            return Err(ScanError::EmptyInput);
        }
        let raster = RasterImage::decode(bytes)?;
        Ok(self.scan_raster(&raster, cancel))
    }

    /// Scan an already decoded raster
    pub fn scan_raster(&self, raster: &RasterImage, cancel: &CancelToken) -> ScanReport {
        let started = Instant::now();
        let deadline = started + self.config.time_budget;
        let mut stages = vec![PipelineStage::Idle];

        let (candidates, detection) = self.detect(raster, deadline, cancel, &mut stages);

        stages.push(PipelineStage::Transforming);
        let plan = VariantPlan::new(raster, &candidates, &self.config);
        debug!(
            candidates = candidates.len(),
            usable = plan.roi_count(),
            max_variants = plan.max_len(),
            "variant plan ready"
        );

        stages.push(PipelineStage::Decoding);
        let mut attempts = Vec::new();
        let found = self.run_attempts(&plan, deadline, cancel, &mut attempts);

        let (outcome, barcodes) = match found {
            Ok((attempt_index, variant, hit)) => {
                stages.push(PipelineStage::Found);
                info!(
                    code = hit.barcode.digits(),
                    symbology = %hit.barcode.symbology(),
                    engine = hit.engine,
                    provenance = %variant.provenance,
                    attempt_index,
                    "barcode found"
                );
                let source = variant.candidate.and_then(|i| candidates.get(i));
                let barcodes = vec![BarcodeHit {
                    text: hit.barcode.digits().to_string(),
                    symbology: hit.barcode.symbology(),
                    bbox: source.map(|c| c.bbox),
                    score: source.map(|c| c.score),
                }];
                let outcome = ScanOutcome::Found {
                    barcode: hit.barcode,
                    engine: hit.engine,
                    provenance: variant.provenance,
                    candidate_index: variant.candidate,
                    attempt_index,
                };
                (outcome, barcodes)
            }
            Err(reason) => {
                stages.push(PipelineStage::Exhausted);
                debug!(?reason, attempts = attempts.len(), "no barcode");
                (ScanOutcome::NotFound { reason }, Vec::new())
            }
        };

        ScanReport {
            boxes: candidates,
            barcodes,
            outcome,
            detection,
            stages,
            attempts,
            elapsed: started.elapsed(),
        }
    }

    fn detect(
        &self,
        raster: &RasterImage,
        deadline: Instant,
        cancel: &CancelToken,
        stages: &mut Vec<PipelineStage>,
    ) -> (Vec<DetectionCandidate>, DetectionStatus) {
        let Some(detector) = self.detector.clone() else {
            stages.push(PipelineStage::DetectionFailed);
            debug!("no detector configured, full-image path only");
            return (Vec::new(), DetectionStatus::Skipped);
        };
        stages.push(PipelineStage::Detecting);

        let limit = self
            .config
            .detector_timeout
            .min(deadline.saturating_duration_since(Instant::now()));
        let result = call_detector(detector, raster, limit, cancel);

        match result {
            Ok(candidates) => {
                stages.push(PipelineStage::Detected);
                debug!(count = candidates.len(), "detector answered");
                let status = if candidates.is_empty() {
                    DetectionStatus::NoCandidates
                } else {
                    DetectionStatus::Detected {
                        count: candidates.len(),
                    }
                };
                (candidates, status)
            }
            Err(failure) => {
                stages.push(PipelineStage::DetectionFailed);
                let status = match failure {
                    DetectFailure::Cancelled => {
                        debug!("cancelled while waiting on detector");
                        DetectionStatus::Cancelled
                    }
                    DetectFailure::Service(err) => {
                        warn!(%err, "detector degraded, scanning full image");
                        match err {
                            DetectError::ServiceUnavailable(message) => {
                                DetectionStatus::Unavailable { message }
                            }
                            DetectError::ServiceBusy { estimated_wait } => DetectionStatus::Busy {
                                estimated_wait_ms: estimated_wait.map(|d| d.as_millis() as u64),
                            },
                            DetectError::Timeout(_) => DetectionStatus::TimedOut,
                        }
                    }
                };
                (Vec::new(), status)
            }
        }
    }

    /// Returns the winning attempt, or why none won
    fn run_attempts(
        &self,
        plan: &VariantPlan<'_>,
        deadline: Instant,
        cancel: &CancelToken,
        attempts: &mut Vec<AttemptRecord>,
    ) -> Result<(usize, TransformVariant, CascadeHit), NotFoundReason> {
        let mut variants = plan.iter();
        let mut index = 0usize;
        loop {
            if cancel.is_cancelled() {
                return Err(NotFoundReason::Cancelled);
            }
            if index >= self.config.max_attempts || Instant::now() >= deadline {
                debug!(index, "attempt budget exhausted");
                return Err(NotFoundReason::BudgetExhausted);
            }

            let batch_size = self.config.parallelism.min(self.config.max_attempts - index);
            let batch: Vec<TransformVariant> = variants.by_ref().take(batch_size).collect();
            if batch.is_empty() {
                return Err(NotFoundReason::Exhausted);
            }

            let limit = CallLimit::new(deadline, cancel.clone());
            let hits: Vec<Option<CascadeHit>> = if batch.len() == 1 {
                batch
                    .iter()
                    .map(|v| self.cascade.decode_within(&v.raster, &limit))
                    .collect()
            } else {
                batch
                    .par_iter()
                    .map(|v| self.cascade.decode_within(&v.raster, &limit))
                    .collect()
            };

            let count = batch.len();
            for (offset, (variant, hit)) in batch.into_iter().zip(hits).enumerate() {
                let attempt_index = index + offset;
                trace!(attempt_index, provenance = %variant.provenance, found = hit.is_some(), "attempt");
                attempts.push(AttemptRecord {
                    index: attempt_index,
                    provenance: variant.provenance.clone(),
                    found: hit.is_some(),
                });
                if let Some(hit) = hit {
                    return Ok((attempt_index, variant, hit));
                }
            }
            index += count;
        }
    }
}

enum DetectFailure {
    Service(DetectError),
    Cancelled,
}

/// Run the detector on its own thread and wait at most `limit`
///
/// A detector that overruns is abandoned; its thread finishes in the
/// background and the result is dropped.
fn call_detector(
    detector: Arc<dyn RegionDetector>,
    raster: &RasterImage,
    limit: Duration,
    cancel: &CancelToken,
) -> Result<Vec<DetectionCandidate>, DetectFailure> {
    let (tx, rx) = mpsc::channel();
    let image = raster.clone();
    let spawned = std::thread::Builder::new()
        .name("roi-detector".to_string())
        .spawn(move || {
            let _ = tx.send(detector.detect(&image));
        });
    if let Err(err) = spawned {
        return Err(DetectFailure::Service(DetectError::ServiceUnavailable(
            format!("failed to start detector thread: {err}"),
        )));
    }

    let wait_until = Instant::now() + limit;
    loop {
        if cancel.is_cancelled() {
            return Err(DetectFailure::Cancelled);
        }
        let remaining = wait_until.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(DetectFailure::Service(DetectError::Timeout(limit)));
        }
        match rx.recv_timeout(remaining.min(DETECT_POLL)) {
            Ok(result) => return result.map_err(DetectFailure::Service),
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => {
                return Err(DetectFailure::Service(DetectError::ServiceUnavailable(
                    "detector thread exited without a result".to_string(),
                )));
            }
        }
    }
}
