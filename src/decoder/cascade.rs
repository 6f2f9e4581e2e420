//! Ordered fallback across decode engines

use super::checksum::validate_decoded;
use super::engine::{CallLimit, DecodeEngine};
use super::linear::LinearScanEngine;
use super::ocr::OcrDigitEngine;
use super::platform::PlatformEngine;
use super::rxing_engine::RxingEngine;
use crate::models::{DecodeOutcome, RasterImage, ValidatedBarcode};
use std::panic::{AssertUnwindSafe, catch_unwind};
use tracing::{debug, trace};

/// A validated read and the engine that produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CascadeHit {
    /// Checksum-validated code
    pub barcode: ValidatedBarcode,
    /// [`DecodeEngine::name`] of the winning engine
    pub engine: &'static str,
}

/// Engines tried in a fixed priority order until one yields a validated code
pub struct DecodeCascade {
    engines: Vec<Box<dyn DecodeEngine>>,
}

impl DecodeCascade {
    /// Cascade over an explicit engine list (tried front to back)
    pub fn new(engines: Vec<Box<dyn DecodeEngine>>) -> Self {
        Self { engines }
    }

    /// Native scanline decoder, rxing, ZBar, then OCR
    pub fn standard() -> Self {
        Self::new(vec![
            Box::new(LinearScanEngine::default()),
            Box::new(RxingEngine::default()),
            Box::new(PlatformEngine::default()),
            Box::new(OcrDigitEngine::default()),
        ])
    }

    /// Names of the engines in priority order
    pub fn engine_names(&self) -> Vec<&'static str> {
        self.engines.iter().map(|e| e.name()).collect()
    }

    /// Number of engines
    pub fn len(&self) -> usize {
        self.engines.len()
    }

    /// True when no engines are configured
    pub fn is_empty(&self) -> bool {
        self.engines.is_empty()
    }

    /// Run the engines in order; the first validated read wins
    pub fn decode(&self, image: &RasterImage) -> Option<CascadeHit> {
        self.decode_within(image, &CallLimit::unbounded())
    }

    /// Like [`DecodeCascade::decode`]; no engine starts after `limit` expires
    pub fn decode_within(&self, image: &RasterImage, limit: &CallLimit) -> Option<CascadeHit> {
        self.engines.iter().find_map(|engine| {
            if limit.is_expired() {
                trace!(engine = engine.name(), "limit expired, engine skipped");
                return None;
            }
            let outcome = run_guarded(engine.as_ref(), image, limit);
            let DecodeOutcome::Decoded { text, symbology } = outcome else {
                trace!(engine = engine.name(), "not found");
                return None;
            };
            match validate_decoded(&text, symbology) {
                Some(barcode) => Some(CascadeHit {
                    barcode,
                    engine: engine.name(),
                }),
                None => {
                    debug!(engine = engine.name(), %text, ?symbology, "rejected by checksum");
                    None
                }
            }
        })
    }
}

impl Default for DecodeCascade {
    fn default() -> Self {
        Self::standard()
    }
}

impl std::fmt::Debug for DecodeCascade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecodeCascade")
            .field("engines", &self.engine_names())
            .finish()
    }
}

/// A panicking engine counts as `NotFound`
fn run_guarded(engine: &dyn DecodeEngine, image: &RasterImage, limit: &CallLimit) -> DecodeOutcome {
    match catch_unwind(AssertUnwindSafe(|| engine.decode_within(image, limit))) {
        Ok(outcome) => outcome,
        Err(_) => {
            debug!(engine = engine.name(), "engine panicked");
            DecodeOutcome::NotFound
        }
    }
}
