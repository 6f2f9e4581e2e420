//! Barcode decoding
//!
//! - Check-digit validation and digit-string extraction
//! - The `DecodeEngine` seam and the ordered cascade over engines
//! - Engines: native scanline reader, rxing, ZBar, OCR

/// Ordered fallback across engines
pub mod cascade;
/// EAN/UPC/GTIN check digits and substring search
pub mod checksum;
/// The engine seam
pub mod engine;
/// Native scanline decoder for 1D symbologies
pub mod linear;
/// OCR of the printed digits
pub mod ocr;
/// ZBar command-line reader
pub mod platform;
/// Deadline-bounded child processes
pub mod process;
/// rxing multi-format reader
pub mod rxing_engine;

pub use cascade::{CascadeHit, DecodeCascade};
pub use engine::{CallLimit, DecodeEngine};
pub use linear::{LinearOptions, LinearScanEngine};
pub use ocr::{DigitRecognizer, OcrDigitEngine, TesseractCli};
pub use platform::PlatformEngine;
pub use rxing_engine::RxingEngine;
