//! Last-resort OCR of the human-readable digits under a barcode

use super::engine::{CallLimit, DecodeEngine};
use super::process::run_bounded;
use crate::models::{DecodeOutcome, RasterImage};
use std::process::Command;
use tracing::trace;

/// Full-text recognizer over a PNG image
pub trait DigitRecognizer: Send + Sync {
    /// Recognized text, or `None` when nothing could be read
    fn recognize(&self, png: &[u8]) -> Option<String>;

    /// Like [`DigitRecognizer::recognize`], giving up once `limit` expires
    fn recognize_within(&self, png: &[u8], limit: &CallLimit) -> Option<String> {
        let _ = limit;
        self.recognize(png)
    }
}

/// `tesseract` CLI restricted to digits, single text line
#[derive(Debug, Clone)]
pub struct TesseractCli {
    program: String,
}

impl Default for TesseractCli {
    fn default() -> Self {
        Self::new("tesseract")
    }
}

impl TesseractCli {
    /// Use a specific `tesseract` binary
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl DigitRecognizer for TesseractCli {
    fn recognize(&self, png: &[u8]) -> Option<String> {
        self.recognize_within(png, &CallLimit::unbounded())
    }

    fn recognize_within(&self, png: &[u8], limit: &CallLimit) -> Option<String> {
        let output = run_bounded(
            Command::new(&self.program)
                .args(["stdin", "stdout", "--psm", "7"])
                .args(["-c", "tessedit_char_whitelist=0123456789"]),
            Some(png.to_vec()),
            limit,
        )?;
        if !output.status.success() {
            trace!(status = ?output.status.code(), "tesseract failed");
            return None;
        }
        let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
        (!text.is_empty()).then_some(text)
    }
}

/// OCR engine; output carries no symbology and is searched for an embedded code
pub struct OcrDigitEngine {
    recognizer: Box<dyn DigitRecognizer>,
}

impl OcrDigitEngine {
    /// Engine over a custom recognizer
    pub fn new(recognizer: Box<dyn DigitRecognizer>) -> Self {
        Self { recognizer }
    }
}

impl Default for OcrDigitEngine {
    fn default() -> Self {
        Self::new(Box::new(TesseractCli::default()))
    }
}

impl DecodeEngine for OcrDigitEngine {
    fn name(&self) -> &'static str {
        "ocr"
    }

    fn decode(&self, image: &RasterImage) -> DecodeOutcome {
        self.decode_within(image, &CallLimit::unbounded())
    }

    fn decode_within(&self, image: &RasterImage, limit: &CallLimit) -> DecodeOutcome {
        let Ok(png) = image.encode_png() else {
            return DecodeOutcome::NotFound;
        };
        match self.recognizer.recognize_within(&png, limit) {
            Some(text) => DecodeOutcome::raw_text(text),
            None => DecodeOutcome::NotFound,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Canned(Option<&'static str>);

    impl DigitRecognizer for Canned {
        fn recognize(&self, png: &[u8]) -> Option<String> {
            assert!(png.starts_with(&[0x89, b'P', b'N', b'G']));
            self.0.map(str::to_string)
        }
    }

    #[test]
    fn test_raw_text_has_no_symbology() {
        let engine = OcrDigitEngine::new(Box::new(Canned(Some("4 006381 333931"))));
        let img = RasterImage::filled(10, 4, 3, 255).unwrap();
        assert_eq!(engine.decode(&img), DecodeOutcome::raw_text("4 006381 333931"));
    }

    #[test]
    fn test_nothing_recognized() {
        let engine = OcrDigitEngine::new(Box::new(Canned(None)));
        let img = RasterImage::filled(10, 4, 1, 0).unwrap();
        assert!(engine.decode(&img).is_not_found());
    }

    #[cfg(unix)]
    #[test]
    fn test_hung_recognizer_is_stopped() {
        struct Hanging;

        impl DigitRecognizer for Hanging {
            fn recognize(&self, _: &[u8]) -> Option<String> {
                None
            }

            fn recognize_within(&self, png: &[u8], limit: &CallLimit) -> Option<String> {
                let out = run_bounded(
                    Command::new("sh").args(["-c", "sleep 5"]),
                    Some(png.to_vec()),
                    limit,
                )?;
                Some(String::from_utf8_lossy(&out.stdout).into_owned())
            }
        }

        let engine = OcrDigitEngine::new(Box::new(Hanging));
        let img = RasterImage::filled(10, 4, 1, 0).unwrap();
        let started = std::time::Instant::now();
        let limit = CallLimit::within(std::time::Duration::from_millis(150));
        assert!(engine.decode_within(&img, &limit).is_not_found());
        assert!(started.elapsed() < std::time::Duration::from_secs(2));
    }

    #[test]
    fn test_missing_tesseract() {
        let cli = TesseractCli::new("definitely-not-a-real-tesseract");
        assert_eq!(cli.recognize(b"not a png"), None);
    }
}
