use super::Symbology;
use serde::Serialize;

/// Result of one engine looking at one raster
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeOutcome {
    /// The engine read something
    Decoded {
        /// Raw payload text
        text: String,
        /// Reported symbology; `None` for engines that only see characters (OCR)
        symbology: Option<Symbology>,
    },
    /// Nothing readable
    NotFound,
}

impl DecodeOutcome {
    /// Shorthand for a decode with a known symbology
    pub fn decoded(text: impl Into<String>, symbology: Symbology) -> Self {
        DecodeOutcome::Decoded {
            text: text.into(),
            symbology: Some(symbology),
        }
    }

    /// Shorthand for raw text with no symbology attached
    pub fn raw_text(text: impl Into<String>) -> Self {
        DecodeOutcome::Decoded {
            text: text.into(),
            symbology: None,
        }
    }

    /// True for `NotFound`
    pub fn is_not_found(&self) -> bool {
        matches!(self, DecodeOutcome::NotFound)
    }
}

/// A digit string that satisfies its symbology's length and check-digit rule
///
/// Built only by `decoder::checksum`, so holding one is proof of validation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ValidatedBarcode {
    digits: String,
    symbology: Symbology,
}

impl ValidatedBarcode {
    pub(crate) fn new(digits: String, symbology: Symbology) -> Self {
        debug_assert!(digits.bytes().all(|b| b.is_ascii_digit()));
        debug_assert!(matches!(digits.len(), 6 | 8 | 12 | 13 | 14));
        Self { digits, symbology }
    }

    /// ASCII digits of the code
    pub fn digits(&self) -> &str {
        &self.digits
    }

    /// Symbology the digits were validated against
    pub fn symbology(&self) -> Symbology {
        self.symbology
    }
}
