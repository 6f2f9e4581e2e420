//! Multi-format 1D reader backed by `rxing`

use super::engine::DecodeEngine;
use crate::models::{DecodeOutcome, RasterImage, Symbology};
use rxing::Reader;
use rxing::common::HybridBinarizer;
use rxing::{
    BarcodeFormat, BinaryBitmap, DecodeHintType, DecodeHintValue, DecodingHintDictionary,
    Luma8LuminanceSource, MultiUseMultiFormatReader,
};
use std::collections::HashSet;
use tracing::trace;

/// Decoder B of the cascade
#[derive(Debug, Clone)]
pub struct RxingEngine {
    try_harder: bool,
    also_inverted: bool,
}

impl Default for RxingEngine {
    fn default() -> Self {
        Self {
            try_harder: true,
            also_inverted: true,
        }
    }
}

fn to_rxing(symbology: Symbology) -> BarcodeFormat {
    match symbology {
        Symbology::Ean13 => BarcodeFormat::EAN_13,
        Symbology::Ean8 => BarcodeFormat::EAN_8,
        Symbology::UpcA => BarcodeFormat::UPC_A,
        Symbology::UpcE => BarcodeFormat::UPC_E,
        Symbology::Code128 => BarcodeFormat::CODE_128,
        Symbology::Code39 => BarcodeFormat::CODE_39,
        Symbology::Itf => BarcodeFormat::ITF,
    }
}

fn from_rxing(format: &BarcodeFormat) -> Option<Symbology> {
    Symbology::ALL
        .into_iter()
        .find(|&s| to_rxing(s) == *format)
}

impl RxingEngine {
    /// Engine with explicit hint switches
    pub fn new(try_harder: bool, also_inverted: bool) -> Self {
        Self {
            try_harder,
            also_inverted,
        }
    }

    fn hints(&self) -> DecodingHintDictionary {
        let mut hints = DecodingHintDictionary::new();
        if self.try_harder {
            hints.insert(DecodeHintType::TRY_HARDER, DecodeHintValue::TryHarder(true));
        }
        if self.also_inverted {
            hints.insert(
                DecodeHintType::ALSO_INVERTED,
                DecodeHintValue::AlsoInverted(true),
            );
        }
        let formats: HashSet<BarcodeFormat> = Symbology::ALL.into_iter().map(to_rxing).collect();
        hints.insert(
            DecodeHintType::POSSIBLE_FORMATS,
            DecodeHintValue::PossibleFormats(formats),
        );
        hints
    }
}

impl DecodeEngine for RxingEngine {
    fn name(&self) -> &'static str {
        "rxing"
    }

    fn decode(&self, image: &RasterImage) -> DecodeOutcome {
        let (Ok(width), Ok(height)) = (u32::try_from(image.width()), u32::try_from(image.height()))
        else {
            return DecodeOutcome::NotFound;
        };
        let source = Luma8LuminanceSource::new(image.to_luma(), width, height);
        let mut bitmap = BinaryBitmap::new(HybridBinarizer::new(source));
        let mut reader = MultiUseMultiFormatReader::default();

        match reader.decode_with_hints(&mut bitmap, &self.hints()) {
            Ok(result) => match from_rxing(result.getBarcodeFormat()) {
                Some(symbology) => DecodeOutcome::decoded(result.getText(), symbology),
                None => {
                    trace!(format = ?result.getBarcodeFormat(), "unsupported format ignored");
                    DecodeOutcome::NotFound
                }
            },
            Err(err) => {
                trace!(?err, "rxing found nothing");
                DecodeOutcome::NotFound
            }
        }
    }
}
