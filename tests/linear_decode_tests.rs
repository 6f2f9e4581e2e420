//! Integration tests for the native scanline decoder
//!
//! Synthetic symbols are rendered at a known module size and read back,
//! including flipped, rotated and upscaled variants.

use barcode_cascade::decoder::{DecodeEngine, LinearScanEngine, RxingEngine};
use barcode_cascade::synth::{SynthOptions, place_on_canvas, render};
use barcode_cascade::utils::transform::{Rotation, rotate, scale_by, to_high_contrast_grayscale};
use barcode_cascade::{DecodeOutcome, RasterImage, Symbology};

fn symbol(symbology: Symbology, text: &str) -> RasterImage {
    render(symbology, text, &SynthOptions::default()).expect("encodable test payload")
}

fn decoded(symbology: Symbology, text: &str) -> DecodeOutcome {
    DecodeOutcome::decoded(text, symbology)
}

#[test]
fn reads_ean13() {
    let engine = LinearScanEngine::default();
    let img = symbol(Symbology::Ean13, "5901234123457");
    assert_eq!(engine.decode(&img), decoded(Symbology::Ean13, "5901234123457"));
}

#[test]
fn reads_zero_prefixed_ean13_as_upca() {
    let engine = LinearScanEngine::default();
    let img = symbol(Symbology::UpcA, "036000291452");
    assert_eq!(engine.decode(&img), decoded(Symbology::UpcA, "036000291452"));
}

#[test]
fn reads_ean8() {
    let engine = LinearScanEngine::default();
    let img = symbol(Symbology::Ean8, "96385074");
    assert_eq!(engine.decode(&img), decoded(Symbology::Ean8, "96385074"));
}

#[test]
fn reads_code128_sets_b_and_c() {
    let engine = LinearScanEngine::default();
    let img = symbol(Symbology::Code128, "Hi-5");
    assert_eq!(engine.decode(&img), decoded(Symbology::Code128, "Hi-5"));

    let img = symbol(Symbology::Code128, "00012345600012");
    assert_eq!(
        engine.decode(&img),
        decoded(Symbology::Code128, "00012345600012")
    );
}

#[test]
fn reads_code39() {
    let engine = LinearScanEngine::default();
    let img = symbol(Symbology::Code39, "CODE-39");
    assert_eq!(engine.decode(&img), decoded(Symbology::Code39, "CODE-39"));
}

#[test]
fn reads_itf14() {
    let engine = LinearScanEngine::default();
    let img = symbol(Symbology::Itf, "00012345600012");
    assert_eq!(engine.decode(&img), decoded(Symbology::Itf, "00012345600012"));
}

#[test]
fn reads_upside_down_symbols() {
    let engine = LinearScanEngine::default();
    for (symbology, text) in [
        (Symbology::Ean13, "5901234123457"),
        (Symbology::Ean8, "96385074"),
        (Symbology::Code128, "Hi-5"),
    ] {
        let img = rotate(&symbol(symbology, text), Rotation::Deg180);
        assert_eq!(engine.decode(&img), decoded(symbology, text), "{symbology}");
    }
}

#[test]
fn vertical_symbol_needs_rotation() {
    let engine = LinearScanEngine::default();
    let upright = symbol(Symbology::Ean13, "5901234123457");
    let sideways = rotate(&upright, Rotation::Deg90);
    assert!(engine.decode(&sideways).is_not_found());

    let restored = rotate(&sideways, Rotation::Deg270);
    assert_eq!(
        engine.decode(&restored),
        decoded(Symbology::Ean13, "5901234123457")
    );
}

#[test]
fn reads_upscaled_and_high_contrast_variants() {
    let engine = LinearScanEngine::default();
    let img = symbol(Symbology::Ean13, "5901234123457");

    let doubled = scale_by(&img, 2.0).unwrap();
    assert_eq!(engine.decode(&doubled), decoded(Symbology::Ean13, "5901234123457"));

    let contrast = to_high_contrast_grayscale(&img, 1.8).unwrap();
    assert_eq!(contrast.channels(), 1);
    assert_eq!(engine.decode(&contrast), decoded(Symbology::Ean13, "5901234123457"));
}

#[test]
fn reads_symbol_on_larger_canvas() {
    let engine = LinearScanEngine::default();
    let img = symbol(Symbology::Ean13, "4006381333931");
    let canvas = place_on_canvas(&img, 640, 360, 140, 150).unwrap();
    assert_eq!(engine.decode(&canvas), decoded(Symbology::Ean13, "4006381333931"));
}

#[test]
fn blank_and_tiny_rasters_are_not_found() {
    let engine = LinearScanEngine::default();
    let blank = RasterImage::filled(400, 120, 3, 255).unwrap();
    assert!(engine.decode(&blank).is_not_found());
    let tiny = RasterImage::filled(8, 8, 1, 0).unwrap();
    assert!(engine.decode(&tiny).is_not_found());
}

#[test]
fn rxing_reads_synthetic_ean13() {
    let engine = RxingEngine::default();
    let img = symbol(Symbology::Ean13, "5901234123457");
    let canvas = place_on_canvas(&img, 480, 160, 60, 40).unwrap();
    match engine.decode(&canvas) {
        DecodeOutcome::Decoded { text, symbology } => {
            assert_eq!(text, "5901234123457");
            assert_eq!(symbology, Some(Symbology::Ean13));
        }
        DecodeOutcome::NotFound => panic!("rxing missed a clean EAN-13"),
    }
}
