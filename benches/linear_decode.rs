use barcode_cascade::decoder::{DecodeCascade, DecodeEngine, LinearScanEngine};
use barcode_cascade::synth::{SynthOptions, place_on_canvas, render};
use barcode_cascade::{CancelToken, Orchestrator, PipelineConfig, RasterImage, Symbology};
use criterion::{Criterion, black_box, criterion_group, criterion_main};

fn canvas(symbology: Symbology, text: &str) -> RasterImage {
    let symbol = render(symbology, text, &SynthOptions::default()).unwrap();
    place_on_canvas(&symbol, 800, 600, 200, 260).unwrap()
}

fn bench_linear_ean13(c: &mut Criterion) {
    let engine = LinearScanEngine::default();
    let image = canvas(Symbology::Ean13, "5901234123457");
    c.bench_function("linear_ean13_800x600", |b| {
        b.iter(|| engine.decode(black_box(&image)))
    });
}

fn bench_linear_code128(c: &mut Criterion) {
    let engine = LinearScanEngine::default();
    let image = canvas(Symbology::Code128, "00012345600012");
    c.bench_function("linear_code128_800x600", |b| {
        b.iter(|| engine.decode(black_box(&image)))
    });
}

fn bench_linear_miss(c: &mut Criterion) {
    let engine = LinearScanEngine::default();
    let image = RasterImage::filled(800, 600, 3, 240).unwrap();
    c.bench_function("linear_blank_800x600", |b| {
        b.iter(|| engine.decode(black_box(&image)))
    });
}

fn bench_pipeline_full_image(c: &mut Criterion) {
    let orchestrator = Orchestrator::new(PipelineConfig::default())
        .unwrap()
        .with_cascade(DecodeCascade::new(vec![Box::new(LinearScanEngine::default())]));
    let image = canvas(Symbology::Ean8, "96385074");
    c.bench_function("pipeline_linear_only_800x600", |b| {
        b.iter(|| orchestrator.scan_raster(black_box(&image), &CancelToken::new()))
    });
}

criterion_group!(
    benches,
    bench_linear_ean13,
    bench_linear_code128,
    bench_linear_miss,
    bench_pipeline_full_image
);
criterion_main!(benches);
