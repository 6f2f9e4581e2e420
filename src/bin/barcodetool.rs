use barcode_cascade::decoder::checksum::{
    digits_only, is_valid_ean8, is_valid_ean13, is_valid_gtin14, is_valid_upca, validate_decoded,
};
use barcode_cascade::pipeline::{DetectionStatus, ScanOutcome, VariantPlan};
use barcode_cascade::synth::{SynthOptions, render};
use barcode_cascade::tools::{
    ReadingRate, bench_limit_from_env, dataset_iter, dataset_root_from_env, expected_code_from_path,
    judge, smoke_from_env,
};
use barcode_cascade::{Orchestrator, PipelineConfig, RasterImage, ScanReport, Symbology};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "barcodetool", version, about = "Retail barcode scanning tools")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the full pipeline on one image
    Scan {
        #[arg(long)]
        image: PathBuf,
        /// Print the whole report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Check a digit string against the retail check-digit rules
    Validate { digits: String },
    /// List the transform variants the pipeline would try on an image
    Variants {
        #[arg(long)]
        image: PathBuf,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Render a synthetic barcode to a PNG
    Synth {
        #[arg(long)]
        digits: String,
        #[arg(long)]
        out: PathBuf,
        /// EAN-13, UPC-A, EAN-8, CODE-128, CODE-39 or ITF
        #[arg(long, default_value = "EAN-13")]
        symbology: String,
        /// Pixels per module
        #[arg(long, default_value_t = 3)]
        module: usize,
    },
    /// Compute reading rate on a labelled dataset
    ReadingRate {
        #[arg(long)]
        root: Option<PathBuf>,
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long)]
        smoke: bool,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let ok = match cli.command {
        Command::Scan { image, json } => scan_cmd(&image, json),
        Command::Validate { digits } => validate_cmd(&digits),
        Command::Variants { image, limit } => variants_cmd(&image, limit),
        Command::Synth {
            digits,
            out,
            symbology,
            module,
        } => synth_cmd(&digits, &out, &symbology, module),
        Command::ReadingRate { root, limit, smoke } => reading_rate_cmd(root, limit, smoke),
    };
    if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE }
}

fn orchestrator() -> Option<Orchestrator> {
    match Orchestrator::from_env() {
        Ok(orchestrator) => Some(orchestrator),
        Err(err) => {
            eprintln!("Invalid configuration: {err}");
            None
        }
    }
}

fn scan_cmd(image: &Path, json: bool) -> bool {
    let Some(orchestrator) = orchestrator() else {
        return false;
    };
    let bytes = match std::fs::read(image) {
        Ok(bytes) => bytes,
        Err(err) => {
            eprintln!("Failed to read image {}: {}", image.display(), err);
            return false;
        }
    };
    let report = match orchestrator.scan(&bytes) {
        Ok(report) => report,
        Err(err) => {
            eprintln!("Failed to scan {}: {}", image.display(), err);
            return false;
        }
    };

    if json {
        match serde_json::to_string_pretty(&report) {
            Ok(text) => println!("{text}"),
            Err(err) => {
                eprintln!("Failed to serialize report: {err}");
                return false;
            }
        }
    } else {
        print_report(image, &report);
    }
    report.is_found()
}

fn print_report(image: &Path, report: &ScanReport) {
    println!("Image: {}", image.display());
    match &report.detection {
        DetectionStatus::Detected { count } => println!("Detector: {count} candidates"),
        other => println!("Detector: {other:?}"),
    }
    for (i, candidate) in report.boxes.iter().enumerate() {
        println!(
            "  Box {}: x={} y={} w={} h={} score={:.2} label={}",
            i,
            candidate.bbox.x,
            candidate.bbox.y,
            candidate.bbox.width,
            candidate.bbox.height,
            candidate.score,
            candidate.label
        );
    }
    match &report.outcome {
        ScanOutcome::Found {
            barcode,
            engine,
            provenance,
            attempt_index,
            ..
        } => println!(
            "Found {} {} (engine={}, variant={}, attempt={})",
            barcode.symbology(),
            barcode.digits(),
            engine,
            provenance,
            attempt_index
        ),
        ScanOutcome::NotFound { reason } => println!("Not found ({reason:?})"),
    }
    println!(
        "{} attempts in {:.1} ms",
        report.attempts.len(),
        report.elapsed.as_secs_f64() * 1000.0
    );
}

fn validate_cmd(digits: &str) -> bool {
    let clean = digits_only(digits);
    println!("Input: {digits} (digits: {clean})");
    println!("  EAN-13:  {}", is_valid_ean13(&clean));
    println!("  UPC-A:   {}", is_valid_upca(&clean));
    println!("  EAN-8:   {}", is_valid_ean8(&clean));
    println!("  GTIN-14: {}", is_valid_gtin14(&clean));
    match validate_decoded(digits, None) {
        Some(found) => {
            println!("Best match: {} {}", found.symbology(), found.digits());
            true
        }
        None => {
            println!("No valid retail code");
            false
        }
    }
}

fn load_raster(image: &Path) -> Option<RasterImage> {
    let bytes = match std::fs::read(image) {
        Ok(bytes) => bytes,
        Err(err) => {
            eprintln!("Failed to read image {}: {}", image.display(), err);
            return None;
        }
    };
    match RasterImage::decode(&bytes) {
        Ok(raster) => Some(raster),
        Err(err) => {
            eprintln!("Failed to decode image {}: {}", image.display(), err);
            None
        }
    }
}

fn variants_cmd(image: &Path, limit: Option<usize>) -> bool {
    let Some(raster) = load_raster(image) else {
        return false;
    };
    let config = PipelineConfig::from_env();
    if let Err(err) = config.validate() {
        eprintln!("Invalid configuration: {err}");
        return false;
    }
    println!(
        "Image: {} ({}x{}, {} channels)",
        image.display(),
        raster.width(),
        raster.height(),
        raster.channels()
    );
    let plan = VariantPlan::new(&raster, &[], &config);
    let limit = limit.unwrap_or(config.max_attempts);
    let mut count = 0usize;
    for (i, variant) in plan.iter().take(limit).enumerate() {
        println!(
            "  {:>3}: {:<32} {}x{}",
            i,
            variant.provenance,
            variant.raster.width(),
            variant.raster.height()
        );
        count += 1;
    }
    println!("{count} variants (bound {})", plan.max_len());
    true
}

fn synth_cmd(digits: &str, out: &Path, symbology: &str, module: usize) -> bool {
    let Some(symbology) = Symbology::from_name(symbology) else {
        eprintln!("Unknown symbology: {symbology}");
        return false;
    };
    let options = SynthOptions {
        module_px: module,
        ..SynthOptions::default()
    };
    let Some(raster) = render(symbology, digits, &options) else {
        eprintln!("Cannot encode {digits:?} as {symbology}");
        return false;
    };
    let png = match raster.encode_png() {
        Ok(png) => png,
        Err(err) => {
            eprintln!("Failed to encode PNG: {err}");
            return false;
        }
    };
    if let Err(err) = std::fs::write(out, png) {
        eprintln!("Failed to write {}: {}", out.display(), err);
        return false;
    }
    println!(
        "Wrote {} {} ({}x{}) to {}",
        symbology,
        digits,
        raster.width(),
        raster.height(),
        out.display()
    );
    true
}

fn reading_rate_cmd(root: Option<PathBuf>, limit: Option<usize>, smoke: bool) -> bool {
    let Some(orchestrator) = orchestrator() else {
        return false;
    };
    let root = root.unwrap_or_else(dataset_root_from_env);
    let limit = limit.or_else(bench_limit_from_env);
    let smoke = smoke || smoke_from_env();

    let started = Instant::now();
    let mut rate = ReadingRate::default();
    for path in dataset_iter(&root, limit, smoke) {
        let expected = expected_code_from_path(&path);
        let report = std::fs::read(&path)
            .map_err(|err| err.to_string())
            .and_then(|bytes| orchestrator.scan(&bytes).map_err(|err| err.to_string()));
        match report {
            Ok(report) => {
                let verdict = judge(expected.as_deref(), &report);
                rate.record(verdict, report.is_found());
                println!(
                    "{:?} {} expected={} got={}",
                    verdict,
                    path.display(),
                    expected.as_deref().unwrap_or("-"),
                    report.barcode().map(|b| b.digits()).unwrap_or("-")
                );
            }
            Err(err) => {
                rate.record_error();
                eprintln!("Failed {}: {}", path.display(), err);
            }
        }
    }

    println!("Dataset: {}", root.display());
    println!(
        "Images: {}  correct: {}  wrong: {}  missed: {}  errors: {}",
        rate.images, rate.correct, rate.wrong, rate.missed, rate.errors
    );
    println!(
        "Reading rate: {:.2}% in {:.1} s",
        rate.rate(),
        started.elapsed().as_secs_f64()
    );
    rate.images > 0
}
