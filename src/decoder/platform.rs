//! Platform-native barcode reader: the ZBar `zbarimg` tool when installed

use super::engine::{CallLimit, DecodeEngine};
use super::process::run_bounded;
use crate::models::{DecodeOutcome, RasterImage, Symbology};
use std::path::PathBuf;
use std::process::Command;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::trace;

static SCRATCH_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Unique scratch path under the system temp dir
pub(crate) fn scratch_path(prefix: &str, ext: &str) -> PathBuf {
    let n = SCRATCH_COUNTER.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!("{prefix}-{}-{n}.{ext}", std::process::id()))
}

/// Shells out to `zbarimg`; reports `NotFound` when the tool is missing
#[derive(Debug, Clone)]
pub struct PlatformEngine {
    program: String,
}

impl Default for PlatformEngine {
    fn default() -> Self {
        Self::new("zbarimg")
    }
}

impl PlatformEngine {
    /// Use a specific `zbarimg` binary
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

/// Parse `zbarimg --quiet` output (`EAN-13:4006381333931`, one symbol per line)
///
/// The first line in a supported symbology wins.
pub fn parse_zbar_output(stdout: &str) -> DecodeOutcome {
    stdout
        .lines()
        .filter_map(|line| {
            let (kind, data) = line.trim().split_once(':')?;
            let symbology = Symbology::from_name(kind)?;
            (!data.is_empty()).then(|| DecodeOutcome::decoded(data, symbology))
        })
        .next()
        .unwrap_or(DecodeOutcome::NotFound)
}

impl DecodeEngine for PlatformEngine {
    fn name(&self) -> &'static str {
        "zbar"
    }

    fn decode(&self, image: &RasterImage) -> DecodeOutcome {
        self.decode_within(image, &CallLimit::unbounded())
    }

    fn decode_within(&self, image: &RasterImage, limit: &CallLimit) -> DecodeOutcome {
        let Ok(png) = image.encode_png() else {
            return DecodeOutcome::NotFound;
        };
        let path = scratch_path("barcode-zbar", "png");
        if let Err(err) = std::fs::write(&path, png) {
            trace!(%err, "cannot write scratch image");
            return DecodeOutcome::NotFound;
        }

        let output = run_bounded(
            Command::new(&self.program).arg("--quiet").arg(&path),
            None,
            limit,
        );
        let _ = std::fs::remove_file(&path);

        match output {
            // zbarimg exits 4 when nothing was found
            Some(out) if out.status.success() => {
                parse_zbar_output(&String::from_utf8_lossy(&out.stdout))
            }
            Some(out) => {
                trace!(status = ?out.status.code(), "zbarimg found nothing");
                DecodeOutcome::NotFound
            }
            None => {
                trace!(program = %self.program, "zbarimg unavailable or stopped");
                DecodeOutcome::NotFound
            }
        }
    }
}
