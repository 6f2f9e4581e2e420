//! Native scanline decoder for 1D retail symbologies
//!
//! Sample a handful of rows (centre first), binarize each one two ways and
//! run the symbology readers over the resulting bar/space widths in both
//! directions. The first reader that produces a complete symbol wins.

pub(crate) mod code128;
pub(crate) mod code39;
pub(crate) mod ean;
pub(crate) mod itf;

use super::engine::DecodeEngine;
use crate::models::{DecodeOutcome, RasterImage};
use crate::utils::binarization::{Runs, averaged_row, binarize_row_adaptive, binarize_row_otsu};
use tracing::trace;

pub use code128::decode_code128;
pub use code39::decode_code39;
pub use ean::{decode_ean8, decode_ean13};
pub use itf::decode_itf;

/// ZXing-style tolerances, in modules, for matching measured runs to a pattern
pub(crate) const MAX_AVG_VARIANCE: f32 = 0.48;
pub(crate) const MAX_INDIVIDUAL_VARIANCE: f32 = 0.7;

/// Mean per-module deviation of `widths` from `pattern`, after scaling the
/// widths so they span the pattern's module count
///
/// Returns `f32::INFINITY` when any single element is off by more than
/// `max_individual` modules or the runs are narrower than one sample per module.
pub(crate) fn pattern_variance(widths: &[usize], pattern: &[u8], max_individual: f32) -> f32 {
    debug_assert_eq!(widths.len(), pattern.len());
    let total: usize = widths.iter().sum();
    let modules: usize = pattern.iter().map(|&p| p as usize).sum();
    if total < modules || modules == 0 {
        return f32::INFINITY;
    }
    let unit = total as f32 / modules as f32;
    let mut variance = 0.0;
    for (&w, &p) in widths.iter().zip(pattern) {
        let d = (w as f32 / unit - p as f32).abs();
        if d > max_individual {
            return f32::INFINITY;
        }
        variance += d;
    }
    variance / modules as f32
}

/// True when the light run before `start` is at least `min_width` samples
/// wide, or the symbol starts at the row edge
pub(crate) fn has_quiet_zone(runs: &Runs, start: usize, min_width: f32) -> bool {
    start == 0 || runs.widths[start - 1] as f32 >= min_width
}

/// Tunables for [`LinearScanEngine`]
#[derive(Debug, Clone)]
pub struct LinearOptions {
    /// Number of rows sampled per raster
    pub scan_lines: usize,
    /// Rows averaged into each scanline
    pub row_band: usize,
    /// Minimum luma range for the adaptive binarizer to see anything
    pub min_contrast: u8,
    /// Rasters narrower than this are skipped
    pub min_width: usize,
}

impl Default for LinearOptions {
    fn default() -> Self {
        Self {
            scan_lines: 15,
            row_band: 3,
            min_contrast: 24,
            min_width: 30,
        }
    }
}

/// Decoder A of the cascade
#[derive(Debug, Clone, Default)]
pub struct LinearScanEngine {
    options: LinearOptions,
}

impl LinearScanEngine {
    /// Engine with explicit options
    pub fn new(options: LinearOptions) -> Self {
        Self { options }
    }

    /// Scan a luma buffer
    pub fn decode_luma(&self, gray: &[u8], width: usize, height: usize) -> DecodeOutcome {
        if width < self.options.min_width || height == 0 || gray.len() < width * height {
            return DecodeOutcome::NotFound;
        }
        let window = (width / 10).max(15);
        for y in scan_rows(height, self.options.scan_lines) {
            let row = averaged_row(gray, width, height, y, self.options.row_band);
            let adaptive = binarize_row_adaptive(&row, window, self.options.min_contrast);
            let otsu = binarize_row_otsu(&row);
            for bits in [adaptive, otsu] {
                let runs = Runs::from_bits(&bits);
                if runs.len() < 20 {
                    continue;
                }
                if let Some(found) = decode_runs(&runs).or_else(|| decode_runs(&runs.reversed())) {
                    trace!(row = y, ?found, "linear scan hit");
                    return found;
                }
            }
        }
        DecodeOutcome::NotFound
    }
}

impl DecodeEngine for LinearScanEngine {
    fn name(&self) -> &'static str {
        "linear"
    }

    fn decode(&self, image: &RasterImage) -> DecodeOutcome {
        let gray = image.to_luma();
        self.decode_luma(&gray, image.width(), image.height())
    }
}

/// Try every reader on one run sequence
pub fn decode_runs(runs: &Runs) -> Option<DecodeOutcome> {
    decode_ean13(runs)
        .or_else(|| decode_ean8(runs))
        .or_else(|| decode_code128(runs))
        .or_else(|| decode_code39(runs))
        .or_else(|| decode_itf(runs))
}

/// Row indices to sample: the centre row, then alternating outwards
fn scan_rows(height: usize, lines: usize) -> Vec<usize> {
    let lines = lines.clamp(1, height);
    let centre = height / 2;
    let step = (height / (lines + 1)).max(1);
    let mut rows = Vec::with_capacity(lines);
    rows.push(centre);
    let mut k: usize = 1;
    while rows.len() < lines {
        let offset = k.div_ceil(2) * step;
        let y = if k % 2 == 1 {
            centre.checked_sub(offset)
        } else {
            Some(centre + offset).filter(|&y| y < height)
        };
        if let Some(y) = y {
            rows.push(y);
        } else if offset > height {
            break;
        }
        k += 1;
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_variance() {
        assert_eq!(pattern_variance(&[2, 2, 2], &[1, 1, 1], 0.7), 0.0);
        let v = pattern_variance(&[6, 4, 2, 2], &[3, 2, 1, 1], 0.7);
        assert!(v < 1e-6);
        assert!(pattern_variance(&[9, 1, 1, 1], &[3, 2, 1, 1], 0.7).is_infinite());
        assert!(pattern_variance(&[1, 1], &[3, 2], 0.7).is_infinite());
    }

    #[test]
    fn test_scan_rows_start_at_centre() {
        let rows = scan_rows(100, 5);
        assert_eq!(rows[0], 50);
        assert_eq!(rows.len(), 5);
        assert!(rows.iter().all(|&y| y < 100));

        assert_eq!(scan_rows(1, 15), vec![0]);
        let rows = scan_rows(3, 15);
        assert_eq!(rows.len(), 3);
    }

    #[test]
    fn test_flat_raster_is_not_found() {
        let engine = LinearScanEngine::default();
        let gray = vec![200u8; 120 * 40];
        assert!(engine.decode_luma(&gray, 120, 40).is_not_found());
        assert!(engine.decode_luma(&gray[..10], 10, 1).is_not_found());
    }
}
