//! Scanline binarization and run-length extraction
//!
//! 1D decoders work on one row of luma at a time. A row is thresholded into
//! dark/light samples (`true` = dark bar) and collapsed into alternating runs.

/// Otsu's optimal threshold over a set of luma samples
///
/// Samples strictly below the returned value are dark.
pub fn otsu_threshold(samples: &[u8]) -> u8 {
    let mut histogram = [0u32; 256];
    for &v in samples {
        histogram[v as usize] += 1;
    }

    let total = samples.len() as f64;
    let total_sum: f64 = histogram
        .iter()
        .enumerate()
        .map(|(i, &c)| i as f64 * c as f64)
        .sum();

    let mut below_pixels = 0f64;
    let mut below_sum = 0f64;
    let mut max_variance = 0.0;
    let mut optimal = 128u8;

    for threshold in 1..=255usize {
        let count = histogram[threshold - 1] as f64;
        below_pixels += count;
        below_sum += count * (threshold - 1) as f64;
        let above_pixels = total - below_pixels;
        if below_pixels == 0.0 || above_pixels == 0.0 {
            continue;
        }

        let below_mean = below_sum / below_pixels;
        let above_mean = (total_sum - below_sum) / above_pixels;
        let variance = (below_pixels / total)
            * (above_pixels / total)
            * (below_mean - above_mean).powi(2);

        if variance > max_variance {
            max_variance = variance;
            optimal = threshold as u8;
        }
    }

    optimal
}

/// Threshold a row with a single Otsu level
pub fn binarize_row_otsu(row: &[u8]) -> Vec<bool> {
    let threshold = otsu_threshold(row);
    row.iter().map(|&v| v < threshold).collect()
}

/// Threshold each sample against the mean of a centred window
///
/// A sample is dark only when it sits `min_contrast / 4` below its local
/// mean. Rows with less than `min_contrast` overall range come back
/// all-light so flat backgrounds do not turn into noise runs.
pub fn binarize_row_adaptive(row: &[u8], window: usize, min_contrast: u8) -> Vec<bool> {
    let n = row.len();
    if n == 0 {
        return Vec::new();
    }
    let (lo, hi) = row
        .iter()
        .fold((u8::MAX, u8::MIN), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    if hi - lo < min_contrast {
        return vec![false; n];
    }

    let mut prefix = Vec::with_capacity(n + 1);
    prefix.push(0u32);
    for &v in row {
        let last = prefix[prefix.len() - 1];
        prefix.push(last + v as u32);
    }

    let bias = (min_contrast / 4) as u32;
    let half = (window.max(3) / 2).max(1);
    (0..n)
        .map(|i| {
            let a = i.saturating_sub(half);
            let b = (i + half + 1).min(n);
            let mean = (prefix[b] - prefix[a]) / (b - a) as u32;
            row[i] as u32 + bias < mean
        })
        .collect()
}

/// Average `band` adjacent rows around `y` into one scanline
///
/// Smooths sensor noise along the bar direction without blurring bar edges.
pub fn averaged_row(gray: &[u8], width: usize, height: usize, y: usize, band: usize) -> Vec<u8> {
    if width == 0 || height == 0 || y >= height {
        return Vec::new();
    }
    let half = band / 2;
    let y0 = y.saturating_sub(half);
    let y1 = (y + half + 1).min(height);
    let rows = (y1 - y0) as u32;

    let mut acc = vec![0u32; width];
    for yy in y0..y1 {
        let line = &gray[yy * width..(yy + 1) * width];
        for (a, &v) in acc.iter_mut().zip(line) {
            *a += v as u32;
        }
    }
    acc.into_iter().map(|s| (s / rows) as u8).collect()
}

/// Alternating run widths of a binarized row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Runs {
    /// Colour of the first run (`true` = dark)
    pub first_dark: bool,
    /// Run widths in samples, left to right
    pub widths: Vec<usize>,
}

impl Runs {
    /// Collapse a binarized row into runs
    pub fn from_bits(bits: &[bool]) -> Self {
        let Some(&first) = bits.first() else {
            return Runs {
                first_dark: false,
                widths: Vec::new(),
            };
        };
        let mut widths = Vec::new();
        let mut current = first;
        let mut len = 0usize;
        for &b in bits {
            if b == current {
                len += 1;
            } else {
                widths.push(len);
                current = b;
                len = 1;
            }
        }
        widths.push(len);
        Runs {
            first_dark: first,
            widths,
        }
    }

    /// Number of runs
    pub fn len(&self) -> usize {
        self.widths.len()
    }

    /// True when the row had no samples
    pub fn is_empty(&self) -> bool {
        self.widths.is_empty()
    }

    /// Whether run `i` is a dark bar
    #[inline]
    pub fn is_dark(&self, i: usize) -> bool {
        (i % 2 == 0) == self.first_dark
    }

    /// The same row read right to left
    pub fn reversed(&self) -> Self {
        let first_dark = match self.widths.len() {
            0 => false,
            n => self.is_dark(n - 1),
        };
        let mut widths = self.widths.clone();
        widths.reverse();
        Runs { first_dark, widths }
    }
}
