#![allow(clippy::items_after_test_module)]

use crate::pipeline::ScanReport;
use serde::Serialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Default dataset root from environment variables.
pub fn dataset_root_from_env() -> PathBuf {
    env::var("BARCODE_DATASET_ROOT")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("benches/images/retail"))
}

/// Default bench limit from environment variables.
///
/// Returns `None` (full dataset) when `BARCODE_BENCH_LIMIT` is unset or `0`.
pub fn bench_limit_from_env() -> Option<usize> {
    match env::var("BARCODE_BENCH_LIMIT") {
        Ok(value) => value
            .trim()
            .parse::<usize>()
            .ok()
            .and_then(|v| if v == 0 { None } else { Some(v) }),
        Err(_) => None,
    }
}

/// Smoke test flag from environment variables.
pub fn smoke_from_env() -> bool {
    matches!(
        env::var("BARCODE_SMOKE").as_deref(),
        Ok("1") | Ok("true") | Ok("TRUE") | Ok("yes") | Ok("YES")
    )
}

/// Expected code of a labelled dataset image
///
/// Images are named after the code they carry: the leading digit run of the
/// file stem (`5901234123457_shelf-03.jpg` expects `5901234123457`). Stems
/// that do not start with at least six digits are unlabelled.
pub fn expected_code_from_path<P: AsRef<Path>>(path: P) -> Option<String> {
    let stem = path.as_ref().file_stem()?.to_str()?;
    let digits: String = stem.chars().take_while(|c| c.is_ascii_digit()).collect();
    (digits.len() >= 6).then_some(digits)
}

/// Outcome of one labelled image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// The expected code was returned
    Correct,
    /// A different valid code was returned
    Wrong,
    /// Nothing was returned
    Missed,
    /// No expected code; anything returned is counted as read
    Unlabelled,
}

/// Compare a scan against the expected code
pub fn judge(expected: Option<&str>, report: &ScanReport) -> Verdict {
    match (expected, report.barcode()) {
        (None, _) => Verdict::Unlabelled,
        (Some(_), None) => Verdict::Missed,
        (Some(want), Some(got)) if codes_match(want, got.digits()) => Verdict::Correct,
        (Some(_), Some(_)) => Verdict::Wrong,
    }
}

/// UPC-A and its zero-prefixed EAN-13 form are the same product code
fn codes_match(expected: &str, actual: &str) -> bool {
    expected == actual
        || expected.strip_prefix('0') == Some(actual)
        || actual.strip_prefix('0') == Some(expected)
}

/// Running reading-rate totals
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReadingRate {
    /// Images scanned
    pub images: usize,
    /// Expected code returned
    pub correct: usize,
    /// Other code returned
    pub wrong: usize,
    /// Nothing returned for a labelled image
    pub missed: usize,
    /// Unlabelled images with a read
    pub unlabelled_read: usize,
    /// Images that failed to load or decode
    pub errors: usize,
}

impl ReadingRate {
    /// Add one judged image
    pub fn record(&mut self, verdict: Verdict, decoded: bool) {
        self.images += 1;
        match verdict {
            Verdict::Correct => self.correct += 1,
            Verdict::Wrong => self.wrong += 1,
            Verdict::Missed => self.missed += 1,
            Verdict::Unlabelled if decoded => self.unlabelled_read += 1,
            Verdict::Unlabelled => {}
        }
    }

    /// Add one image that could not be scanned
    pub fn record_error(&mut self) {
        self.images += 1;
        self.errors += 1;
    }

    /// Correct reads over labelled images, in percent
    pub fn rate(&self) -> f64 {
        let labelled = self.correct + self.wrong + self.missed;
        if labelled == 0 {
            0.0
        } else {
            self.correct as f64 * 100.0 / labelled as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::{SystemTime, UNIX_EPOCH};

    static TEMP_DIR_COUNTER: AtomicU64 = AtomicU64::new(0);

    fn temp_dir() -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock before UNIX epoch")
            .as_nanos();
        let sequence = TEMP_DIR_COUNTER.fetch_add(1, Ordering::Relaxed);
        let dir = env::temp_dir().join(format!("barcode_dataset_{nanos}_{sequence}"));
        fs::create_dir_all(dir.join("nested")).expect("failed to create temp dataset");
        dir
    }

    #[test]
    fn expected_code_from_stem() {
        assert_eq!(
            expected_code_from_path("shots/5901234123457_shelf-03.jpg").as_deref(),
            Some("5901234123457")
        );
        assert_eq!(expected_code_from_path("a/96385074.png").as_deref(), Some("96385074"));
        assert_eq!(expected_code_from_path("IMG_0001.jpg"), None);
        assert_eq!(expected_code_from_path("12345.jpg"), None);
    }

    #[test]
    fn upc_and_ean_forms_match() {
        assert!(codes_match("036000291452", "0036000291452"));
        assert!(codes_match("0036000291452", "036000291452"));
        assert!(!codes_match("036000291452", "5901234123457"));
    }

    #[test]
    fn reading_rate_counts_labelled_only() {
        let mut rate = ReadingRate::default();
        rate.record(Verdict::Correct, true);
        rate.record(Verdict::Missed, false);
        rate.record(Verdict::Unlabelled, true);
        rate.record_error();
        assert_eq!(rate.images, 4);
        assert_eq!(rate.unlabelled_read, 1);
        assert!((rate.rate() - 50.0).abs() < 1e-9);
        assert_eq!(ReadingRate::default().rate(), 0.0);
    }

    #[test]
    fn dataset_iter_walks_nested_dirs_and_honours_smoke_list() {
        let root = temp_dir();
        for name in ["b.png", "a.JPG", "notes.txt", "nested/c.webp"] {
            fs::write(root.join(name), b"x").expect("failed to write temp image");
        }

        let all: Vec<PathBuf> = dataset_iter(&root, None, false).collect();
        assert_eq!(all.len(), 3);
        assert!(all.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(dataset_iter(&root, Some(1), false).count(), 1);

        fs::write(root.join("_smoke.txt"), "# smoke\nb.png\nmissing.png\n")
            .expect("failed to write smoke list");
        let smoke: Vec<PathBuf> = dataset_iter(&root, None, true).collect();
        assert_eq!(smoke, vec![root.join("b.png")]);

        let _ = fs::remove_dir_all(root);
    }
}

/// Iterate dataset image paths with optional smoke list and limit.
pub fn dataset_iter<P: AsRef<Path>>(
    root: P,
    limit: Option<usize>,
    smoke: bool,
) -> impl Iterator<Item = PathBuf> {
    let root = root.as_ref();
    let mut images = if smoke {
        load_smoke_list(root).unwrap_or_else(|| collect_images(root))
    } else {
        collect_images(root)
    };

    images.sort();
    if let Some(limit) = limit {
        images.truncate(limit);
    }
    images.into_iter()
}

fn load_smoke_list(root: &Path) -> Option<Vec<PathBuf>> {
    let smoke_path = root.join("_smoke.txt");
    let contents = fs::read_to_string(&smoke_path).ok()?;
    let mut paths = Vec::new();
    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let candidate = Path::new(line);
        let path = if candidate.is_absolute() {
            candidate.to_path_buf()
        } else {
            root.join(candidate)
        };
        if path.exists() {
            paths.push(path);
        }
    }
    if paths.is_empty() { None } else { Some(paths) }
}

fn collect_images(root: &Path) -> Vec<PathBuf> {
    let mut stack = vec![root.to_path_buf()];
    let mut images = Vec::new();

    while let Some(dir) = stack.pop() {
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(_) => continue,
        };

        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
                continue;
            }
            if let Some(ext) = path.extension() {
                let ext = ext.to_string_lossy().to_lowercase();
                if matches!(ext.as_str(), "png" | "jpg" | "jpeg" | "webp" | "bmp") {
                    images.push(path);
                }
            }
        }
    }

    images
}
