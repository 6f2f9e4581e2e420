//! Pipeline tunables
//!
//! `PipelineConfig::default()` is the production setting. `from_env()`
//! overlays `BARCODE_*` variables for experiments without recompiling.

use crate::error::ConfigError;
use crate::utils::transform::Rotation;
use std::time::Duration;

fn parse_env_u64(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(default)
}

fn parse_env_usize(name: &str, default: usize) -> usize {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(default)
}

fn parse_env_f32(name: &str, default: f32) -> f32 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<f32>().ok())
        .unwrap_or(default)
}

/// Comma separated list; an unparsable entry discards the whole variable
fn parse_env_list<T: std::str::FromStr>(name: &str, default: Vec<T>) -> Vec<T> {
    std::env::var(name)
        .ok()
        .and_then(|v| {
            v.split(',')
                .map(|item| item.trim().parse::<T>().ok())
                .collect::<Option<Vec<T>>>()
        })
        .unwrap_or(default)
}

/// When the whole-image variants are attempted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FullImageFallback {
    /// After the ROI variants, as a safety net
    #[default]
    Always,
    /// Only when the detector produced no usable candidate
    OnlyWithoutCandidates,
}

impl FullImageFallback {
    fn from_env_value(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "always" => Some(FullImageFallback::Always),
            "only-without-candidates" | "without-candidates" => {
                Some(FullImageFallback::OnlyWithoutCandidates)
            }
            _ => None,
        }
    }
}

/// Every knob of one pipeline run
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Resample factors applied to each ROI crop
    pub roi_scale_factors: Vec<f32>,
    /// Padding added around each detector box, as a fraction of its size
    pub roi_padding: f32,
    /// Candidates with a shorter side are skipped
    pub min_roi_side: usize,
    /// Upscaled ROIs are clamped to this long side
    pub roi_max_dimension: usize,
    /// Long-side targets for the whole-image fallback
    pub full_image_scales: Vec<usize>,
    /// Orientations tried for every base raster
    pub rotations: Vec<Rotation>,
    /// Fraction of the image kept by the centre-band crops
    pub band_ratio: f32,
    /// Stretch factor of the high-contrast derivative
    pub contrast_factor: f32,
    /// Whole-image fallback policy
    pub full_image_fallback: FullImageFallback,
    /// Hard ceiling on decode attempts
    pub max_attempts: usize,
    /// Hard ceiling on wall-clock time for one scan
    pub time_budget: Duration,
    /// Bound on the detector call
    pub detector_timeout: Duration,
    /// Attempts evaluated concurrently (1 = sequential)
    pub parallelism: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            roi_scale_factors: vec![1.0, 1.5, 2.0],
            roi_padding: 0.10,
            min_roi_side: 5,
            roi_max_dimension: 2000,
            full_image_scales: vec![600, 1000, 1400, 2000],
            rotations: Rotation::ALL.to_vec(),
            band_ratio: 0.55,
            contrast_factor: 1.8,
            full_image_fallback: FullImageFallback::Always,
            max_attempts: 240,
            time_budget: Duration::from_secs(10),
            detector_timeout: Duration::from_secs(3),
            parallelism: 1,
        }
    }
}

impl PipelineConfig {
    /// Defaults overlaid with `BARCODE_*` environment variables
    pub fn from_env() -> Self {
        let d = Self::default();
        let fallback = std::env::var("BARCODE_FALLBACK")
            .ok()
            .and_then(|v| FullImageFallback::from_env_value(&v))
            .unwrap_or(d.full_image_fallback);
        Self {
            roi_scale_factors: parse_env_list("BARCODE_ROI_FACTORS", d.roi_scale_factors),
            full_image_scales: parse_env_list("BARCODE_FULL_SCALES", d.full_image_scales),
            band_ratio: parse_env_f32("BARCODE_BAND_RATIO", d.band_ratio),
            contrast_factor: parse_env_f32("BARCODE_CONTRAST", d.contrast_factor),
            full_image_fallback: fallback,
            max_attempts: parse_env_usize("BARCODE_MAX_ATTEMPTS", d.max_attempts),
            time_budget: Duration::from_millis(parse_env_u64(
                "BARCODE_TIME_BUDGET_MS",
                d.time_budget.as_millis() as u64,
            )),
            detector_timeout: Duration::from_millis(parse_env_u64(
                "BARCODE_DETECT_TIMEOUT_MS",
                d.detector_timeout.as_millis() as u64,
            )),
            parallelism: parse_env_usize("BARCODE_PARALLELISM", d.parallelism).clamp(1, 64),
            ..d
        }
    }

    /// Reject settings no run could use
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.roi_scale_factors.is_empty() {
            return Err(ConfigError::Empty("roi_scale_factors"));
        }
        if let Some(f) = self
            .roi_scale_factors
            .iter()
            .find(|f| !f.is_finite() || **f <= 0.0)
        {
            return Err(ConfigError::OutOfRange {
                name: "roi_scale_factors",
                message: format!("factor {f} must be positive"),
            });
        }
        if self.full_image_scales.is_empty() {
            return Err(ConfigError::Empty("full_image_scales"));
        }
        if self.full_image_scales.contains(&0) {
            return Err(ConfigError::OutOfRange {
                name: "full_image_scales",
                message: "scales must be positive".to_string(),
            });
        }
        if self.rotations.is_empty() {
            return Err(ConfigError::Empty("rotations"));
        }
        if !(self.band_ratio > 0.0 && self.band_ratio <= 1.0) {
            return Err(ConfigError::OutOfRange {
                name: "band_ratio",
                message: format!("{} is outside (0, 1]", self.band_ratio),
            });
        }
        if !self.contrast_factor.is_finite() || self.contrast_factor <= 0.0 {
            return Err(ConfigError::OutOfRange {
                name: "contrast_factor",
                message: format!("{} must be positive", self.contrast_factor),
            });
        }
        if !self.roi_padding.is_finite() || !(0.0..=1.0).contains(&self.roi_padding) {
            return Err(ConfigError::OutOfRange {
                name: "roi_padding",
                message: format!("{} is outside [0, 1]", self.roi_padding),
            });
        }
        if self.roi_max_dimension == 0 {
            return Err(ConfigError::OutOfRange {
                name: "roi_max_dimension",
                message: "must be positive".to_string(),
            });
        }
        if self.max_attempts == 0 {
            return Err(ConfigError::OutOfRange {
                name: "max_attempts",
                message: "at least one attempt is required".to_string(),
            });
        }
        if self.time_budget.is_zero() {
            return Err(ConfigError::OutOfRange {
                name: "time_budget",
                message: "must be positive".to_string(),
            });
        }
        if self.parallelism == 0 {
            return Err(ConfigError::OutOfRange {
                name: "parallelism",
                message: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// Where the ROI detector lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectorConfig {
    /// POST endpoint
    pub endpoint: String,
    /// Bearer token, if the service needs one
    pub token: Option<String>,
    /// Client-side request timeout
    pub timeout: Duration,
}

impl DetectorConfig {
    /// Read `BARCODE_DETECTOR_URL` / `BARCODE_DETECTOR_TOKEN`; `None` when no
    /// endpoint is configured
    pub fn from_env(timeout: Duration) -> Option<Self> {
        let endpoint = std::env::var("BARCODE_DETECTOR_URL")
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())?;
        let token = std::env::var("BARCODE_DETECTOR_TOKEN")
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());
        Some(Self {
            endpoint,
            token,
            timeout,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.roi_scale_factors, vec![1.0, 1.5, 2.0]);
        assert_eq!(config.full_image_scales, vec![600, 1000, 1400, 2000]);
        assert_eq!(config.full_image_fallback, FullImageFallback::Always);
        // a detector overrun still leaves most of the budget for decoding
        assert_eq!(config.detector_timeout, Duration::from_secs(3));
        assert!(config.detector_timeout * 2 < config.time_budget);
    }

    #[test]
    fn test_validate_rejects_impossible_values() {
        let config = PipelineConfig {
            band_ratio: 0.0,
            ..PipelineConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::OutOfRange { name: "band_ratio", .. })
        ));

        let config = PipelineConfig {
            full_image_scales: Vec::new(),
            ..PipelineConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::Empty("full_image_scales")));

        let config = PipelineConfig {
            roi_scale_factors: vec![1.0, -2.0],
            ..PipelineConfig::default()
        };
        assert!(config.validate().is_err());

        let config = PipelineConfig {
            max_attempts: 0,
            ..PipelineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_fallback_names() {
        assert_eq!(
            FullImageFallback::from_env_value(" Always "),
            Some(FullImageFallback::Always)
        );
        assert_eq!(
            FullImageFallback::from_env_value("only-without-candidates"),
            Some(FullImageFallback::OnlyWithoutCandidates)
        );
        assert_eq!(FullImageFallback::from_env_value("sometimes"), None);
    }

    #[test]
    fn test_list_parsing_defaults_when_unset() {
        assert_eq!(
            parse_env_list::<usize>("BARCODE_TEST_UNSET_LIST", vec![1, 2]),
            vec![1, 2]
        );
    }
}
