//! Lazy generation of the ordered attempt list
//!
//! A plan lists base rasters (ROI crops at each factor, whole-image scales).
//! Each base, then its high-contrast derivative, expands into every rotation
//! followed by the two centre bands. Only one base is alive at a time.

use crate::config::{FullImageFallback, PipelineConfig};
use crate::models::{BoundingBox, DetectionCandidate, RasterImage};
use crate::utils::transform::{
    BandAxis, crop, crop_center_band, rotate, scale_by, scale_long_side_to,
    scale_to_max_dimension, to_high_contrast_grayscale,
};
use tracing::trace;

/// One raster handed to the decode cascade
#[derive(Debug, Clone)]
pub struct TransformVariant {
    /// Pixels to decode
    pub raster: RasterImage,
    /// Transform chain, e.g. `roi-2@x1.5@contrast@rot90`
    pub provenance: String,
    /// Detector candidate this variant was cut from, if any
    pub candidate: Option<usize>,
}

#[derive(Debug, Clone)]
enum PlannedBase {
    Roi {
        candidate: usize,
        bbox: BoundingBox,
        factor: f32,
    },
    Full {
        max_dim: usize,
    },
}

/// Every attempt for one source image, in attempt order
#[derive(Debug)]
pub struct VariantPlan<'a> {
    source: &'a RasterImage,
    config: &'a PipelineConfig,
    bases: Vec<PlannedBase>,
    roi_count: usize,
}

impl<'a> VariantPlan<'a> {
    /// Build the plan; degenerate candidates are dropped here
    pub fn new(
        source: &'a RasterImage,
        candidates: &[DetectionCandidate],
        config: &'a PipelineConfig,
    ) -> Self {
        let mut bases = Vec::new();
        let mut roi_count = 0;
        for (index, candidate) in candidates.iter().enumerate() {
            if candidate.bbox.min_side() < config.min_roi_side {
                trace!(index, bbox = ?candidate.bbox, "degenerate candidate skipped");
                continue;
            }
            let Some(bbox) = candidate
                .bbox
                .padded(config.roi_padding, source.width(), source.height())
            else {
                continue;
            };
            roi_count += 1;
            bases.extend(config.roi_scale_factors.iter().map(|&factor| PlannedBase::Roi {
                candidate: index,
                bbox,
                factor,
            }));
        }

        let include_full = match config.full_image_fallback {
            FullImageFallback::Always => true,
            FullImageFallback::OnlyWithoutCandidates => roi_count == 0,
        };
        if include_full {
            bases.extend(
                config
                    .full_image_scales
                    .iter()
                    .map(|&max_dim| PlannedBase::Full { max_dim }),
            );
        }

        Self {
            source,
            config,
            bases,
            roi_count,
        }
    }

    /// Usable detector candidates
    pub fn roi_count(&self) -> usize {
        self.roi_count
    }

    /// Upper bound on the number of variants (duplicates are skipped lazily)
    pub fn max_len(&self) -> usize {
        self.bases.len() * 2 * (self.config.rotations.len() + 2)
    }

    /// Fresh iterator over the plan
    pub fn iter(&self) -> Variants<'_> {
        Variants {
            plan: self,
            next_base: 0,
            active: None,
            roi_crop: None,
            seen: Vec::new(),
        }
    }
}

#[derive(Debug)]
struct ActiveBase {
    label: String,
    raster: RasterImage,
    candidate: Option<usize>,
    contrast: bool,
    step: usize,
}

/// Iterator over a [`VariantPlan`]
#[derive(Debug)]
pub struct Variants<'p> {
    plan: &'p VariantPlan<'p>,
    next_base: usize,
    active: Option<ActiveBase>,
    roi_crop: Option<(usize, RasterImage)>,
    /// Base dimensions already produced, per source (candidate index or full image)
    seen: Vec<(Option<usize>, usize, usize)>,
}

impl Variants<'_> {
    fn steps(&self) -> usize {
        self.plan.config.rotations.len() + 2
    }

    fn expand(&self, base: &ActiveBase) -> Option<TransformVariant> {
        let rotations = &self.plan.config.rotations;
        let (raster, suffix) = if let Some(rotation) = rotations.get(base.step) {
            (rotate(&base.raster, *rotation), format!("rot{}", rotation.degrees()))
        } else {
            let (axis, name) = if base.step == rotations.len() {
                (BandAxis::Horizontal, "band-h")
            } else {
                (BandAxis::Vertical, "band-v")
            };
            let band = crop_center_band(&base.raster, axis, self.plan.config.band_ratio).ok()?;
            (band, name.to_string())
        };
        Some(TransformVariant {
            raster,
            provenance: format!("{}@{suffix}", base.label),
            candidate: base.candidate,
        })
    }

    fn materialize(&mut self, planned: &PlannedBase) -> Option<ActiveBase> {
        let config = self.plan.config;
        let (raster, label, candidate) = match *planned {
            PlannedBase::Roi {
                candidate,
                bbox,
                factor,
            } => {
                if self.roi_crop.as_ref().is_none_or(|(i, _)| *i != candidate) {
                    self.roi_crop = Some((candidate, crop(self.plan.source, &bbox).ok()?));
                }
                let (_, cropped) = self.roi_crop.as_ref()?;
                let long_side = cropped.max_dimension() as f32 * factor;
                // an upscale past the bound lands on the bound; a crop already
                // over it is only shrunk
                let scaled = if long_side > config.roi_max_dimension as f32 {
                    scale_long_side_to(cropped, config.roi_max_dimension)
                } else {
                    scale_by(cropped, factor)
                }
                .ok()?;
                (scaled, format!("roi-{candidate}@x{factor}"), Some(candidate))
            }
            PlannedBase::Full { max_dim } => (
                scale_to_max_dimension(self.plan.source, max_dim).ok()?,
                format!("full-{max_dim}"),
                None,
            ),
        };

        let key = (candidate, raster.width(), raster.height());
        if self.seen.contains(&key) {
            trace!(%label, "duplicate scale skipped");
            return None;
        }
        self.seen.push(key);
        Some(ActiveBase {
            label,
            raster,
            candidate,
            contrast: false,
            step: 0,
        })
    }
}

impl Iterator for Variants<'_> {
    type Item = TransformVariant;

    fn next(&mut self) -> Option<TransformVariant> {
        loop {
            if let Some(mut base) = self.active.take() {
                if base.step < self.steps() {
                    let variant = self.expand(&base);
                    base.step += 1;
                    self.active = Some(base);
                    match variant {
                        Some(v) => return Some(v),
                        None => continue,
                    }
                }
                if !base.contrast {
                    if let Ok(raster) =
                        to_high_contrast_grayscale(&base.raster, self.plan.config.contrast_factor)
                    {
                        self.active = Some(ActiveBase {
                            label: format!("{}@contrast", base.label),
                            raster,
                            candidate: base.candidate,
                            contrast: true,
                            step: 0,
                        });
                    }
                }
                continue;
            }

            let planned = self.plan.bases.get(self.next_base)?.clone();
            self.next_base += 1;
            self.active = self.materialize(&planned);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(w: usize, h: usize) -> RasterImage {
        RasterImage::filled(w, h, 3, 200).unwrap()
    }

    fn candidate(x: usize, y: usize, w: usize, h: usize) -> DetectionCandidate {
        DetectionCandidate::new(BoundingBox::new(x, y, w, h).unwrap(), "barcode", 0.9)
    }

    #[test]
    fn test_full_image_variant_order() {
        let img = source(800, 400);
        let config = PipelineConfig::default();
        let plan = VariantPlan::new(&img, &[], &config);
        let labels: Vec<String> = plan.iter().take(13).map(|v| v.provenance).collect();
        assert_eq!(
            labels,
            vec![
                "full-600@rot0",
                "full-600@rot90",
                "full-600@rot180",
                "full-600@rot270",
                "full-600@band-h",
                "full-600@band-v",
                "full-600@contrast@rot0",
                "full-600@contrast@rot90",
                "full-600@contrast@rot180",
                "full-600@contrast@rot270",
                "full-600@contrast@band-h",
                "full-600@contrast@band-v",
                "full-1000@rot0",
            ]
        );
    }

    #[test]
    fn test_duplicate_scales_are_skipped() {
        // 500 px is below every scale, so 1000/1400/2000 repeat the 600 raster
        let img = source(500, 200);
        let config = PipelineConfig::default();
        let plan = VariantPlan::new(&img, &[], &config);
        let all: Vec<TransformVariant> = plan.iter().collect();
        assert_eq!(all.len(), 12);
        assert!(all.iter().all(|v| v.provenance.starts_with("full-600")));
        assert!(all.len() <= plan.max_len());
    }

    #[test]
    fn test_roi_variants_come_first_and_carry_candidate() {
        let img = source(1000, 600);
        let config = PipelineConfig::default();
        let cands = [candidate(100, 100, 200, 80), candidate(0, 0, 3, 50)];
        let plan = VariantPlan::new(&img, &cands, &config);
        assert_eq!(plan.roi_count(), 1);

        let variants: Vec<TransformVariant> = plan.iter().collect();
        // three factors, plain + contrast, six variants each
        let roi: Vec<&TransformVariant> = variants.iter().filter(|v| v.candidate.is_some()).collect();
        assert_eq!(roi.len(), 36);
        assert!(variants[..36].iter().all(|v| v.candidate == Some(0)));
        assert_eq!(variants[0].provenance, "roi-0@x1@rot0");
        assert_eq!(variants[12].provenance, "roi-0@x1.5@rot0");
        assert_eq!(variants[19].provenance, "roi-0@x1.5@contrast@rot90");
        assert!(variants[36].provenance.starts_with("full-600"));

        // padded by 10%: 240 x 96
        assert_eq!((variants[0].raster.width(), variants[0].raster.height()), (240, 96));
        assert_eq!(variants[6].raster.channels(), 1);
    }

    #[test]
    fn test_only_without_candidates_policy() {
        let img = source(1000, 600);
        let config = PipelineConfig {
            full_image_fallback: FullImageFallback::OnlyWithoutCandidates,
            ..PipelineConfig::default()
        };
        let cands = [candidate(100, 100, 200, 80)];
        let plan = VariantPlan::new(&img, &cands, &config);
        assert!(plan.iter().all(|v| v.candidate == Some(0)));

        let plan = VariantPlan::new(&img, &[], &config);
        assert!(plan.iter().next().is_some());
    }

    #[test]
    fn test_roi_upscale_is_clamped() {
        let img = source(1000, 600);
        let config = PipelineConfig {
            roi_max_dimension: 300,
            roi_scale_factors: vec![1.0, 2.0, 3.0],
            ..PipelineConfig::default()
        };
        let cands = [candidate(100, 100, 200, 80)];
        let plan = VariantPlan::new(&img, &cands, &config);
        let bases: Vec<TransformVariant> = plan
            .iter()
            .filter(|v| v.candidate.is_some() && v.provenance.ends_with("@rot0"))
            .collect();
        // x1 = 240, x2 clamps to 300, x3 clamps to the same 300 and is dropped
        let labels: Vec<&str> = bases.iter().map(|v| v.provenance.as_str()).collect();
        assert_eq!(
            labels,
            vec![
                "roi-0@x1@rot0",
                "roi-0@x1@contrast@rot0",
                "roi-0@x2@rot0",
                "roi-0@x2@contrast@rot0",
            ]
        );
        assert!(bases.iter().all(|v| v.raster.max_dimension() <= 300));
        let x2 = &bases[2].raster;
        assert_eq!((x2.width(), x2.height()), (300, 120));
    }

    #[test]
    fn test_oversized_roi_crop_is_shrunk_once() {
        let img = source(1000, 600);
        let config = PipelineConfig {
            roi_max_dimension: 200,
            ..PipelineConfig::default()
        };
        // padded crop is 240 x 96: every factor lands on 200 x 80
        let cands = [candidate(100, 100, 200, 80)];
        let plan = VariantPlan::new(&img, &cands, &config);
        let roi: Vec<TransformVariant> = plan.iter().filter(|v| v.candidate.is_some()).collect();
        assert_eq!(roi.len(), 12);
        assert!(roi.iter().all(|v| v.provenance.starts_with("roi-0@x1@")));
        assert_eq!((roi[0].raster.width(), roi[0].raster.height()), (200, 80));
    }

    #[test]
    fn test_plan_is_restartable() {
        let img = source(640, 480);
        let config = PipelineConfig::default();
        let plan = VariantPlan::new(&img, &[], &config);
        let first: Vec<String> = plan.iter().map(|v| v.provenance).collect();
        let second: Vec<String> = plan.iter().map(|v| v.provenance).collect();
        assert_eq!(first, second);
    }
}
