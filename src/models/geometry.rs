use serde::Serialize;

/// Axis-aligned rectangle in source-image pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct BoundingBox {
    /// Left edge
    pub x: usize,
    /// Top edge
    pub y: usize,
    /// Width in pixels (> 0)
    pub width: usize,
    /// Height in pixels (> 0)
    pub height: usize,
}

impl BoundingBox {
    /// Create a box; `None` when width or height is zero
    pub fn new(x: usize, y: usize, width: usize, height: usize) -> Option<Self> {
        if width == 0 || height == 0 {
            return None;
        }
        Some(Self {
            x,
            y,
            width,
            height,
        })
    }

    /// Build from corner coordinates, clamping negative values to zero
    pub fn from_corners(xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> Option<Self> {
        if !(xmin.is_finite() && ymin.is_finite() && xmax.is_finite() && ymax.is_finite()) {
            return None;
        }
        let x0 = xmin.min(xmax).max(0.0);
        let y0 = ymin.min(ymax).max(0.0);
        let x1 = xmin.max(xmax).max(0.0);
        let y1 = ymin.max(ymax).max(0.0);
        let x = x0.round() as usize;
        let y = y0.round() as usize;
        let right = x1.round() as usize;
        let bottom = y1.round() as usize;
        Self::new(x, y, right.saturating_sub(x), bottom.saturating_sub(y))
    }

    /// Exclusive right edge
    pub fn right(&self) -> usize {
        self.x + self.width
    }

    /// Exclusive bottom edge
    pub fn bottom(&self) -> usize {
        self.y + self.height
    }

    /// Shorter side
    pub fn min_side(&self) -> usize {
        self.width.min(self.height)
    }

    /// Area in pixels
    pub fn area(&self) -> usize {
        self.width * self.height
    }

    /// Intersection with a `width x height` image; `None` when they do not overlap
    pub fn clamp_to(&self, width: usize, height: usize) -> Option<Self> {
        let x = self.x.min(width);
        let y = self.y.min(height);
        let right = self.right().min(width);
        let bottom = self.bottom().min(height);
        Self::new(x, y, right.saturating_sub(x), bottom.saturating_sub(y))
    }

    /// Grow each side by `ratio` of the box size, staying inside the image
    pub fn padded(&self, ratio: f32, width: usize, height: usize) -> Option<Self> {
        let pad_x = (self.width as f32 * ratio.max(0.0)).round() as usize;
        let pad_y = (self.height as f32 * ratio.max(0.0)).round() as usize;
        let grown = Self {
            x: self.x.saturating_sub(pad_x),
            y: self.y.saturating_sub(pad_y),
            width: self.width + pad_x * 2,
            height: self.height + pad_y * 2,
        };
        grown.clamp_to(width, height)
    }
}

/// One region proposed by the ROI detector
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectionCandidate {
    /// Region in source pixels
    #[serde(rename = "box")]
    pub bbox: BoundingBox,
    /// Detector label (e.g. "barcode")
    pub label: String,
    /// Confidence in [0, 1]; informational only
    pub score: f32,
}

impl DetectionCandidate {
    /// Create a candidate, clamping the score into [0, 1]
    pub fn new(bbox: BoundingBox, label: impl Into<String>, score: f32) -> Self {
        let score = if score.is_finite() { score.clamp(0.0, 1.0) } else { 0.0 };
        Self {
            bbox,
            label: label.into(),
            score,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_corners_normalizes_order() {
        let b = BoundingBox::from_corners(30.0, 40.0, 10.0, 5.0).unwrap();
        assert_eq!(b, BoundingBox::new(10, 5, 20, 35).unwrap());
    }

    #[test]
    fn test_from_corners_clamps_negative() {
        let b = BoundingBox::from_corners(-5.0, -2.0, 10.0, 8.0).unwrap();
        assert_eq!((b.x, b.y, b.width, b.height), (0, 0, 10, 8));
        assert!(BoundingBox::from_corners(-5.0, 0.0, -1.0, 4.0).is_none());
        assert!(BoundingBox::from_corners(f64::NAN, 0.0, 1.0, 4.0).is_none());
    }

    #[test]
    fn test_clamp_to_image() {
        let b = BoundingBox::new(90, 90, 50, 50).unwrap();
        assert_eq!(b.clamp_to(100, 120), BoundingBox::new(90, 90, 10, 30));
        assert!(BoundingBox::new(200, 0, 5, 5).unwrap().clamp_to(100, 100).is_none());
    }

    #[test]
    fn test_padded_stays_inside() {
        let b = BoundingBox::new(5, 10, 20, 10).unwrap();
        let p = b.padded(0.5, 30, 40).unwrap();
        assert_eq!(p, BoundingBox::new(0, 5, 30, 20).unwrap());
    }

    #[test]
    fn test_candidate_score_clamped() {
        let b = BoundingBox::new(0, 0, 4, 4).unwrap();
        assert_eq!(DetectionCandidate::new(b, "barcode", 1.7).score, 1.0);
        assert_eq!(DetectionCandidate::new(b, "barcode", f32::NAN).score, 0.0);
    }
}
