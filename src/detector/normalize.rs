//! Canonicalize detector responses
//!
//! Different model vendors wrap their detections differently. Everything
//! vendor-specific about the response lives here; the rest of the crate only
//! sees [`DetectionCandidate`]s in source-pixel coordinates.

use crate::models::{BoundingBox, DetectionCandidate};
use serde_json::{Map, Value};

const LIST_KEYS: [&str; 7] = [
    "detections",
    "predictions",
    "results",
    "objects",
    "boxes",
    "outputs",
    "data",
];
const BOX_KEYS: [&str; 6] = ["box", "bounding_box", "boundingBox", "bbox", "location", "rect"];
const SCORE_KEYS: [&str; 4] = ["score", "confidence", "conf", "probability"];
const LABEL_KEYS: [&str; 4] = ["label", "class", "class_name", "name"];

/// Boxes with a side at or below this many pixels are noise
const MIN_SIDE: usize = 2;

const DEFAULT_LABEL: &str = "barcode";

/// Translate a detector response into candidates sorted by descending score
///
/// `width`/`height` are the dimensions of the image sent to the detector and
/// are used to scale relative coordinates.
pub fn normalize_detections(value: &Value, width: usize, height: usize) -> Vec<DetectionCandidate> {
    let mut candidates: Vec<DetectionCandidate> = detection_items(value)
        .into_iter()
        .filter_map(|item| parse_candidate(item, width, height))
        .collect();
    // stable: equal scores keep response order
    candidates.sort_by(|a, b| b.score.total_cmp(&a.score));
    candidates
}

fn detection_items(value: &Value) -> Vec<&Value> {
    match value {
        Value::Array(items) => items.iter().collect(),
        Value::Object(obj) => {
            for key in LIST_KEYS {
                match obj.get(key) {
                    Some(Value::Array(items)) => return items.iter().collect(),
                    Some(nested @ Value::Object(_)) => {
                        let items = detection_items(nested);
                        if !items.is_empty() {
                            return items;
                        }
                    }
                    _ => {}
                }
            }
            if raw_box(obj).is_some() {
                vec![value]
            } else {
                Vec::new()
            }
        }
        _ => Vec::new(),
    }
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn first_number(obj: &Map<String, Value>, keys: &[&str]) -> Option<f64> {
    keys.iter().find_map(|k| obj.get(*k).and_then(number))
}

/// Corner form of a box before scaling and clamping
#[derive(Debug, Clone, Copy, PartialEq)]
struct RawBox {
    xmin: f64,
    ymin: f64,
    xmax: f64,
    ymax: f64,
}

fn rect_from_object(obj: &Map<String, Value>) -> Option<RawBox> {
    let corners = |a: &str, b: &str, c: &str, d: &str| -> Option<RawBox> {
        Some(RawBox {
            xmin: obj.get(a).and_then(number)?,
            ymin: obj.get(b).and_then(number)?,
            xmax: obj.get(c).and_then(number)?,
            ymax: obj.get(d).and_then(number)?,
        })
    };
    let sized = |w: &str, h: &str| -> Option<RawBox> {
        let x = obj.get("x").and_then(number)?;
        let y = obj.get("y").and_then(number)?;
        let w = obj.get(w).and_then(number)?;
        let h = obj.get(h).and_then(number)?;
        Some(RawBox {
            xmin: x,
            ymin: y,
            xmax: x + w,
            ymax: y + h,
        })
    };
    corners("xmin", "ymin", "xmax", "ymax")
        .or_else(|| corners("x1", "y1", "x2", "y2"))
        .or_else(|| corners("left", "top", "right", "bottom"))
        .or_else(|| sized("width", "height"))
        .or_else(|| sized("w", "h"))
}

fn rect_from_array(items: &[Value], xywh: bool) -> Option<RawBox> {
    let [a, b, c, d] = items else {
        return None;
    };
    let (a, b, c, d) = (number(a)?, number(b)?, number(c)?, number(d)?);
    Some(if xywh {
        RawBox {
            xmin: a,
            ymin: b,
            xmax: a + c,
            ymax: b + d,
        }
    } else {
        RawBox {
            xmin: a,
            ymin: b,
            xmax: c,
            ymax: d,
        }
    })
}

fn raw_box(obj: &Map<String, Value>) -> Option<RawBox> {
    for key in BOX_KEYS {
        match obj.get(key) {
            // COCO style `bbox: [x, y, w, h]`; other keys carry corners
            Some(Value::Array(items)) => return rect_from_array(items, key == "bbox"),
            Some(Value::Object(inner)) => return rect_from_object(inner),
            _ => {}
        }
    }
    rect_from_object(obj)
}

fn to_pixels(raw: RawBox, width: usize, height: usize) -> RawBox {
    let values = [raw.xmin, raw.ymin, raw.xmax, raw.ymax];
    let relative = values.iter().all(|v| (0.0..=1.0).contains(v))
        && values.iter().any(|v| v.fract() != 0.0);
    if !relative {
        return raw;
    }
    let (w, h) = (width as f64, height as f64);
    RawBox {
        xmin: raw.xmin * w,
        ymin: raw.ymin * h,
        xmax: raw.xmax * w,
        ymax: raw.ymax * h,
    }
}

fn label(obj: &Map<String, Value>) -> String {
    LABEL_KEYS
        .iter()
        .find_map(|k| match obj.get(*k) {
            Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        })
        .unwrap_or_else(|| DEFAULT_LABEL.to_string())
}

fn parse_candidate(item: &Value, width: usize, height: usize) -> Option<DetectionCandidate> {
    let (raw, obj) = match item {
        Value::Object(obj) => (raw_box(obj)?, Some(obj)),
        Value::Array(items) => (rect_from_array(items, false)?, None),
        _ => return None,
    };
    let px = to_pixels(raw, width, height);
    let bbox = BoundingBox::from_corners(px.xmin, px.ymin, px.xmax, px.ymax)?
        .clamp_to(width, height)?;
    if bbox.width <= MIN_SIDE || bbox.height <= MIN_SIDE {
        return None;
    }
    let score = obj
        .and_then(|o| first_number(o, &SCORE_KEYS))
        .unwrap_or(1.0) as f32;
    let label = obj.map(label).unwrap_or_else(|| DEFAULT_LABEL.to_string());
    Some(DetectionCandidate::new(bbox, label, score))
}
