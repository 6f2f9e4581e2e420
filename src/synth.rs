//! Synthetic barcode rasters
//!
//! Ideal module sequences rendered as clean RGB images. Used by the test
//! suite, the benches and `barcodetool synth`; nothing in the scan path
//! depends on it.

use crate::decoder::checksum::compute_check_digit;
use crate::decoder::linear::code128::{PATTERNS, START_B, START_C, STOP};
use crate::decoder::linear::code39::{ALPHABET, ASTERISK, ENCODINGS};
use crate::decoder::linear::ean::{FIRST_DIGIT_PARITY, GUARD, L_PATTERNS, MIDDLE};
use crate::decoder::linear::itf::DIGITS;
use crate::error::TransformError;
use crate::models::{RasterImage, Symbology};

/// Wide elements are this many modules in Code 39 and ITF
const WIDE: u8 = 3;

/// Raster layout of a rendered symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SynthOptions {
    /// Pixels per module
    pub module_px: usize,
    /// Raster height in pixels
    pub height: usize,
    /// Light modules on each side
    pub quiet_modules: usize,
}

impl Default for SynthOptions {
    fn default() -> Self {
        Self {
            module_px: 3,
            height: 80,
            quiet_modules: 12,
        }
    }
}

fn push_runs(modules: &mut Vec<bool>, widths: &[u8], first_dark: bool) {
    for (i, &w) in widths.iter().enumerate() {
        let dark = (i % 2 == 0) == first_dark;
        modules.extend(std::iter::repeat_n(dark, w as usize));
    }
}

fn digit_values(digits: &str) -> Option<Vec<usize>> {
    digits
        .bytes()
        .map(|b| b.is_ascii_digit().then_some((b - b'0') as usize))
        .collect()
}

/// Append the check digit when `digits` is one short of `len`
fn with_check_digit(digits: &str, len: usize) -> Option<String> {
    match digits.len() {
        n if n == len => Some(digits.to_string()),
        n if n + 1 == len => {
            let check = compute_check_digit(digits)?;
            Some(format!("{digits}{check}"))
        }
        _ => None,
    }
}

/// EAN-13 modules for 12 or 13 digits (the check digit is computed for 12)
pub fn ean13_modules(digits: &str) -> Option<Vec<bool>> {
    let code = with_check_digit(digits, 13)?;
    let d = digit_values(&code)?;
    let parity = FIRST_DIGIT_PARITY[d[0]];

    let mut m = Vec::with_capacity(95);
    push_runs(&mut m, &GUARD, true);
    for (k, &digit) in d[1..7].iter().enumerate() {
        let mut widths = L_PATTERNS[digit];
        if (parity >> (5 - k)) & 1 == 1 {
            widths.reverse();
        }
        push_runs(&mut m, &widths, false);
    }
    push_runs(&mut m, &MIDDLE, false);
    for &digit in &d[7..13] {
        push_runs(&mut m, &L_PATTERNS[digit], true);
    }
    push_runs(&mut m, &GUARD, true);
    Some(m)
}

/// UPC-A modules for 11 or 12 digits
pub fn upca_modules(digits: &str) -> Option<Vec<bool>> {
    let code = with_check_digit(digits, 12)?;
    ean13_modules(&format!("0{code}"))
}

/// EAN-8 modules for 7 or 8 digits
pub fn ean8_modules(digits: &str) -> Option<Vec<bool>> {
    let code = with_check_digit(digits, 8)?;
    let d = digit_values(&code)?;

    let mut m = Vec::with_capacity(67);
    push_runs(&mut m, &GUARD, true);
    for &digit in &d[..4] {
        push_runs(&mut m, &L_PATTERNS[digit], false);
    }
    push_runs(&mut m, &MIDDLE, false);
    for &digit in &d[4..] {
        push_runs(&mut m, &L_PATTERNS[digit], true);
    }
    push_runs(&mut m, &GUARD, true);
    Some(m)
}

/// Code 128 modules; even-length digit strings use code set C, anything
/// else printable ASCII uses code set B
pub fn code128_modules(text: &str) -> Option<Vec<bool>> {
    if text.is_empty() {
        return None;
    }
    let all_digits = text.bytes().all(|b| b.is_ascii_digit());
    let mut values: Vec<u8> = if all_digits && text.len() % 2 == 0 {
        let mut v = vec![START_C];
        v.extend(
            text.as_bytes()
                .chunks(2)
                .map(|p| (p[0] - b'0') * 10 + (p[1] - b'0')),
        );
        v
    } else {
        let mut v = vec![START_B];
        for b in text.bytes() {
            if !(32..128).contains(&b) {
                return None;
            }
            v.push(b - 32);
        }
        v
    };
    let check = values
        .iter()
        .enumerate()
        .map(|(i, &v)| v as u32 * i.max(1) as u32)
        .sum::<u32>()
        % 103;
    values.push(check as u8);

    let mut m = Vec::with_capacity(values.len() * 11 + 13);
    for v in values {
        push_runs(&mut m, &PATTERNS[v as usize], true);
    }
    push_runs(&mut m, &STOP, true);
    Some(m)
}

fn push_mask(m: &mut Vec<bool>, mask: u16, elements: u32, first_dark: bool) {
    let widths: Vec<u8> = (0..elements)
        .rev()
        .map(|bit| if (mask >> bit) & 1 == 1 { WIDE } else { 1 })
        .collect();
    push_runs(m, &widths, first_dark);
}

/// Code 39 modules for upper-case text, `*` delimiters added
pub fn code39_modules(text: &str) -> Option<Vec<bool>> {
    if text.is_empty() {
        return None;
    }
    let mut masks = vec![ASTERISK];
    for b in text.bytes() {
        let i = ALPHABET.iter().position(|&a| a == b)?;
        masks.push(ENCODINGS[i]);
    }
    masks.push(ASTERISK);

    let mut m = Vec::new();
    for (i, &mask) in masks.iter().enumerate() {
        if i > 0 {
            m.push(false);
        }
        push_mask(&mut m, mask, 9, true);
    }
    Some(m)
}

/// Interleaved 2 of 5 modules for an even number of digits
pub fn itf_modules(digits: &str) -> Option<Vec<bool>> {
    if digits.is_empty() || digits.len() % 2 != 0 {
        return None;
    }
    let d = digit_values(digits)?;

    let mut m = Vec::new();
    push_runs(&mut m, &[1, 1, 1, 1], true);
    for pair in d.chunks(2) {
        let (bars, spaces) = (DIGITS[pair[0]], DIGITS[pair[1]]);
        let widths: Vec<u8> = (0..5)
            .rev()
            .flat_map(|bit| [(bars >> bit) & 1, (spaces >> bit) & 1])
            .map(|wide| if wide == 1 { WIDE } else { 1 })
            .collect();
        push_runs(&mut m, &widths, true);
    }
    push_runs(&mut m, &[WIDE, 1, 1], true);
    Some(m)
}

/// Modules for `text` in `symbology`; UPC-E is not rendered
pub fn modules_for(symbology: Symbology, text: &str) -> Option<Vec<bool>> {
    match symbology {
        Symbology::Ean13 => ean13_modules(text),
        Symbology::UpcA => upca_modules(text),
        Symbology::Ean8 => ean8_modules(text),
        Symbology::Code128 => code128_modules(text),
        Symbology::Code39 => code39_modules(text),
        Symbology::Itf => itf_modules(text),
        Symbology::UpcE => None,
    }
}

/// Draw a module sequence as a black-on-white RGB raster
pub fn render_modules(
    modules: &[bool],
    options: &SynthOptions,
) -> Result<RasterImage, TransformError> {
    let px = options.module_px.max(1);
    let quiet = options.quiet_modules * px;
    let width = modules.len() * px + 2 * quiet;

    let mut row = vec![255u8; width];
    for (i, &dark) in modules.iter().enumerate() {
        if dark {
            let x = quiet + i * px;
            row[x..x + px].fill(0);
        }
    }
    let mut data = Vec::with_capacity(width * options.height * 3);
    for _ in 0..options.height {
        for &v in &row {
            data.extend_from_slice(&[v, v, v]);
        }
    }
    RasterImage::new(width, options.height, 3, data)
}

/// Render `text` in `symbology`; `None` when the text cannot be encoded
pub fn render(symbology: Symbology, text: &str, options: &SynthOptions) -> Option<RasterImage> {
    let modules = modules_for(symbology, text)?;
    render_modules(&modules, options).ok()
}

/// Paste `symbol` onto a light canvas at `(x, y)`
pub fn place_on_canvas(
    symbol: &RasterImage,
    canvas_width: usize,
    canvas_height: usize,
    x: usize,
    y: usize,
) -> Result<RasterImage, TransformError> {
    let c = symbol.channels();
    let mut data = vec![255u8; canvas_width * canvas_height * c];
    for sy in 0..symbol.height() {
        let ty = y + sy;
        if ty >= canvas_height {
            break;
        }
        let visible = symbol.width().min(canvas_width.saturating_sub(x));
        if visible == 0 {
            break;
        }
        let src = &symbol.row(sy)[..visible * c];
        let start = (ty * canvas_width + x) * c;
        data[start..start + visible * c].copy_from_slice(src);
    }
    RasterImage::new(canvas_width, canvas_height, c, data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_counts() {
        assert_eq!(ean13_modules("590123412345").map(|m| m.len()), Some(95));
        assert_eq!(upca_modules("03600029145").map(|m| m.len()), Some(95));
        assert_eq!(ean8_modules("9638507").map(|m| m.len()), Some(67));
        // start + 2 data + check, 11 modules each, 13-module stop
        assert_eq!(code128_modules("1234").map(|m| m.len()), Some(4 * 11 + 13));
        assert!(ean13_modules("59012341234").is_none());
        assert!(itf_modules("123").is_none());
        assert!(code39_modules("lower").is_none());
        assert!(modules_for(Symbology::UpcE, "01234565").is_none());
    }

    #[test]
    fn test_ean13_starts_and_ends_with_guards() {
        let m = ean13_modules("5901234123457").unwrap();
        assert_eq!(&m[..3], &[true, false, true]);
        assert_eq!(&m[45..50], &[false, true, false, true, false]);
        assert_eq!(&m[92..], &[true, false, true]);
    }

    #[test]
    fn test_render_layout() {
        let opts = SynthOptions {
            module_px: 2,
            height: 10,
            quiet_modules: 5,
        };
        let img = render(Symbology::Ean8, "96385074", &opts).unwrap();
        assert_eq!(img.width(), 67 * 2 + 20);
        assert_eq!(img.height(), 10);
        assert_eq!(img.pixel(0, 0), &[255, 255, 255]);
        assert_eq!(img.pixel(10, 5), &[0, 0, 0]);
    }

    #[test]
    fn test_place_on_canvas() {
        let symbol = RasterImage::filled(4, 2, 3, 0).unwrap();
        let canvas = place_on_canvas(&symbol, 10, 6, 8, 5).unwrap();
        assert_eq!(canvas.pixel(8, 5), &[0, 0, 0]);
        assert_eq!(canvas.pixel(9, 5), &[0, 0, 0]);
        assert_eq!(canvas.pixel(7, 5), &[255, 255, 255]);
        assert_eq!(canvas.pixel(8, 4), &[255, 255, 255]);
    }
}
