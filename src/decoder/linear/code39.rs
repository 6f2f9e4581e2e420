//! Code 39 reader

use super::has_quiet_zone;
use crate::models::{DecodeOutcome, Symbology};
use crate::utils::binarization::Runs;

pub(crate) const ALPHABET: &[u8; 43] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ-. $/+%";

/// Wide-element masks over the nine elements (bit 8 = first bar)
pub(crate) const ENCODINGS: [u16; 43] = [
    0x034, 0x121, 0x061, 0x160, 0x031, 0x130, 0x070, 0x025, 0x124, 0x064, // 0-9
    0x109, 0x049, 0x148, 0x019, 0x118, 0x058, 0x00D, 0x10C, 0x04C, 0x01C, // A-J
    0x103, 0x043, 0x142, 0x013, 0x112, 0x052, 0x007, 0x106, 0x046, 0x016, // K-T
    0x181, 0x0C1, 0x1C0, 0x091, 0x190, 0x0D0, 0x085, 0x184, 0x0C4, 0x0A8, // U-$
    0x0A2, 0x08A, 0x02A, // /-%
];

/// Start/stop character `*`
pub(crate) const ASTERISK: u16 = 0x094;

const MAX_CHARACTERS: usize = 80;

/// Classify nine element widths into a wide/narrow mask with exactly three
/// wide elements
fn element_mask(widths: &[usize]) -> Option<u16> {
    let mut max_narrow = 0usize;
    loop {
        max_narrow = widths.iter().copied().filter(|&w| w > max_narrow).min()?;
        let wide: Vec<usize> = widths.iter().copied().filter(|&w| w > max_narrow).collect();
        match wide.len() {
            3 => {
                let min_wide = wide.iter().copied().min()?;
                if (min_wide as f32) < max_narrow as f32 * 1.5 {
                    return None;
                }
                let mask = widths
                    .iter()
                    .fold(0u16, |acc, &w| (acc << 1) | (w > max_narrow) as u16);
                return Some(mask);
            }
            n if n < 3 => return None,
            _ => {}
        }
    }
}

fn character(mask: u16) -> Option<u8> {
    ENCODINGS
        .iter()
        .position(|&e| e == mask)
        .map(|i| ALPHABET[i])
}

/// Decode a Code 39 symbol delimited by `*` start and stop characters
pub fn decode_code39(runs: &Runs) -> Option<DecodeOutcome> {
    let n = runs.len();
    // start char, gap, one data char, gap, stop char
    for start in (0..n.saturating_sub(9 * 3 + 2)).filter(|&i| runs.is_dark(i)) {
        let first = &runs.widths[start..start + 9];
        if element_mask(first) != Some(ASTERISK) {
            continue;
        }
        let width: usize = first.iter().sum();
        if !has_quiet_zone(runs, start, width as f32 * 0.5) {
            continue;
        }
        if let Some(text) = read_from(runs, start + 10) {
            return Some(DecodeOutcome::decoded(text, Symbology::Code39));
        }
    }
    None
}

fn read_from(runs: &Runs, mut at: usize) -> Option<String> {
    let mut out = String::new();
    while at + 9 <= runs.len() && out.len() <= MAX_CHARACTERS {
        let mask = element_mask(&runs.widths[at..at + 9])?;
        if mask == ASTERISK {
            return (!out.is_empty()).then_some(out);
        }
        out.push(char::from(character(mask)?));
        // skip the inter-character gap
        at += 10;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn push_char(widths: &mut Vec<usize>, mask: u16, narrow: usize, wide: usize) {
        for bit in (0..9).rev() {
            widths.push(if mask & (1 << bit) != 0 { wide } else { narrow });
        }
        widths.push(narrow);
    }

    fn runs_for(text: &str) -> Runs {
        let mut widths = vec![30];
        push_char(&mut widths, ASTERISK, 2, 5);
        for b in text.bytes() {
            let i = ALPHABET.iter().position(|&a| a == b).unwrap();
            push_char(&mut widths, ENCODINGS[i], 2, 5);
        }
        push_char(&mut widths, ASTERISK, 2, 5);
        // the trailing gap becomes the quiet zone
        if let Some(last) = widths.last_mut() {
            *last = 30;
        }
        Runs {
            first_dark: false,
            widths,
        }
    }

    #[test]
    fn test_decode_code39() {
        let runs = runs_for("CODE-39");
        assert_eq!(
            decode_code39(&runs),
            Some(DecodeOutcome::decoded("CODE-39", Symbology::Code39))
        );
    }

    #[test]
    fn test_reversed_row_is_not_misread() {
        // `*` read backwards is `P`, so a mirrored row has no start character
        let runs = runs_for("4711");
        assert_eq!(decode_code39(&runs.reversed()), None);
        assert!(super::super::decode_runs(&runs.reversed().reversed()).is_some());
    }

    #[test]
    fn test_element_mask_requires_three_wide() {
        assert_eq!(element_mask(&[1, 1, 1, 3, 3, 1, 3, 1, 1]), Some(0x034));
        assert_eq!(element_mask(&[1, 1, 1, 1, 1, 1, 1, 1, 1]), None);
        assert_eq!(element_mask(&[3, 1, 3, 1, 3, 1, 3, 1, 1]), None);
    }
}
