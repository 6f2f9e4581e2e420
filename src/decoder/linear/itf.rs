//! Interleaved 2 of 5 reader

use crate::models::{DecodeOutcome, Symbology};
use crate::utils::binarization::Runs;

/// Wide-element masks over five elements (bit 4 = first element)
pub(crate) const DIGITS: [u8; 10] = [
    0b00110, 0b10001, 0b01001, 0b11000, 0b00101, 0b10100, 0b01100, 0b00011, 0b10010, 0b01010,
];

/// Payloads shorter than this are too likely to be noise
const MIN_DIGITS: usize = 6;
const MAX_DIGITS: usize = 32;

fn narrow_wide(widths: [usize; 5]) -> Option<u8> {
    let mut sorted = widths;
    sorted.sort_unstable();
    let (max_narrow, min_wide) = (sorted[2], sorted[3]);
    if (min_wide as f32) < max_narrow as f32 * 1.5 {
        return None;
    }
    let mask = widths
        .iter()
        .fold(0u8, |acc, &w| (acc << 1) | (w >= min_wide) as u8);
    DIGITS.iter().position(|&d| d == mask).map(|d| d as u8)
}

fn is_end(runs: &Runs, at: usize, narrow: f32) -> bool {
    if at + 3 > runs.len() {
        return false;
    }
    let w = &runs.widths[at..at + 3];
    let wide_bar = w[0] as f32 >= narrow * 1.5;
    let narrow_rest = w[1..].iter().all(|&x| (x as f32) < narrow * 1.5);
    let quiet_after = at + 3 == runs.len() || runs.widths[at + 3] as f32 >= narrow * 5.0;
    wide_bar && narrow_rest && quiet_after
}

/// Decode an ITF symbol (start `nnnn`, digit pairs, end `Wnn`)
pub fn decode_itf(runs: &Runs) -> Option<DecodeOutcome> {
    let n = runs.len();
    for start in (0..n.saturating_sub(4 + 10 + 3)).filter(|&i| runs.is_dark(i)) {
        let guard = &runs.widths[start..start + 4];
        let narrow = guard.iter().sum::<usize>() as f32 / 4.0;
        let (lo, hi) = guard
            .iter()
            .fold((usize::MAX, 0), |(lo, hi), &w| (lo.min(w), hi.max(w)));
        if hi as f32 > lo as f32 * 1.5 + 1.0 {
            continue;
        }
        if start > 0 && (runs.widths[start - 1] as f32) < narrow * 5.0 {
            continue;
        }
        if let Some(text) = read_pairs(runs, start + 4, narrow) {
            return Some(DecodeOutcome::decoded(text, Symbology::Itf));
        }
    }
    None
}

fn read_pairs(runs: &Runs, mut at: usize, narrow: f32) -> Option<String> {
    let mut out = String::new();
    loop {
        if out.len() >= MIN_DIGITS && is_end(runs, at, narrow) {
            return Some(out);
        }
        if at + 10 > runs.len() || out.len() >= MAX_DIGITS {
            return None;
        }
        let w = &runs.widths[at..at + 10];
        let bars = [w[0], w[2], w[4], w[6], w[8]];
        let spaces = [w[1], w[3], w[5], w[7], w[9]];
        out.push(char::from(b'0' + narrow_wide(bars)?));
        out.push(char::from(b'0' + narrow_wide(spaces)?));
        at += 10;
    }
}
