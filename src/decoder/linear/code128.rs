//! Code 128 reader (code sets A, B and C)

use super::{MAX_AVG_VARIANCE, MAX_INDIVIDUAL_VARIANCE, has_quiet_zone, pattern_variance};
use crate::models::{DecodeOutcome, Symbology};
use crate::utils::binarization::Runs;

/// Bar/space module widths of symbol values 0..=105 (103..=105 are the start codes)
pub(crate) const PATTERNS: [[u8; 6]; 106] = [
    [2, 1, 2, 2, 2, 2], [2, 2, 2, 1, 2, 2], [2, 2, 2, 2, 2, 1], [1, 2, 1, 2, 2, 3], [1, 2, 1, 3, 2, 2],
    [1, 3, 1, 2, 2, 2], [1, 2, 2, 2, 1, 3], [1, 2, 2, 3, 1, 2], [1, 3, 2, 2, 1, 2], [2, 2, 1, 2, 1, 3],
    [2, 2, 1, 3, 1, 2], [2, 3, 1, 2, 1, 2], [1, 1, 2, 2, 3, 2], [1, 2, 2, 1, 3, 2], [1, 2, 2, 2, 3, 1],
    [1, 1, 3, 2, 2, 2], [1, 2, 3, 1, 2, 2], [1, 2, 3, 2, 2, 1], [2, 2, 3, 2, 1, 1], [2, 2, 1, 1, 3, 2],
    [2, 2, 1, 2, 3, 1], [2, 1, 3, 2, 1, 2], [2, 2, 3, 1, 1, 2], [3, 1, 2, 1, 3, 1], [3, 1, 1, 2, 2, 2],
    [3, 2, 1, 1, 2, 2], [3, 2, 1, 2, 2, 1], [3, 1, 2, 2, 1, 2], [3, 2, 2, 1, 1, 2], [3, 2, 2, 2, 1, 1],
    [2, 1, 2, 1, 2, 3], [2, 1, 2, 3, 2, 1], [2, 3, 2, 1, 2, 1], [1, 1, 1, 3, 2, 3], [1, 3, 1, 1, 2, 3],
    [1, 3, 1, 3, 2, 1], [1, 1, 2, 3, 1, 3], [1, 3, 2, 1, 1, 3], [1, 3, 2, 3, 1, 1], [2, 1, 1, 3, 1, 3],
    [2, 3, 1, 1, 1, 3], [2, 3, 1, 3, 1, 1], [1, 1, 2, 1, 3, 3], [1, 1, 2, 3, 3, 1], [1, 3, 2, 1, 3, 1],
    [1, 1, 3, 1, 2, 3], [1, 1, 3, 3, 2, 1], [1, 3, 3, 1, 2, 1], [3, 1, 3, 1, 2, 1], [2, 1, 1, 3, 3, 1],
    [2, 3, 1, 1, 3, 1], [2, 1, 3, 1, 1, 3], [2, 1, 3, 3, 1, 1], [2, 1, 3, 1, 3, 1], [3, 1, 1, 1, 2, 3],
    [3, 1, 1, 3, 2, 1], [3, 3, 1, 1, 2, 1], [3, 1, 2, 1, 1, 3], [3, 1, 2, 3, 1, 1], [3, 3, 2, 1, 1, 1],
    [3, 1, 4, 1, 1, 1], [2, 2, 1, 4, 1, 1], [4, 3, 1, 1, 1, 1], [1, 1, 1, 2, 2, 4], [1, 1, 1, 4, 2, 2],
    [1, 2, 1, 1, 2, 4], [1, 2, 1, 4, 2, 1], [1, 4, 1, 1, 2, 2], [1, 4, 1, 2, 2, 1], [1, 1, 2, 2, 1, 4],
    [1, 1, 2, 4, 1, 2], [1, 2, 2, 1, 1, 4], [1, 2, 2, 4, 1, 1], [1, 4, 2, 1, 1, 2], [1, 4, 2, 2, 1, 1],
    [2, 4, 1, 2, 1, 1], [2, 2, 1, 1, 1, 4], [4, 1, 3, 1, 1, 1], [2, 4, 1, 1, 1, 2], [1, 3, 4, 1, 1, 1],
    [1, 1, 1, 2, 4, 2], [1, 2, 1, 1, 4, 2], [1, 2, 1, 2, 4, 1], [1, 1, 4, 2, 1, 2], [1, 2, 4, 1, 1, 2],
    [1, 2, 4, 2, 1, 1], [4, 1, 1, 2, 1, 2], [4, 2, 1, 1, 1, 2], [4, 2, 1, 2, 1, 1], [2, 1, 2, 1, 4, 1],
    [2, 1, 4, 1, 2, 1], [4, 1, 2, 1, 2, 1], [1, 1, 1, 1, 4, 3], [1, 1, 1, 3, 4, 1], [1, 3, 1, 1, 4, 1],
    [1, 1, 4, 1, 1, 3], [1, 1, 4, 3, 1, 1], [4, 1, 1, 1, 1, 3], [4, 1, 1, 3, 1, 1], [1, 1, 3, 1, 4, 1],
    [1, 1, 4, 1, 3, 1], [3, 1, 1, 1, 4, 1], [4, 1, 1, 1, 3, 1], [2, 1, 1, 4, 1, 2], [2, 1, 1, 2, 1, 4],
    [2, 1, 1, 2, 3, 2],
];

/// Stop pattern including the final termination bar
pub(crate) const STOP: [u8; 7] = [2, 3, 3, 1, 1, 1, 2];

pub(crate) const START_A: u8 = 103;
pub(crate) const START_B: u8 = 104;
pub(crate) const START_C: u8 = 105;

const MAX_SYMBOLS: usize = 96;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CodeSet {
    A,
    B,
    C,
}

fn best_symbol(widths: &[usize]) -> Option<(u8, f32)> {
    let mut best: Option<(u8, f32)> = None;
    for (value, pattern) in PATTERNS.iter().enumerate() {
        let v = pattern_variance(widths, pattern, MAX_INDIVIDUAL_VARIANCE);
        if v < MAX_AVG_VARIANCE && best.is_none_or(|(_, b)| v < b) {
            best = Some((value as u8, v));
        }
    }
    best
}

fn is_stop(runs: &Runs, at: usize) -> bool {
    at + 7 <= runs.len()
        && pattern_variance(&runs.widths[at..at + 7], &STOP, MAX_INDIVIDUAL_VARIANCE)
            < MAX_AVG_VARIANCE
}

/// Decode a Code 128 symbol from a run sequence
///
/// The symbol must open with a start code behind a quiet zone and close with
/// the stop pattern; the mod-103 check symbol must match.
pub fn decode_code128(runs: &Runs) -> Option<DecodeOutcome> {
    let n = runs.len();
    for start in (0..n.saturating_sub(6 + 6 + 7)).filter(|&i| runs.is_dark(i)) {
        let Some((value, _)) = best_symbol(&runs.widths[start..start + 6]) else {
            continue;
        };
        if !(START_A..=START_C).contains(&value) {
            continue;
        }
        let width: usize = runs.widths[start..start + 6].iter().sum();
        if !has_quiet_zone(runs, start, width as f32 * 0.5) {
            continue;
        }
        if let Some(text) = read_from(runs, start, value) {
            return Some(DecodeOutcome::decoded(text, Symbology::Code128));
        }
    }
    None
}

fn read_from(runs: &Runs, start: usize, start_code: u8) -> Option<String> {
    let mut values = vec![start_code];
    let mut at = start + 6;
    loop {
        if is_stop(runs, at) {
            break;
        }
        if at + 6 > runs.len() || values.len() > MAX_SYMBOLS {
            return None;
        }
        let (value, _) = best_symbol(&runs.widths[at..at + 6])?;
        if value >= START_A {
            return None;
        }
        values.push(value);
        at += 6;
    }
    // start, at least one data symbol, check symbol
    if values.len() < 3 {
        return None;
    }
    let check = values.pop()? as u32;
    let sum = values
        .iter()
        .enumerate()
        .map(|(i, &v)| v as u32 * (i.max(1) as u32))
        .sum::<u32>();
    if sum % 103 != check {
        return None;
    }
    values_to_text(&values)
}

/// Translate data symbols (start code first, check symbol removed) to text
fn values_to_text(values: &[u8]) -> Option<String> {
    let mut set = match values.first()? {
        &START_A => CodeSet::A,
        &START_B => CodeSet::B,
        &START_C => CodeSet::C,
        _ => return None,
    };
    let mut shifted = false;
    let mut out = String::new();
    for &v in &values[1..] {
        let active = match (shifted, set) {
            (true, CodeSet::A) => CodeSet::B,
            (true, CodeSet::B) => CodeSet::A,
            (_, s) => s,
        };
        shifted = false;
        match (active, v) {
            (CodeSet::C, 0..=99) => {
                out.push(char::from(b'0' + v / 10));
                out.push(char::from(b'0' + v % 10));
            }
            (CodeSet::A, 0..=63) => out.push(char::from(v + 32)),
            (CodeSet::A, 64..=95) => out.push(char::from(v - 64)),
            (CodeSet::B, 0..=95) => out.push(char::from(v + 32)),
            // FNC1..FNC4 carry no text
            (_, 96 | 97 | 102) | (CodeSet::A, 101) | (CodeSet::B, 100) => {}
            (CodeSet::A | CodeSet::B, 98) => shifted = true,
            (CodeSet::A | CodeSet::B, 99) => set = CodeSet::C,
            (CodeSet::A | CodeSet::C, 100) => set = CodeSet::B,
            (CodeSet::B | CodeSet::C, 101) => set = CodeSet::A,
            _ => return None,
        }
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runs_for(values: &[u8], unit: usize) -> Runs {
        let mut widths = vec![10 * unit];
        let check = values
            .iter()
            .enumerate()
            .map(|(i, &v)| v as u32 * i.max(1) as u32)
            .sum::<u32>()
            % 103;
        for &v in values.iter().chain(std::iter::once(&(check as u8))) {
            widths.extend(PATTERNS[v as usize].iter().map(|&m| m as usize * unit));
        }
        widths.extend(STOP.iter().map(|&m| m as usize * unit));
        widths.push(10 * unit);
        Runs {
            first_dark: false,
            widths,
        }
    }

    #[test]
    fn test_code_set_b_text() {
        // "Hi-5" in code set B
        let runs = runs_for(&[START_B, 40, 73, 13, 21], 2);
        assert_eq!(
            decode_code128(&runs),
            Some(DecodeOutcome::decoded("Hi-5", Symbology::Code128))
        );
    }

    #[test]
    fn test_code_set_c_digits_both_directions() {
        let runs = runs_for(&[START_C, 89, 1, 3, 1, 23, 45], 3);
        let expected = Some(DecodeOutcome::decoded("890103012345", Symbology::Code128));
        assert_eq!(decode_code128(&runs), expected);
        assert_eq!(decode_code128(&runs.reversed()), None);
    }

    #[test]
    fn test_switch_from_c_to_b() {
        // "12" in C, switch to B, then "A"
        let runs = runs_for(&[START_C, 12, 100, 33], 2);
        assert_eq!(
            decode_code128(&runs),
            Some(DecodeOutcome::decoded("12A", Symbology::Code128))
        );
    }

    #[test]
    fn test_corrupted_check_symbol_is_rejected() {
        let mut runs = runs_for(&[START_B, 40, 73], 2);
        // swap the check symbol for another value
        let k = 1 + 6 * 3;
        let other = PATTERNS[0].iter().map(|&m| m as usize * 2);
        runs.widths.splice(k..k + 6, other);
        assert_eq!(decode_code128(&runs), None);
    }
}
