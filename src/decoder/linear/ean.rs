//! EAN-13 / UPC-A and EAN-8 readers

use super::{MAX_AVG_VARIANCE, MAX_INDIVIDUAL_VARIANCE, has_quiet_zone, pattern_variance};
use crate::decoder::checksum::{is_valid_ean8, is_valid_ean13};
use crate::models::{DecodeOutcome, Symbology};
use crate::utils::binarization::Runs;

/// L-code widths (space, bar, space, bar) per digit; R-codes share the
/// widths with colours swapped, G-codes are the L widths reversed
pub(crate) const L_PATTERNS: [[u8; 4]; 10] = [
    [3, 2, 1, 1],
    [2, 2, 2, 1],
    [2, 1, 2, 2],
    [1, 4, 1, 1],
    [1, 1, 3, 2],
    [1, 2, 3, 1],
    [1, 1, 1, 4],
    [1, 3, 1, 2],
    [1, 2, 1, 3],
    [3, 1, 1, 2],
];

/// Parity of the six left-hand digits (bit 5 = first digit, set = G-code)
/// for each implied leading digit of an EAN-13
pub(crate) const FIRST_DIGIT_PARITY: [u8; 10] = [0x00, 0x0B, 0x0D, 0x0E, 0x13, 0x19, 0x1C, 0x15, 0x16, 0x1A];

pub(crate) const GUARD: [u8; 3] = [1, 1, 1];
pub(crate) const MIDDLE: [u8; 5] = [1, 1, 1, 1, 1];

#[derive(Debug, Clone, Copy)]
struct Digit {
    value: u8,
    g_code: bool,
}

fn g_pattern(d: usize) -> [u8; 4] {
    let [a, b, c, e] = L_PATTERNS[d];
    [e, c, b, a]
}

fn match_digit(widths: &[usize]) -> Option<Digit> {
    let mut best: Option<(f32, Digit)> = None;
    for d in 0..10 {
        for (g_code, pattern) in [(false, L_PATTERNS[d]), (true, g_pattern(d))] {
            let v = pattern_variance(widths, &pattern, MAX_INDIVIDUAL_VARIANCE);
            if v < MAX_AVG_VARIANCE && best.is_none_or(|(b, _)| v < b) {
                best = Some((
                    v,
                    Digit {
                        value: d as u8,
                        g_code,
                    },
                ));
            }
        }
    }
    best.map(|(_, d)| d)
}

fn is_guard(widths: &[usize], pattern: &[u8]) -> bool {
    pattern_variance(widths, pattern, MAX_INDIVIDUAL_VARIANCE) < MAX_AVG_VARIANCE
}

/// Start-guard candidates: a dark run opening a bar-space-bar triple behind a
/// quiet zone. Yields the index of the first guard bar and its module width.
fn start_guards(runs: &Runs, needed: usize) -> impl Iterator<Item = (usize, f32)> + '_ {
    let n = runs.len();
    (0..n.saturating_sub(needed))
        .filter(move |&i| runs.is_dark(i))
        .filter_map(move |i| {
            let guard = &runs.widths[i..i + 3];
            if !is_guard(guard, &GUARD) {
                return None;
            }
            let unit = guard.iter().sum::<usize>() as f32 / 3.0;
            has_quiet_zone(runs, i, unit * 2.5).then_some((i, unit))
        })
}

/// Read `count` consecutive digit groups starting at run `from`
fn read_digits(runs: &Runs, from: usize, count: usize, unit: f32) -> Option<Vec<Digit>> {
    (0..count)
        .map(|k| {
            let w = &runs.widths[from + 4 * k..from + 4 * k + 4];
            let total = w.iter().sum::<usize>() as f32;
            // a digit spans 7 modules; far-off groups belong to something else
            if total < unit * 7.0 * 0.5 || total > unit * 7.0 * 1.6 {
                return None;
            }
            match_digit(w)
        })
        .collect()
}

fn digits_to_string(values: impl IntoIterator<Item = u8>) -> String {
    values.into_iter().map(|d| char::from(b'0' + d)).collect()
}

/// Runs: start guard (3), six digits (24), middle guard (5), six digits (24),
/// end guard (3)
const EAN13_RUNS: usize = 59;

/// Decode an EAN-13 from a run sequence. A leading `0` is reported as the
/// 12-digit UPC-A it encodes.
pub fn decode_ean13(runs: &Runs) -> Option<DecodeOutcome> {
    for (start, unit) in start_guards(runs, EAN13_RUNS - 1) {
        let left = start + 3;
        let middle = left + 24;
        let right = middle + 5;
        let end = right + 24;
        if !is_guard(&runs.widths[middle..middle + 5], &MIDDLE)
            || !is_guard(&runs.widths[end..end + 3], &GUARD)
        {
            continue;
        }
        let Some(first) = read_digits(runs, left, 6, unit) else {
            continue;
        };
        let Some(second) = read_digits(runs, right, 6, unit) else {
            continue;
        };
        let Some(code) = assemble_ean13(&first, &second) else {
            continue;
        };
        if !is_valid_ean13(&code) {
            continue;
        }
        return Some(match code.strip_prefix('0') {
            Some(upca) => DecodeOutcome::decoded(upca, Symbology::UpcA),
            None => DecodeOutcome::decoded(code, Symbology::Ean13),
        });
    }
    None
}

fn parity_bits(digits: &[Digit]) -> u8 {
    digits
        .iter()
        .fold(0u8, |acc, d| (acc << 1) | d.g_code as u8)
}

fn assemble_ean13(first: &[Digit], second: &[Digit]) -> Option<String> {
    // forward read: right half is all R-codes, which match as L
    if second.iter().all(|d| !d.g_code) {
        let parity = parity_bits(first);
        let lead = FIRST_DIGIT_PARITY.iter().position(|&p| p == parity)? as u8;
        let values = std::iter::once(lead)
            .chain(first.iter().map(|d| d.value))
            .chain(second.iter().map(|d| d.value));
        return Some(digits_to_string(values));
    }
    // reversed read: the R-codes come first and show up as G-codes; the
    // original left half follows with every parity flipped
    if first.iter().all(|d| d.g_code) {
        let left: Vec<Digit> = second
            .iter()
            .rev()
            .map(|d| Digit {
                value: d.value,
                g_code: !d.g_code,
            })
            .collect();
        let parity = parity_bits(&left);
        let lead = FIRST_DIGIT_PARITY.iter().position(|&p| p == parity)? as u8;
        let values = std::iter::once(lead)
            .chain(left.iter().map(|d| d.value))
            .chain(first.iter().rev().map(|d| d.value));
        return Some(digits_to_string(values));
    }
    None
}

/// Runs: start guard (3), four digits (16), middle guard (5), four digits (16),
/// end guard (3)
const EAN8_RUNS: usize = 43;

/// Decode an EAN-8 from a run sequence
pub fn decode_ean8(runs: &Runs) -> Option<DecodeOutcome> {
    for (start, unit) in start_guards(runs, EAN8_RUNS - 1) {
        let left = start + 3;
        let middle = left + 16;
        let right = middle + 5;
        let end = right + 16;
        if !is_guard(&runs.widths[middle..middle + 5], &MIDDLE)
            || !is_guard(&runs.widths[end..end + 3], &GUARD)
        {
            continue;
        }
        let Some(first) = read_digits(runs, left, 4, unit) else {
            continue;
        };
        let Some(second) = read_digits(runs, right, 4, unit) else {
            continue;
        };
        let values: Vec<u8> = if first.iter().chain(&second).all(|d| !d.g_code) {
            first.iter().chain(&second).map(|d| d.value).collect()
        } else if first.iter().chain(&second).all(|d| d.g_code) {
            second.iter().rev().chain(first.iter().rev()).map(|d| d.value).collect()
        } else {
            continue;
        };
        let code = digits_to_string(values);
        if is_valid_ean8(&code) {
            return Some(DecodeOutcome::decoded(code, Symbology::Ean8));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Module widths for an EAN-13 including 9-module quiet zones, starting light
    fn ean13_modules(code: &str) -> Vec<usize> {
        let d: Vec<usize> = code.bytes().map(|b| (b - b'0') as usize).collect();
        let parity = FIRST_DIGIT_PARITY[d[0]];
        let mut m = vec![9, 1, 1, 1];
        for (k, &digit) in d[1..7].iter().enumerate() {
            let g = parity & (1 << (5 - k)) != 0;
            let p = if g { g_pattern(digit) } else { L_PATTERNS[digit] };
            m.extend(p.iter().map(|&x| x as usize));
        }
        m.extend([1, 1, 1, 1, 1]);
        for &digit in &d[7..] {
            m.extend(L_PATTERNS[digit].iter().map(|&x| x as usize));
        }
        m.extend([1, 1, 1, 9]);
        m
    }

    fn runs_from_modules(modules: &[usize], unit: usize) -> Runs {
        Runs {
            first_dark: false,
            widths: modules.iter().map(|m| m * unit).collect(),
        }
    }

    #[test]
    fn test_decode_ean13_forward_and_reversed() {
        let runs = runs_from_modules(&ean13_modules("4006381333931"), 2);
        assert_eq!(
            decode_ean13(&runs),
            Some(DecodeOutcome::decoded("4006381333931", Symbology::Ean13))
        );
        assert_eq!(
            decode_ean13(&runs.reversed()),
            Some(DecodeOutcome::decoded("4006381333931", Symbology::Ean13))
        );
    }

    #[test]
    fn test_zero_lead_reports_upca() {
        let runs = runs_from_modules(&ean13_modules("0036000291452"), 3);
        assert_eq!(
            decode_ean13(&runs),
            Some(DecodeOutcome::decoded("036000291452", Symbology::UpcA))
        );
    }

    #[test]
    fn test_bad_check_digit_is_rejected() {
        let runs = runs_from_modules(&ean13_modules("4006381333932"), 2);
        assert_eq!(decode_ean13(&runs), None);
    }

    #[test]
    fn test_decode_ean8() {
        let d: Vec<usize> = "96385074".bytes().map(|b| (b - b'0') as usize).collect();
        let mut m = vec![9, 1, 1, 1];
        for &digit in &d[..4] {
            m.extend(L_PATTERNS[digit].iter().map(|&x| x as usize));
        }
        m.extend([1, 1, 1, 1, 1]);
        for &digit in &d[4..] {
            m.extend(L_PATTERNS[digit].iter().map(|&x| x as usize));
        }
        m.extend([1, 1, 1, 9]);
        let runs = runs_from_modules(&m, 2);
        let expected = Some(DecodeOutcome::decoded("96385074", Symbology::Ean8));
        assert_eq!(decode_ean8(&runs), expected);
        assert_eq!(decode_ean8(&runs.reversed()), expected);
        assert_eq!(decode_ean13(&runs), None);
    }
}
