//! Retail check-digit rules and digit-string extraction
//!
//! All checks operate on ASCII digit strings. Inputs containing anything
//! else simply fail to validate; nothing here panics on arbitrary text.

use crate::models::{Symbology, ValidatedBarcode};

#[inline]
fn digit_values(code: &str) -> Option<Vec<u32>> {
    code.bytes()
        .map(|b| if b.is_ascii_digit() { Some((b - b'0') as u32) } else { None })
        .collect()
}

/// Mod-10 check digit for a payload where the weight 3 lands on the
/// right-most payload digit and alternates leftwards (the GS1 rule shared by
/// EAN-8, UPC-A, EAN-13 and GTIN-14).
pub fn compute_check_digit(payload: &str) -> Option<u8> {
    let values = digit_values(payload)?;
    if values.is_empty() {
        return None;
    }
    let sum: u32 = values
        .iter()
        .rev()
        .enumerate()
        .map(|(i, &d)| if i % 2 == 0 { d * 3 } else { d })
        .sum();
    Some(((10 - sum % 10) % 10) as u8)
}

fn has_valid_check(code: &str, len: usize) -> bool {
    if code.len() != len {
        return false;
    }
    let Some(values) = digit_values(code) else {
        return false;
    };
    compute_check_digit(&code[..len - 1]) == Some(values[len - 1] as u8)
}

/// EAN-13: weights 1,3,1,3,... from the left over the first twelve digits
pub fn is_valid_ean13(code: &str) -> bool {
    let Some(d) = digit_values(code) else {
        return false;
    };
    if d.len() != 13 {
        return false;
    }
    let sum: u32 = d[..12]
        .iter()
        .enumerate()
        .map(|(i, &v)| if i % 2 == 0 { v } else { v * 3 })
        .sum();
    (10 - sum % 10) % 10 == d[12]
}

/// UPC-A: odd positions (1st, 3rd, ...) weighted 3, even positions weighted 1
pub fn is_valid_upca(code: &str) -> bool {
    let Some(d) = digit_values(code) else {
        return false;
    };
    if d.len() != 12 {
        return false;
    }
    let odd: u32 = d[..11].iter().step_by(2).sum();
    let even: u32 = d[1..11].iter().step_by(2).sum();
    let total = odd * 3 + even;
    (10 - total % 10) % 10 == d[11]
}

/// EAN-8: positions 0,2,4,6 weighted 3, positions 1,3,5 weighted 1
pub fn is_valid_ean8(code: &str) -> bool {
    let Some(d) = digit_values(code) else {
        return false;
    };
    if d.len() != 8 {
        return false;
    }
    let sum: u32 = d[..7]
        .iter()
        .enumerate()
        .map(|(i, &v)| if i % 2 == 0 { v * 3 } else { v })
        .sum();
    (10 - sum % 10) % 10 == d[7]
}

/// GTIN-14 (ITF-14 cartons)
pub fn is_valid_gtin14(code: &str) -> bool {
    has_valid_check(code, 14)
}

/// Expand an 8-digit UPC-E (number system, six payload digits, check) to UPC-A
///
/// Returns `None` unless the number system is 0 or 1.
pub fn expand_upce(code: &str) -> Option<String> {
    let d = code.as_bytes();
    if d.len() != 8 || !d.iter().all(u8::is_ascii_digit) {
        return None;
    }
    let ns = d[0];
    if ns != b'0' && ns != b'1' {
        return None;
    }
    let p = &d[1..7];
    let check = d[7];
    let body: Vec<u8> = match p[5] {
        b'0' | b'1' | b'2' => [&p[0..2], &[p[5]], b"0000", &p[2..5]].concat(),
        b'3' => [&p[0..3], b"00000", &p[3..5]].concat(),
        b'4' => [&p[0..4], b"00000", &[p[4]]].concat(),
        _ => [&p[0..5], b"0000", &[p[5]]].concat(),
    };
    let mut out = Vec::with_capacity(12);
    out.push(ns);
    out.extend_from_slice(&body);
    out.push(check);
    String::from_utf8(out).ok()
}

/// Keep only the ASCII digits of `text`
pub fn digits_only(text: &str) -> String {
    text.chars().filter(|c| c.is_ascii_digit()).collect()
}

fn leftmost_window(digits: &str, len: usize, check: fn(&str) -> bool) -> Option<&str> {
    if !digits.is_ascii() || digits.len() < len {
        return None;
    }
    (0..=digits.len() - len)
        .map(|start| &digits[start..start + len])
        .find(|window| check(window))
}

/// Search a digit run for an embedded retail code
///
/// Window lengths are tried in a fixed order: 13 (EAN-13), 12 (UPC-A),
/// 8 (EAN-8), then 14 where a leading `0` is dropped and the remaining 13
/// digits are checked as EAN-13. Within one length the leftmost window wins.
pub fn find_valid_barcode_substring(digits: &str) -> Option<ValidatedBarcode> {
    if let Some(w) = leftmost_window(digits, 13, is_valid_ean13) {
        return Some(ValidatedBarcode::new(w.to_string(), Symbology::Ean13));
    }
    if let Some(w) = leftmost_window(digits, 12, is_valid_upca) {
        return Some(ValidatedBarcode::new(w.to_string(), Symbology::UpcA));
    }
    if let Some(w) = leftmost_window(digits, 8, is_valid_ean8) {
        return Some(ValidatedBarcode::new(w.to_string(), Symbology::Ean8));
    }
    let stripped = leftmost_window(digits, 14, |w| {
        w.starts_with('0') && is_valid_ean13(&w[1..])
    })?;
    Some(ValidatedBarcode::new(
        stripped[1..].to_string(),
        Symbology::Ean13,
    ))
}

/// Re-validate an engine's decoded text
///
/// Engines that report a symbology are trusted only as far as their payload
/// survives the matching retail check. Engines that report none (OCR) go
/// through [`find_valid_barcode_substring`].
pub fn validate_decoded(text: &str, symbology: Option<Symbology>) -> Option<ValidatedBarcode> {
    let text = text.trim();
    let Some(symbology) = symbology else {
        return find_valid_barcode_substring(&digits_only(text));
    };
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let accepted = match symbology {
        Symbology::Ean13 => is_valid_ean13(text),
        Symbology::UpcA => is_valid_upca(text),
        Symbology::Ean8 => is_valid_ean8(text),
        Symbology::UpcE => match text.len() {
            6 => true,
            8 => expand_upce(text).is_some_and(|upca| is_valid_upca(&upca)),
            _ => false,
        },
        Symbology::Code128 | Symbology::Code39 | Symbology::Itf => match text.len() {
            8 => is_valid_ean8(text),
            12 => is_valid_upca(text),
            13 => is_valid_ean13(text),
            14 => is_valid_gtin14(text),
            _ => false,
        },
    };
    accepted.then(|| ValidatedBarcode::new(text.to_string(), symbology))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Deterministic xorshift so the property loops need no extra crates
    struct XorShift(u64);

    impl XorShift {
        fn next_digit(&mut self) -> u8 {
            self.0 ^= self.0 << 13;
            self.0 ^= self.0 >> 7;
            self.0 ^= self.0 << 17;
            b'0' + (self.0 % 10) as u8
        }

        fn digits(&mut self, n: usize) -> String {
            (0..n).map(|_| self.next_digit() as char).collect()
        }
    }

    #[test]
    fn test_known_ean13() {
        assert!(is_valid_ean13("8901030123450"));
        assert!(!is_valid_ean13("8901030123456"));
        assert!(!is_valid_ean13("8901030123457"));
        assert!(is_valid_ean13("4006381333931"));
        assert!(!is_valid_ean13("400638133393"));
        assert!(!is_valid_ean13("40063813339a1"));
    }

    #[test]
    fn test_ean13_check_digit_property() {
        let mut rng = XorShift(0x9E37_79B9_7F4A_7C15);
        for _ in 0..2000 {
            let prefix = rng.digits(12);
            let check = compute_check_digit(&prefix).unwrap();
            let good = format!("{prefix}{check}");
            assert!(is_valid_ean13(&good), "{good}");

            let wrong = (check + 9) % 10;
            let bad = format!("{prefix}{wrong}");
            assert!(!is_valid_ean13(&bad), "{bad}");
        }
    }

    #[test]
    fn test_upca_and_ean8() {
        assert!(is_valid_upca("036000291452"));
        assert!(!is_valid_upca("036000291453"));
        assert!(is_valid_ean8("96385074"));
        assert!(!is_valid_ean8("96385075"));
        assert!(is_valid_gtin14("00012345600012"));
        assert!(!is_valid_gtin14("00012345600013"));
    }

    #[test]
    fn test_upca_equals_zero_prefixed_ean13() {
        let mut rng = XorShift(42);
        for _ in 0..500 {
            let prefix = rng.digits(11);
            let check = compute_check_digit(&prefix).unwrap();
            let upca = format!("{prefix}{check}");
            assert!(is_valid_upca(&upca));
            assert!(is_valid_ean13(&format!("0{upca}")));
        }
    }

    #[test]
    fn test_embedded_ean13_is_found() {
        let mut rng = XorShift(7);
        for _ in 0..300 {
            let prefix = rng.digits(12);
            let check = compute_check_digit(&prefix).unwrap();
            let code = format!("{prefix}{check}");
            let noise = format!("{}{}{}", rng.digits(3), code, rng.digits(4));

            let found = find_valid_barcode_substring(&noise).unwrap();
            assert_eq!(found.digits().len(), 13);
            assert!(is_valid_ean13(found.digits()));
            // an earlier window may validate by chance; it must then start before the code
            let pos = noise.find(found.digits()).unwrap();
            assert!(pos <= 3);
        }
    }

    #[test]
    fn test_window_order() {
        // only a 12-digit UPC-A is present
        let found = find_valid_barcode_substring("036000291452").unwrap();
        assert_eq!(found.symbology(), Symbology::UpcA);

        let found = find_valid_barcode_substring("96385074").unwrap();
        assert_eq!(found.symbology(), Symbology::Ean8);
        assert_eq!(found.digits(), "96385074");

        assert!(find_valid_barcode_substring("1234").is_none());
        assert!(find_valid_barcode_substring("").is_none());
    }

    #[test]
    fn test_non_digit_input_never_panics() {
        assert!(find_valid_barcode_substring("ab€cdéfghijklmnop").is_none());
        assert!(find_valid_barcode_substring("8901030123450x").is_some());
    }

    #[test]
    fn test_expand_upce() {
        assert_eq!(expand_upce("04252614").as_deref(), Some("042100005264"));
        assert_eq!(expand_upce("01234565").as_deref(), Some("012345000065"));
        assert!(is_valid_upca("012345000065"));
        assert_eq!(expand_upce("21234565"), None);
        assert_eq!(expand_upce("0123456"), None);
    }

    #[test]
    fn test_validate_decoded_rules() {
        let ok = validate_decoded("8901030123450", Some(Symbology::Ean13)).unwrap();
        assert_eq!(ok.digits(), "8901030123450");
        assert!(validate_decoded("8901030123457", Some(Symbology::Ean13)).is_none());

        // non-numeric payloads from a trusted symbology are still rejected
        assert!(validate_decoded("HELLO-128", Some(Symbology::Code128)).is_none());
        // numeric payload with a retail length must pass the matching check
        assert!(validate_decoded("8901030123450", Some(Symbology::Code128)).is_some());
        assert!(validate_decoded("8901030123457", Some(Symbology::Code128)).is_none());
        assert!(validate_decoded("00012345600012", Some(Symbology::Itf)).is_some());
        assert!(validate_decoded("123456", Some(Symbology::Code39)).is_none());

        assert!(validate_decoded("425261", Some(Symbology::UpcE)).is_some());
        assert!(validate_decoded("01234565", Some(Symbology::UpcE)).is_some());
        assert!(validate_decoded("01234566", Some(Symbology::UpcE)).is_none());
    }

    #[test]
    fn test_validate_raw_ocr_text() {
        let hit = validate_decoded("EAN 8 901030 123450\n", None).unwrap();
        assert_eq!(hit.digits(), "8901030123450");
        assert_eq!(hit.symbology(), Symbology::Ean13);
        assert!(validate_decoded("no digits here", None).is_none());
    }
}
