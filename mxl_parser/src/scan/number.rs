//! Numeric literal scanning with size and time suffixes.

use serde::{Deserialize, Serialize};

use crate::config::constants::compile_time::number;
use crate::utils::byte_at;

/// Multiplier suffix alphabet: size (K, M, G, T) and time (s, m, h, d, w).
const SUFFIXES: &[u8] = b"KMGTsmhdw";

/// A scanned numeric literal. `len` covers the sign, digits and suffix;
/// `value` is the parsed magnitude with the suffix multiplier applied.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NumberMatch {
    pub len: usize,
    pub suffix: Option<char>,
    pub value: f64,
}

/// Scanner for decimal literals of the form `digits[.digits]` or
/// `.digits`, optionally signed and optionally suffixed.
#[derive(Debug, Clone, Copy, Default)]
pub struct NumberScanner {
    allow_sign: bool,
    allow_suffix: bool,
}

impl NumberScanner {
    pub fn new() -> Self {
        Self {
            allow_sign: false,
            allow_suffix: true,
        }
    }

    pub fn with_sign(mut self) -> Self {
        self.allow_sign = true;
        self
    }

    pub fn without_suffix(mut self) -> Self {
        self.allow_suffix = false;
        self
    }

    /// Scan a number starting at `pos`. Returns `None` when no valid
    /// literal starts there, including the case where the suffix
    /// multiplication overflows to an infinite value.
    pub fn scan(&self, source: &str, pos: usize) -> Option<NumberMatch> {
        let mut len = 0;

        let mut negative = false;
        if self.allow_sign {
            match byte_at(source, pos) {
                Some(b'-') => {
                    negative = true;
                    len += 1;
                }
                Some(b'+') => len += 1,
                _ => {}
            }
        }

        let digits_start = len;
        while byte_at(source, pos + len).is_some_and(|b| b.is_ascii_digit()) {
            len += 1;
        }
        let int_digits = len - digits_start;

        if byte_at(source, pos + len) == Some(b'.') {
            // A bare dot is only a number when digits follow it.
            let dot = len;
            len += 1;
            while byte_at(source, pos + len).is_some_and(|b| b.is_ascii_digit()) {
                len += 1;
            }
            let frac_digits = len - dot - 1;
            if int_digits == 0 && frac_digits == 0 {
                return None;
            }
        } else if int_digits == 0 {
            return None;
        }

        let numeric_end = len;
        let mut suffix = None;
        if self.allow_suffix {
            if let Some(b) = byte_at(source, pos + len) {
                if SUFFIXES.contains(&b) {
                    suffix = Some(b as char);
                    len += 1;
                }
            }
        }

        let magnitude: f64 = source[pos + digits_start..pos + numeric_end].parse().ok()?;
        let value = magnitude * suffix.map_or(1.0, multiplier);
        if !value.is_finite() {
            return None;
        }

        Some(NumberMatch {
            len,
            suffix,
            value: if negative { -value } else { value },
        })
    }
}

fn multiplier(suffix: char) -> f64 {
    match suffix {
        'K' => number::KIBI as f64,
        'M' => number::MEBI as f64,
        'G' => number::GIBI as f64,
        'T' => number::TEBI as f64,
        's' => 1.0,
        'm' => number::SEC_PER_MIN as f64,
        'h' => number::SEC_PER_HOUR as f64,
        'd' => number::SEC_PER_DAY as f64,
        'w' => number::SEC_PER_WEEK as f64,
        _ => 1.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(source: &str) -> Option<NumberMatch> {
        NumberScanner::new().scan(source, 0)
    }

    #[test]
    fn test_integer_and_fraction_forms() {
        assert_eq!(scan("12").map(|m| m.len), Some(2));
        assert_eq!(scan("12.5").map(|m| m.len), Some(4));
        assert_eq!(scan(".5").map(|m| m.len), Some(2));
        // Trailing dot belongs to the number, a second dot does not.
        assert_eq!(scan("5.").map(|m| m.len), Some(2));
        assert_eq!(scan("5..").map(|m| m.len), Some(2));
    }

    #[test]
    fn test_rejects_non_numbers() {
        assert!(scan(".").is_none());
        assert!(scan("..5").is_none());
        assert!(scan("abc").is_none());
        assert!(scan("").is_none());
    }

    #[test]
    fn test_suffix_multipliers() {
        let m = scan("2K").unwrap();
        assert_eq!(m.len, 2);
        assert_eq!(m.suffix, Some('K'));
        assert_eq!(m.value, 2048.0);

        assert_eq!(scan("1h").unwrap().value, 3600.0);
        assert_eq!(scan("1w").unwrap().value, 604800.0);
        assert_eq!(scan("1.5m").unwrap().value, 90.0);
        assert_eq!(scan("3s").unwrap().value, 3.0);
    }

    #[test]
    fn test_only_one_suffix_consumed() {
        assert_eq!(scan("9mm").map(|m| m.len), Some(2));
    }

    #[test]
    fn test_sign_handling() {
        assert!(scan("-5").is_none());
        let signed = NumberScanner::new().with_sign();
        let m = signed.scan("-5", 0).unwrap();
        assert_eq!(m.len, 2);
        assert_eq!(m.value, -5.0);
        assert_eq!(signed.scan("+2.5", 0).map(|m| m.len), Some(4));
        assert!(signed.scan("-", 0).is_none());
    }

    #[test]
    fn test_suffix_disabled() {
        let plain = NumberScanner::new().without_suffix();
        assert_eq!(plain.scan("2K", 0).map(|m| m.len), Some(1));
    }

    #[test]
    fn test_overflow_to_infinity_rejected() {
        let digits = "9".repeat(400);
        assert!(scan(&digits).is_none());
    }
}
