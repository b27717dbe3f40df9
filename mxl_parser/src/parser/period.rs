//! Sampling-period resolver for historical functions: `#<count>`, or an
//! integer duration with a time suffix, optionally shifted with
//! `:now/...` relative-time syntax.

use serde::{Deserialize, Serialize};

use crate::parser::{Matched, Outcome, SyntaxError};
use crate::utils::byte_at;

/// Time units accepted in periods and shifts. `M` is months, `m` minutes.
const PERIOD_UNITS: &[u8] = b"smhdwMy";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PeriodKind {
    /// `#<count>`: last N collected values.
    LastValues(u64),
    /// Integer duration, with its optional unit suffix.
    Duration { value: u64, unit: Option<char> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodMatch {
    pub offset: usize,
    pub len: usize,
    pub kind: PeriodKind,
    /// Length of the `:now...` shift portion, zero when absent.
    pub shift_len: usize,
}

impl Matched for PeriodMatch {
    fn offset(&self) -> usize {
        self.offset
    }
    fn len(&self) -> usize {
        self.len
    }
}

impl PeriodMatch {
    pub fn shift<'a>(&self, source: &'a str) -> Option<&'a str> {
        if self.shift_len == 0 {
            None
        } else {
            Some(&source[self.end() - self.shift_len..self.end()])
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PeriodParser;

impl PeriodParser {
    pub fn new() -> Self {
        Self
    }

    pub fn parse(&self, source: &str, pos: usize) -> Outcome<PeriodMatch> {
        let (mut end, kind) = if byte_at(source, pos) == Some(b'#') {
            let digits = scan_digits(source, pos + 1);
            if digits == 0 {
                return Outcome::Fail(SyntaxError::incorrect(pos));
            }
            let Ok(count) = source[pos + 1..pos + 1 + digits].parse() else {
                return Outcome::Fail(SyntaxError::incorrect(pos));
            };
            (pos + 1 + digits, PeriodKind::LastValues(count))
        } else {
            // Duration base is a whole number; fractions are not a period.
            let digits = scan_digits(source, pos);
            if digits == 0 {
                return Outcome::Fail(SyntaxError::incorrect(pos));
            }
            let Ok(value) = source[pos..pos + digits].parse() else {
                return Outcome::Fail(SyntaxError::incorrect(pos));
            };
            let mut end = pos + digits;
            let mut unit = None;
            if let Some(b) = byte_at(source, end) {
                if PERIOD_UNITS.contains(&b) {
                    unit = Some(b as char);
                    end += 1;
                }
            }
            (end, PeriodKind::Duration { value, unit })
        };

        let mut shift_len = 0;
        if byte_at(source, end) == Some(b':') {
            match scan_shift(source, end + 1) {
                Some(len) => {
                    shift_len = len;
                    end += 1 + len;
                }
                None => return Outcome::Fail(SyntaxError::incorrect(pos)),
            }
        }

        Outcome::Complete(PeriodMatch {
            offset: pos,
            len: end - pos,
            kind,
            shift_len,
        })
    }
}

fn scan_digits(source: &str, pos: usize) -> usize {
    let mut len = 0;
    while byte_at(source, pos + len).is_some_and(|b| b.is_ascii_digit()) {
        len += 1;
    }
    len
}

/// `now`, then any run of `/unit` roundings and `+`/`-` offsets.
fn scan_shift(source: &str, pos: usize) -> Option<usize> {
    if !source[pos..].starts_with("now") {
        return None;
    }
    let mut end = pos + 3;
    loop {
        match byte_at(source, end) {
            Some(b'/') => {
                let unit = byte_at(source, end + 1)?;
                if !PERIOD_UNITS.contains(&unit) {
                    return None;
                }
                end += 2;
            }
            Some(b'+') | Some(b'-') => {
                let digits = scan_digits(source, end + 1);
                if digits == 0 {
                    return None;
                }
                end += 1 + digits;
                if let Some(b) = byte_at(source, end) {
                    if PERIOD_UNITS.contains(&b) {
                        end += 1;
                    }
                }
            }
            _ => return Some(end - pos),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> Outcome<PeriodMatch> {
        PeriodParser::new().parse(source, 0)
    }

    #[test]
    fn test_last_values() {
        let m = parse("#5").into_value().unwrap();
        assert_eq!(m.kind, PeriodKind::LastValues(5));
        assert_eq!(m.len, 2);
        assert!(parse("#").is_fail());
    }

    #[test]
    fn test_duration_forms() {
        let m = parse("5m").into_value().unwrap();
        assert_eq!(
            m.kind,
            PeriodKind::Duration {
                value: 5,
                unit: Some('m')
            }
        );

        let m = parse("30").into_value().unwrap();
        assert_eq!(m.kind, PeriodKind::Duration { value: 30, unit: None });

        let m = parse("1M").into_value().unwrap();
        assert_eq!(
            m.kind,
            PeriodKind::Duration {
                value: 1,
                unit: Some('M')
            }
        );
    }

    #[test]
    fn test_fraction_is_not_a_period() {
        // "1.5m" matches only the leading "1"; the caller rejects the rest.
        let m = parse("1.5m").into_value().unwrap();
        assert_eq!(m.len, 1);
        assert!(parse(".5m").is_fail());
        assert!(parse("m").is_fail());
    }

    #[test]
    fn test_time_shift() {
        let source = "1h:now/h-1d";
        let m = parse(source).into_value().unwrap();
        assert_eq!(m.len, source.len());
        assert_eq!(m.shift(source), Some("now/h-1d"));

        let m = parse("1M:now/M").into_value().unwrap();
        assert_eq!(m.len, 8);

        let m = parse("1h:now-30m").into_value().unwrap();
        assert_eq!(m.len, 10);
    }

    #[test]
    fn test_last_values_with_shift() {
        let source = "#25:now/M";
        let m = parse(source).into_value().unwrap();
        assert_eq!(m.kind, PeriodKind::LastValues(25));
        assert_eq!(m.len, source.len());
        assert_eq!(m.shift(source), Some("now/M"));

        assert!(parse("#25:today").is_fail());
    }

    #[test]
    fn test_malformed_shift() {
        assert!(parse("1h:now/").is_fail());
        assert!(parse("1h:now/x").is_fail());
        assert!(parse("1h:today").is_fail());
        assert!(parse("1h:now-").is_fail());
        assert!(parse("1h:").is_fail());
    }
}
