//! Double-quoted string scanning, unescaping and quoting.

use crate::utils::byte_at;

/// Escape sequences accepted inside a quoted string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EscapeSet {
    /// `\"` and `\\` only.
    #[default]
    Basic,
    /// `\"`, `\\` and `\n`.
    WithNewline,
}

impl EscapeSet {
    fn accepts(self, b: u8) -> bool {
        match self {
            EscapeSet::Basic => b == b'"' || b == b'\\',
            EscapeSet::WithNewline => b == b'"' || b == b'\\' || b == b'n',
        }
    }
}

/// Scan a quoted string starting at `pos`. Returns the full length
/// including both quotes, or `None` when the opening quote is missing,
/// the string is unterminated, or an unsupported escape appears.
pub fn scan(source: &str, pos: usize, escapes: EscapeSet) -> Option<usize> {
    if byte_at(source, pos) != Some(b'"') {
        return None;
    }
    let mut len = 1;
    loop {
        match byte_at(source, pos + len)? {
            b'"' => return Some(len + 1),
            b'\\' => {
                let next = byte_at(source, pos + len + 1)?;
                if !escapes.accepts(next) {
                    return None;
                }
                len += 2;
            }
            _ => {
                // Multibyte characters pass through untouched.
                let c = source[pos + len..].chars().next()?;
                len += c.len_utf8();
            }
        }
    }
}

/// Remove the surrounding quotes and resolve escapes. `raw` must be a
/// string previously accepted by [`scan`].
pub fn unquote(raw: &str, escapes: EscapeSet) -> String {
    let inner = &raw[1..raw.len().saturating_sub(1)];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') if escapes == EscapeSet::WithNewline => out.push('\n'),
                Some(escaped) => out.push(escaped),
                None => {}
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Wrap a value in quotes, escaping `"` and `\`. Unless `force` is set,
/// values that are already safe to pass unquoted are returned unchanged.
pub fn quote(value: &str, force: bool) -> String {
    if !force && !needs_quoting(value) {
        return value.to_string();
    }
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

fn needs_quoting(value: &str) -> bool {
    if value.starts_with('"') || value.starts_with(' ') {
        return true;
    }
    value.contains(',') || value.contains('(') || value.contains(')')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_basic() {
        assert_eq!(scan("\"abc\"", 0, EscapeSet::Basic), Some(5));
        assert_eq!(scan("\"\"", 0, EscapeSet::Basic), Some(2));
        assert_eq!(scan("x\"a\"y", 1, EscapeSet::Basic), Some(3));
    }

    #[test]
    fn test_scan_escapes() {
        assert_eq!(scan(r#""a\"b""#, 0, EscapeSet::Basic), Some(6));
        assert_eq!(scan(r#""a\\b""#, 0, EscapeSet::Basic), Some(6));
        assert_eq!(scan(r#""a\nb""#, 0, EscapeSet::Basic), None);
        assert_eq!(scan(r#""a\nb""#, 0, EscapeSet::WithNewline), Some(6));
        assert_eq!(scan(r#""a\b""#, 0, EscapeSet::WithNewline), None);
    }

    #[test]
    fn test_scan_unterminated() {
        assert_eq!(scan("\"abc", 0, EscapeSet::Basic), None);
        assert_eq!(scan(r#""abc\"#, 0, EscapeSet::Basic), None);
        assert_eq!(scan("abc", 0, EscapeSet::Basic), None);
    }

    #[test]
    fn test_scan_multibyte_content() {
        let source = "\"значение\"";
        assert_eq!(scan(source, 0, EscapeSet::Basic), Some(source.len()));
    }

    #[test]
    fn test_unquote() {
        assert_eq!(unquote("\"abc\"", EscapeSet::Basic), "abc");
        assert_eq!(unquote(r#""a\"b""#, EscapeSet::Basic), "a\"b");
        assert_eq!(unquote(r#""a\\b""#, EscapeSet::Basic), "a\\b");
        assert_eq!(unquote(r#""a\nb""#, EscapeSet::WithNewline), "a\nb");
    }

    #[test]
    fn test_quote() {
        assert_eq!(quote("abc", false), "abc");
        assert_eq!(quote("abc", true), "\"abc\"");
        assert_eq!(quote("a,b", false), "\"a,b\"");
        assert_eq!(quote("a\"b", true), r#""a\"b""#);
        assert_eq!(quote(" a", false), "\" a\"");
        assert_eq!(quote("func()", false), "\"func()\"");
    }
}
