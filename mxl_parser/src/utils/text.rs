//! Byte-offset scanning helpers.
//!
//! All resolvers address the source by byte offset. Offsets handed between
//! resolvers always sit on character boundaries; `excerpt` is the only place
//! that has to count display characters rather than bytes.

use crate::config::constants::compile_time::expression::ERROR_EXCERPT_CHARS;

/// Byte at `pos`, if any. ASCII-only call sites use this to avoid decoding.
#[inline]
pub fn byte_at(source: &str, pos: usize) -> Option<u8> {
    source.as_bytes().get(pos).copied()
}

/// Character starting at byte offset `pos`, if any.
#[inline]
pub fn char_at(source: &str, pos: usize) -> Option<char> {
    source.get(pos..).and_then(|rest| rest.chars().next())
}

/// Advance past plain spaces only. Function parameter lists accept no other
/// gap characters.
pub fn skip_spaces(source: &str, mut pos: usize) -> usize {
    while byte_at(source, pos) == Some(b' ') {
        pos += 1;
    }
    pos
}

/// Advance past expression-level whitespace: space, tab, CR, LF.
pub fn skip_whitespace(source: &str, mut pos: usize) -> usize {
    while matches!(byte_at(source, pos), Some(b' ' | b'\t' | b'\r' | b'\n')) {
        pos += 1;
    }
    pos
}

/// Source excerpt starting at `offset`, truncated to at most
/// [`ERROR_EXCERPT_CHARS`] characters on a character boundary.
pub fn excerpt(source: &str, offset: usize) -> &str {
    let rest = source.get(offset..).unwrap_or("");
    match rest.char_indices().nth(ERROR_EXCERPT_CHARS) {
        Some((end, _)) => &rest[..end],
        None => rest,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skip_spaces_stops_at_tab() {
        assert_eq!(skip_spaces("  \tx", 0), 2);
        assert_eq!(skip_whitespace("  \t\r\nx", 0), 5);
    }

    #[test]
    fn test_excerpt_truncates_on_char_boundary() {
        let long: String = "é".repeat(60);
        let cut = excerpt(&long, 0);
        assert_eq!(cut.chars().count(), 50);

        assert_eq!(excerpt("abc", 1), "bc");
        assert_eq!(excerpt("abc", 3), "");
        assert_eq!(excerpt("abc", 10), "");
    }

    #[test]
    fn test_char_at_multibyte() {
        let s = "a€b";
        assert_eq!(char_at(s, 1), Some('€'));
        assert_eq!(char_at(s, 4), Some('b'));
        assert_eq!(char_at(s, 5), None);
    }
}
