//! Macro resolvers: generic named macros, user macros with context,
//! LLD macros and the LLD-macro-function composite.

use serde::{Deserialize, Serialize};

use crate::parser::function::{FunctionMatch, FunctionOptions, FunctionParser};
use crate::parser::{Matched, Outcome, SyntaxError};
use crate::scan::{quoted, EscapeSet};
use crate::utils::byte_at;

/// How a generic macro may be suffixed before the closing brace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReferenceMode {
    #[default]
    None,
    /// Optional single digit 1-9, e.g. `{HOST.HOST2}`.
    Numbered,
    /// `.key` or `."quoted key"` named reference.
    Named,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MacroReference {
    Numbered(u8),
    Named(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MacroMatch {
    pub offset: usize,
    pub len: usize,
    pub name: String,
    pub reference: Option<MacroReference>,
}

impl Matched for MacroMatch {
    fn offset(&self) -> usize {
        self.offset
    }
    fn len(&self) -> usize {
        self.len
    }
}

/// Matches `{NAME}` against a fixed allow-list of macro names, longest
/// name first.
#[derive(Debug, Clone)]
pub struct MacroParser {
    names: Vec<&'static str>,
    reference: ReferenceMode,
}

impl MacroParser {
    pub fn new(names: &[&'static str], reference: ReferenceMode) -> Self {
        let mut names = names.to_vec();
        names.sort_by_key(|n| std::cmp::Reverse(n.len()));
        Self { names, reference }
    }

    pub fn parse(&self, source: &str, pos: usize) -> Outcome<MacroMatch> {
        if byte_at(source, pos) != Some(b'{') {
            return Outcome::Fail(SyntaxError::incorrect(pos));
        }
        let rest = &source[pos + 1..];
        let Some(name) = self.names.iter().find(|n| rest.starts_with(**n)) else {
            return Outcome::Fail(SyntaxError::incorrect(pos));
        };
        let mut end = pos + 1 + name.len();

        let reference = match self.reference {
            ReferenceMode::None => None,
            ReferenceMode::Numbered => match byte_at(source, end) {
                Some(digit @ b'1'..=b'9') => {
                    end += 1;
                    Some(MacroReference::Numbered(digit - b'0'))
                }
                _ => None,
            },
            ReferenceMode::Named => match scan_named_reference(source, end) {
                Some((key, len)) => {
                    end += len;
                    Some(MacroReference::Named(key))
                }
                None => None,
            },
        };

        if byte_at(source, end) != Some(b'}') {
            return Outcome::Fail(SyntaxError::incorrect(pos));
        }
        Outcome::Complete(MacroMatch {
            offset: pos,
            len: end + 1 - pos,
            name: name.to_string(),
            reference,
        })
    }
}

/// `.key` or `."quoted key"` following a macro name.
fn scan_named_reference(source: &str, pos: usize) -> Option<(String, usize)> {
    if byte_at(source, pos) != Some(b'.') {
        return None;
    }
    if let Some(len) = quoted::scan(source, pos + 1, EscapeSet::Basic) {
        let raw = &source[pos + 1..pos + 1 + len];
        return Some((quoted::unquote(raw, EscapeSet::Basic), len + 1));
    }
    let mut len = 0;
    while byte_at(source, pos + 1 + len).is_some_and(|b| b.is_ascii_alphanumeric() || b == b'_') {
        len += 1;
    }
    if len == 0 {
        return None;
    }
    Some((source[pos + 1..pos + 1 + len].to_string(), len + 1))
}

/// Payload of a user macro after the optional colon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MacroContext {
    Value(String),
    Regex(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserMacroMatch {
    pub offset: usize,
    pub len: usize,
    pub name: String,
    pub context: Option<MacroContext>,
}

impl Matched for UserMacroMatch {
    fn offset(&self) -> usize {
        self.offset
    }
    fn len(&self) -> usize {
        self.len
    }
}

/// Matches `{$NAME}` and `{$NAME:context}` where the context may carry a
/// `regex:` prefix and may be quoted.
#[derive(Debug, Clone, Copy, Default)]
pub struct UserMacroParser;

impl UserMacroParser {
    pub fn new() -> Self {
        Self
    }

    pub fn parse(&self, source: &str, pos: usize) -> Outcome<UserMacroMatch> {
        if byte_at(source, pos) != Some(b'{') || byte_at(source, pos + 1) != Some(b'$') {
            return Outcome::Fail(SyntaxError::incorrect(pos));
        }
        let name_start = pos + 2;
        let mut end = name_start;
        while byte_at(source, end).is_some_and(is_macro_name_byte) {
            end += 1;
        }
        if end == name_start {
            return Outcome::Fail(SyntaxError::incorrect(pos));
        }
        let name = source[name_start..end].to_string();

        match byte_at(source, end) {
            Some(b'}') => Outcome::Complete(UserMacroMatch {
                offset: pos,
                len: end + 1 - pos,
                name,
                context: None,
            }),
            Some(b':') => match scan_context(source, end + 1) {
                Some((context, close)) => Outcome::Complete(UserMacroMatch {
                    offset: pos,
                    len: close + 1 - pos,
                    name,
                    context: Some(context),
                }),
                None => Outcome::Fail(SyntaxError::incorrect(pos)),
            },
            _ => Outcome::Fail(SyntaxError::incorrect(pos)),
        }
    }
}

/// Context portion after `{$NAME:`. Returns the payload and the offset of
/// the closing brace.
fn scan_context(source: &str, pos: usize) -> Option<(MacroContext, usize)> {
    let mut start = pos;
    while byte_at(source, start) == Some(b' ') {
        start += 1;
    }

    let regex = source[start..].starts_with("regex:");
    if regex {
        start += "regex:".len();
        while byte_at(source, start) == Some(b' ') {
            start += 1;
        }
    }

    let (value, mut end) = if let Some(len) = quoted::scan(source, start, EscapeSet::Basic) {
        let value = quoted::unquote(&source[start..start + len], EscapeSet::Basic);
        (value, start + len)
    } else {
        let mut end = start;
        while byte_at(source, end).is_some_and(|b| b != b'}') {
            end += 1;
        }
        (source[start..end].to_string(), end)
    };

    while byte_at(source, end) == Some(b' ') {
        end += 1;
    }
    if byte_at(source, end) != Some(b'}') {
        return None;
    }
    let context = if regex {
        MacroContext::Regex(value)
    } else {
        MacroContext::Value(value)
    };
    Some((context, end))
}

fn is_macro_name_byte(b: u8) -> bool {
    b.is_ascii_uppercase() || b.is_ascii_digit() || b == b'.' || b == b'_'
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LldMacroMatch {
    pub offset: usize,
    pub len: usize,
    pub name: String,
}

impl Matched for LldMacroMatch {
    fn offset(&self) -> usize {
        self.offset
    }
    fn len(&self) -> usize {
        self.len
    }
}

/// Matches `{#NAME}`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LldMacroParser;

impl LldMacroParser {
    pub fn new() -> Self {
        Self
    }

    pub fn parse(&self, source: &str, pos: usize) -> Outcome<LldMacroMatch> {
        if byte_at(source, pos) != Some(b'{') || byte_at(source, pos + 1) != Some(b'#') {
            return Outcome::Fail(SyntaxError::incorrect(pos));
        }
        let name_start = pos + 2;
        let mut end = name_start;
        while byte_at(source, end).is_some_and(is_macro_name_byte) {
            end += 1;
        }
        if end == name_start || byte_at(source, end) != Some(b'}') {
            return Outcome::Fail(SyntaxError::incorrect(pos));
        }
        Outcome::Complete(LldMacroMatch {
            offset: pos,
            len: end + 1 - pos,
            name: source[name_start..end].to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LldMacroFunctionMatch {
    pub offset: usize,
    pub len: usize,
    pub macro_name: String,
    pub function: FunctionMatch,
}

impl Matched for LldMacroFunctionMatch {
    fn offset(&self) -> usize {
        self.offset
    }
    fn len(&self) -> usize {
        self.len
    }
}

/// Matches `{{#NAME}.func(...)}`: an LLD macro wrapped together with a
/// transformation function call.
#[derive(Debug, Clone)]
pub struct LldMacroFunctionParser {
    lld: LldMacroParser,
    function: FunctionParser,
}

impl Default for LldMacroFunctionParser {
    fn default() -> Self {
        Self::new()
    }
}

impl LldMacroFunctionParser {
    pub fn new() -> Self {
        Self {
            lld: LldMacroParser::new(),
            function: FunctionParser::new(FunctionOptions::default()),
        }
    }

    pub fn parse(&self, source: &str, pos: usize) -> Outcome<LldMacroFunctionMatch> {
        if byte_at(source, pos) != Some(b'{') {
            return Outcome::Fail(SyntaxError::incorrect(pos));
        }
        let lld = match self.lld.parse(source, pos + 1) {
            Outcome::Complete(m) => m,
            _ => return Outcome::Fail(SyntaxError::incorrect(pos)),
        };
        let dot = lld.end();
        if byte_at(source, dot) != Some(b'.') {
            return Outcome::Fail(SyntaxError::incorrect(pos));
        }
        let function = match self.function.parse(source, dot + 1) {
            Outcome::Complete(m) => m,
            _ => return Outcome::Fail(SyntaxError::incorrect(pos)),
        };
        let close = function.end();
        if byte_at(source, close) != Some(b'}') {
            return Outcome::Fail(SyntaxError::incorrect(pos));
        }
        Outcome::Complete(LldMacroFunctionMatch {
            offset: pos,
            len: close + 1 - pos,
            macro_name: lld.name,
            function,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_generic_macro_allow_list() {
        let parser = MacroParser::new(&["TRIGGER.VALUE"], ReferenceMode::None);
        let m = parser.parse("{TRIGGER.VALUE}", 0).into_value().unwrap();
        assert_eq!(m.len, 15);
        assert_eq!(m.name, "TRIGGER.VALUE");
        assert_eq!(m.reference, None);

        assert!(parser.parse("{TRIGGER.STATUS}", 0).is_fail());
        assert!(parser.parse("{TRIGGER.VALUE", 0).is_fail());
        assert!(parser.parse("{TRIGGER.VALUE2}", 0).is_fail());
    }

    #[test]
    fn test_numbered_reference() {
        let parser = MacroParser::new(&["HOST.HOST"], ReferenceMode::Numbered);
        let m = parser.parse("{HOST.HOST2}", 0).into_value().unwrap();
        assert_eq!(m.reference, Some(MacroReference::Numbered(2)));

        let m = parser.parse("{HOST.HOST}", 0).into_value().unwrap();
        assert_eq!(m.reference, None);

        assert!(parser.parse("{HOST.HOST0}", 0).is_fail());
        assert!(parser.parse("{HOST.HOST10}", 0).is_fail());
    }

    #[test]
    fn test_named_reference() {
        let parser = MacroParser::new(&["ITEM.VALUE"], ReferenceMode::Named);
        let m = parser.parse("{ITEM.VALUE.key_1}", 0).into_value().unwrap();
        assert_eq!(m.reference, Some(MacroReference::Named("key_1".to_string())));

        let m = parser
            .parse(r#"{ITEM.VALUE."a \"b\""}"#, 0)
            .into_value()
            .unwrap();
        assert_eq!(m.reference, Some(MacroReference::Named("a \"b\"".to_string())));
    }

    #[test]
    fn test_user_macro_plain() {
        let parser = UserMacroParser::new();
        let m = parser.parse("{$MACRO}", 0).into_value().unwrap();
        assert_eq!(m.name, "MACRO");
        assert_eq!(m.context, None);
        assert_eq!(m.len, 8);

        assert!(parser.parse("{$}", 0).is_fail());
        assert!(parser.parse("{$lower}", 0).is_fail());
        assert!(parser.parse("{MACRO}", 0).is_fail());
    }

    #[test]
    fn test_user_macro_context() {
        let parser = UserMacroParser::new();
        let m = parser.parse("{$M:context}", 0).into_value().unwrap();
        assert_eq!(m.context, Some(MacroContext::Value("context".to_string())));

        let m = parser.parse(r#"{$M: "a,b"}"#, 0).into_value().unwrap();
        assert_eq!(m.context, Some(MacroContext::Value("a,b".to_string())));

        let m = parser.parse("{$M:}", 0).into_value().unwrap();
        assert_eq!(m.context, Some(MacroContext::Value(String::new())));
    }

    #[test]
    fn test_user_macro_regex_context() {
        let parser = UserMacroParser::new();
        let m = parser.parse("{$MACRO:regex:abc}", 0).into_value().unwrap();
        assert_eq!(m.name, "MACRO");
        assert_eq!(m.context, Some(MacroContext::Regex("abc".to_string())));

        let m = parser
            .parse(r#"{$M: regex: "^a{3}$"}"#, 0)
            .into_value()
            .unwrap();
        assert_eq!(m.context, Some(MacroContext::Regex("^a{3}$".to_string())));
    }

    #[test]
    fn test_lld_macro() {
        let parser = LldMacroParser::new();
        let m = parser.parse("{#FSNAME}", 0).into_value().unwrap();
        assert_eq!(m.name, "FSNAME");
        assert_eq!(m.len, 9);

        assert!(parser.parse("{#}", 0).is_fail());
        assert!(parser.parse("{#fsname}", 0).is_fail());
        assert!(parser.parse("{$FSNAME}", 0).is_fail());
    }

    #[test]
    fn test_lld_macro_function() {
        let parser = LldMacroFunctionParser::new();
        let source = r#"{{#M}.regsub("([0-9]+)", \1)}"#;
        let m = parser.parse(source, 0).into_value().unwrap();
        assert_eq!(m.len, source.len());
        assert_eq!(m.macro_name, "M");
        assert_eq!(m.function.name, "regsub");
        assert_eq!(m.function.parameters.len(), 2);

        assert!(parser.parse("{{#M}}", 0).is_fail());
        assert!(parser.parse("{{#M}.regsub(}", 0).is_fail());
    }

    #[test]
    fn test_offset_parsing() {
        let parser = UserMacroParser::new();
        let source = "1+{$M}";
        let m = parser.parse(source, 2).into_value().unwrap();
        assert_eq!(m.offset, 2);
        assert_eq!(m.text(source), "{$M}");
        assert_matches!(parser.parse(source, 0), Outcome::Fail(_));
    }
}
