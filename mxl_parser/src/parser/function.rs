//! Generic function-call resolver: `name(param, param, ...)` with
//! nested calls sharing one explicit depth counter.

use serde::{Deserialize, Serialize};

use crate::config::constants::compile_time;
use crate::parser::{Matched, Outcome, SyntaxError};
use crate::utils::byte_at;

pub use crate::config::options::FunctionOptions;

/// Class of a single function parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FunctionParamKind {
    Quoted,
    Unquoted,
    /// Nested function call, parsed with the shared depth counter.
    Function(Box<FunctionMatch>),
    /// Collapsed-mode `{<digits>}` reference.
    FunctionId(u64),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionParameter {
    pub offset: usize,
    pub len: usize,
    pub kind: FunctionParamKind,
}

impl Matched for FunctionParameter {
    fn offset(&self) -> usize {
        self.offset
    }
    fn len(&self) -> usize {
        self.len
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionMatch {
    pub offset: usize,
    pub len: usize,
    pub name: String,
    pub parameters: Vec<FunctionParameter>,
}

impl Matched for FunctionMatch {
    fn offset(&self) -> usize {
        self.offset
    }
    fn len(&self) -> usize {
        self.len
    }
}

impl FunctionMatch {
    /// Parameter value with old-style quoting resolved: surrounding quotes
    /// stripped and `\"` collapsed to `"`. Other parameter kinds are
    /// returned as raw text.
    pub fn parameter_value(&self, source: &str, index: usize) -> Option<String> {
        let param = self.parameters.get(index)?;
        match param.kind {
            FunctionParamKind::Quoted => Some(unquote_param(param.text(source))),
            _ => Some(param.text(source).to_string()),
        }
    }
}

/// Strip surrounding quotes and resolve the single `\"` escape. Old-style
/// parameters treat every other backslash as a literal character.
pub fn unquote_param(raw: &str) -> String {
    let inner = raw
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(raw);
    inner.replace("\\\"", "\"")
}

#[derive(Debug, Clone)]
pub struct FunctionParser {
    options: FunctionOptions,
}

enum ParamState {
    New,
    AfterParam,
    End,
}

impl FunctionParser {
    pub fn new(options: FunctionOptions) -> Self {
        Self { options }
    }

    pub fn parse(&self, source: &str, pos: usize) -> Outcome<FunctionMatch> {
        self.parse_at(source, pos, 0)
    }

    /// `depth` is the count of enclosing function calls; each nested call
    /// passes `depth + 1`. An over-deep call fails at its own offset.
    pub fn parse_at(&self, source: &str, pos: usize, depth: usize) -> Outcome<FunctionMatch> {
        if depth >= self.options.max_depth {
            return Outcome::Fail(SyntaxError::incorrect(pos));
        }

        let mut end = pos;
        while byte_at(source, end).is_some_and(|b| b.is_ascii_lowercase()) {
            end += 1;
        }
        if end == pos || byte_at(source, end) != Some(b'(') {
            return Outcome::Fail(SyntaxError::incorrect(pos));
        }
        let name = source[pos..end].to_string();
        end += 1;

        let mut parameters = Vec::new();
        let mut state = ParamState::New;
        loop {
            match state {
                ParamState::New => {
                    while byte_at(source, end) == Some(b' ') {
                        end += 1;
                    }
                    match byte_at(source, end) {
                        Some(b')') if parameters.is_empty() => {
                            end += 1;
                            state = ParamState::End;
                        }
                        Some(b')') | Some(b',') => {
                            // Empty parameter between separators.
                            parameters.push(FunctionParameter {
                                offset: end,
                                len: 0,
                                kind: FunctionParamKind::Unquoted,
                            });
                            state = ParamState::AfterParam;
                        }
                        Some(_) => {
                            let param = match self.parse_param(source, end, depth) {
                                Outcome::Complete(param) => param,
                                Outcome::Fail(err) | Outcome::Partial(_, err) => {
                                    return Outcome::Fail(err)
                                }
                            };
                            end = param.end();
                            parameters.push(param);
                            state = ParamState::AfterParam;
                        }
                        None => return Outcome::Fail(SyntaxError::incorrect(pos)),
                    }
                }
                ParamState::AfterParam => {
                    while byte_at(source, end) == Some(b' ') {
                        end += 1;
                    }
                    match byte_at(source, end) {
                        Some(b',') => {
                            end += 1;
                            state = ParamState::New;
                        }
                        Some(b')') => {
                            end += 1;
                            state = ParamState::End;
                        }
                        _ => return Outcome::Fail(SyntaxError::incorrect(pos)),
                    }
                }
                ParamState::End => {
                    return Outcome::Complete(FunctionMatch {
                        offset: pos,
                        len: end - pos,
                        name,
                        parameters,
                    })
                }
            }
        }
    }

    fn parse_param(&self, source: &str, pos: usize, depth: usize) -> Outcome<FunctionParameter> {
        if byte_at(source, pos) == Some(b'"') {
            return match scan_quoted_param(source, pos) {
                Some(len) => Outcome::Complete(FunctionParameter {
                    offset: pos,
                    len,
                    kind: FunctionParamKind::Quoted,
                }),
                None => Outcome::Fail(SyntaxError::incorrect(pos)),
            };
        }

        if call_starts_at(source, pos) {
            // A parameter that opens another call must not degrade into an
            // unquoted run when the nesting limit is hit.
            if depth + 1 >= self.options.max_depth {
                return Outcome::Fail(SyntaxError::incorrect(pos));
            }
            if let Outcome::Complete(nested) = self.parse_at(source, pos, depth + 1) {
                let len = nested.len;
                return Outcome::Complete(FunctionParameter {
                    offset: pos,
                    len,
                    kind: FunctionParamKind::Function(Box::new(nested)),
                });
            }
        }

        if self.options.collapsed {
            if let Some((id, len)) = scan_function_id(source, pos) {
                return Outcome::Complete(FunctionParameter {
                    offset: pos,
                    len,
                    kind: FunctionParamKind::FunctionId(id),
                });
            }
        }

        let mut end = pos;
        while byte_at(source, end).is_some_and(|b| b != b',' && b != b')') {
            end += 1;
        }
        if byte_at(source, end).is_none() {
            return Outcome::Fail(SyntaxError::incorrect(pos));
        }
        while end > pos && byte_at(source, end - 1) == Some(b' ') {
            end -= 1;
        }
        Outcome::Complete(FunctionParameter {
            offset: pos,
            len: end - pos,
            kind: FunctionParamKind::Unquoted,
        })
    }
}

/// A lowercase name immediately followed by `(` opens a nested call.
fn call_starts_at(source: &str, pos: usize) -> bool {
    let mut end = pos;
    while byte_at(source, end).is_some_and(|b| b.is_ascii_lowercase()) {
        end += 1;
    }
    end > pos && byte_at(source, end) == Some(b'(')
}

/// Quoted parameter: ends at the first `"` not preceded by a backslash.
fn scan_quoted_param(source: &str, pos: usize) -> Option<usize> {
    let mut len = 1;
    loop {
        match byte_at(source, pos + len)? {
            b'\\' if byte_at(source, pos + len + 1) == Some(b'"') => len += 2,
            b'"' => return Some(len + 1),
            _ => {
                let c = source[pos + len..].chars().next()?;
                len += c.len_utf8();
            }
        }
    }
}

/// `{<digits>}` reference, bounded to the configured maximum id.
pub fn scan_function_id(source: &str, pos: usize) -> Option<(u64, usize)> {
    if byte_at(source, pos) != Some(b'{') {
        return None;
    }
    let mut len = 1;
    while byte_at(source, pos + len).is_some_and(|b| b.is_ascii_digit()) {
        len += 1;
    }
    if len == 1 || byte_at(source, pos + len) != Some(b'}') {
        return None;
    }
    let id: u64 = source[pos + 1..pos + len].parse().ok()?;
    if id > compile_time::function::MAX_FUNCTION_ID {
        return None;
    }
    Some((id, len + 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> FunctionParser {
        FunctionParser::new(FunctionOptions::default())
    }

    #[test]
    fn test_no_parameters() {
        let m = parser().parse("now()", 0).into_value().unwrap();
        assert_eq!(m.name, "now");
        assert_eq!(m.len, 5);
        assert!(m.parameters.is_empty());
    }

    #[test]
    fn test_unquoted_parameters() {
        let source = "regsub(^[0-9]+, \\1)";
        let m = parser().parse(source, 0).into_value().unwrap();
        assert_eq!(m.parameters.len(), 2);
        assert_eq!(m.parameters[0].text(source), "^[0-9]+");
        assert_eq!(m.parameters[1].text(source), "\\1");
    }

    #[test]
    fn test_quoted_parameter() {
        let source = r#"regsub("a, \"b\"", out)"#;
        let m = parser().parse(source, 0).into_value().unwrap();
        assert_eq!(m.parameters[0].kind, FunctionParamKind::Quoted);
        assert_eq!(
            m.parameter_value(source, 0),
            Some("a, \"b\"".to_string())
        );
    }

    #[test]
    fn test_empty_parameters() {
        let m = parser().parse("last(0,)", 0).into_value().unwrap();
        assert_eq!(m.parameters.len(), 2);
        assert_eq!(m.parameters[1].len, 0);
    }

    #[test]
    fn test_nested_function() {
        let source = "min(max(a, b), c)";
        let m = parser().parse(source, 0).into_value().unwrap();
        assert_eq!(m.parameters.len(), 2);
        match &m.parameters[0].kind {
            FunctionParamKind::Function(inner) => {
                assert_eq!(inner.name, "max");
                assert_eq!(inner.parameters.len(), 2);
            }
            other => panic!("expected nested function, got {:?}", other),
        }
    }

    #[test]
    fn test_depth_bound() {
        let deep = FunctionParser::new(FunctionOptions {
            collapsed: false,
            max_depth: 3,
        });
        assert!(deep.parse("a(b(c(1)))", 0).is_complete());
        assert!(deep.parse("a(b(c(d(1))))", 0).is_fail());
        // The over-deep call must not be swallowed as unquoted text.
        assert!(deep.parse("a(b(c(d(1), 2)))", 0).is_fail());
    }

    #[test]
    fn test_rejects_malformed() {
        let p = parser();
        assert!(p.parse("func", 0).is_fail());
        assert!(p.parse("func(", 0).is_fail());
        assert!(p.parse("func(\"abc", 0).is_fail());
        assert!(p.parse("FUNC(1)", 0).is_fail());
        assert!(p.parse("(1)", 0).is_fail());
    }

    #[test]
    fn test_function_id_parameter() {
        let collapsed = FunctionParser::new(FunctionOptions {
            collapsed: true,
            max_depth: 32,
        });
        let source = "min({123}, 1)";
        let m = collapsed.parse(source, 0).into_value().unwrap();
        assert_eq!(m.parameters[0].kind, FunctionParamKind::FunctionId(123));

        // Without collapsed mode the reference is just an unquoted run.
        let m = parser().parse(source, 0).into_value().unwrap();
        assert_eq!(m.parameters[0].kind, FunctionParamKind::Unquoted);
    }

    #[test]
    fn test_scan_function_id_bounds() {
        assert_eq!(scan_function_id("{1}", 0), Some((1, 3)));
        assert_eq!(scan_function_id("{9223372036854775807}", 0).map(|r| r.0), Some(i64::MAX as u64));
        assert_eq!(scan_function_id("{9223372036854775808}", 0), None);
        assert_eq!(scan_function_id("{}", 0), None);
        assert_eq!(scan_function_id("{12a}", 0), None);
    }
}
