//! Legacy function-macro resolver: `{host:key.func(params)}`, the
//! pre-query way of calling a historical function. No whitespace is
//! allowed between the braces outside of quoted parameters.

use serde::{Deserialize, Serialize};

use crate::parser::function::{FunctionMatch, FunctionOptions, FunctionParser};
use crate::parser::key::KeyParser;
use crate::parser::{Matched, Outcome, SyntaxError};
use crate::utils::byte_at;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegacyFunctionMatch {
    pub offset: usize,
    pub len: usize,
    /// Absent in the function-without-host form `{func()}`.
    pub host: Option<String>,
    pub key: Option<String>,
    pub function: FunctionMatch,
}

impl Matched for LegacyFunctionMatch {
    fn offset(&self) -> usize {
        self.offset
    }
    fn len(&self) -> usize {
        self.len
    }
}

fn is_host_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b' ' || b == b'.' || b == b'_' || b == b'-'
}

#[derive(Debug, Clone)]
pub struct LegacyFunctionParser {
    allow_function_only: bool,
    key: KeyParser,
    function: FunctionParser,
}

impl LegacyFunctionParser {
    pub fn new(allow_function_only: bool) -> Self {
        Self {
            allow_function_only,
            key: KeyParser::new(),
            function: FunctionParser::new(FunctionOptions::default()),
        }
    }

    pub fn parse(&self, source: &str, pos: usize) -> Outcome<LegacyFunctionMatch> {
        if byte_at(source, pos) != Some(b'{') {
            return Outcome::Fail(SyntaxError::incorrect(pos));
        }

        if self.allow_function_only {
            if let Outcome::Complete(function) = self.function.parse(source, pos + 1) {
                let close = function.end();
                if byte_at(source, close) == Some(b'}') {
                    return Outcome::Complete(LegacyFunctionMatch {
                        offset: pos,
                        len: close + 1 - pos,
                        host: None,
                        key: None,
                        function,
                    });
                }
            }
        }

        let host_start = pos + 1;
        let mut colon = host_start;
        while byte_at(source, colon).is_some_and(is_host_name_byte) {
            colon += 1;
        }
        if colon == host_start || byte_at(source, colon) != Some(b':') {
            return Outcome::Fail(SyntaxError::incorrect(pos));
        }
        let host = source[host_start..colon].to_string();

        let key_start = colon + 1;
        let key_match = match self.key.parse(source, key_start) {
            Outcome::Complete(m) => m,
            _ => return Outcome::Fail(SyntaxError::incorrect(pos)),
        };

        // A bare key swallows the function name: "agent.ping.last(" scans
        // as one name run, so split it back at the last dot.
        let (key_end, function_start) = if key_match.name_len == key_match.len
            && byte_at(source, key_match.end()) == Some(b'(')
        {
            let name = &source[key_start..key_match.end()];
            let Some(dot) = name.rfind('.') else {
                return Outcome::Fail(SyntaxError::incorrect(pos));
            };
            (key_start + dot, key_start + dot + 1)
        } else {
            if byte_at(source, key_match.end()) != Some(b'.') {
                return Outcome::Fail(SyntaxError::incorrect(pos));
            }
            (key_match.end(), key_match.end() + 1)
        };
        if key_end == key_start {
            return Outcome::Fail(SyntaxError::incorrect(pos));
        }
        let key = source[key_start..key_end].to_string();

        let function = match self.function.parse(source, function_start) {
            Outcome::Complete(m) => m,
            _ => return Outcome::Fail(SyntaxError::incorrect(pos)),
        };
        let close = function.end();
        if byte_at(source, close) != Some(b'}') {
            return Outcome::Fail(SyntaxError::incorrect(pos));
        }

        Outcome::Complete(LegacyFunctionMatch {
            offset: pos,
            len: close + 1 - pos,
            host: Some(host),
            key: Some(key),
            function,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> Outcome<LegacyFunctionMatch> {
        LegacyFunctionParser::new(false).parse(source, 0)
    }

    #[test]
    fn test_bare_key() {
        let source = "{host:agent.ping.last(0)}";
        let m = parse(source).into_value().unwrap();
        assert_eq!(m.len, source.len());
        assert_eq!(m.host.as_deref(), Some("host"));
        assert_eq!(m.key.as_deref(), Some("agent.ping"));
        assert_eq!(m.function.name, "last");
    }

    #[test]
    fn test_key_with_parameters() {
        let source = "{Zabbix server:vfs.fs.size[/var,free].min(5m)}";
        let m = parse(source).into_value().unwrap();
        assert_eq!(m.len, source.len());
        assert_eq!(m.host.as_deref(), Some("Zabbix server"));
        assert_eq!(m.key.as_deref(), Some("vfs.fs.size[/var,free]"));
        assert_eq!(m.function.name, "min");
    }

    #[test]
    fn test_missing_parts() {
        assert!(parse("{host:key}").is_fail());
        assert!(parse("{host:last(0)}").is_fail());
        assert!(parse("{:key.last(0)}").is_fail());
        assert!(parse("{host:key.last(0)").is_fail());
        assert!(parse("host:key.last(0)}").is_fail());
    }

    #[test]
    fn test_function_only_gated() {
        let source = "{last(0)}";
        assert!(parse(source).is_fail());
        let m = LegacyFunctionParser::new(true)
            .parse(source, 0)
            .into_value()
            .unwrap();
        assert_eq!(m.host, None);
        assert_eq!(m.key, None);
        assert_eq!(m.function.name, "last");
    }

    #[test]
    fn test_no_whitespace_between_tokens() {
        assert!(parse("{\thost:key.last(0)}").is_fail());
        assert!(parse("{host\n:key.last(0)}").is_fail());
        assert!(parse("{host:\rkey.last(0)}").is_fail());
        assert!(parse("{host:key\t.last(0)}").is_fail());
        assert!(parse("{host: key.last(0)}").is_fail());
        assert!(parse("{host:key .last(0)}").is_fail());
    }
}
