//! Historical-function resolver: `name(query, period, ...)` where the
//! first parameter is always a data query.

use serde::{Deserialize, Serialize};

use crate::config::options::HistFunctionOptions;
use crate::parser::macros::{LldMacroFunctionParser, LldMacroParser, UserMacroParser};
use crate::parser::period::{PeriodMatch, PeriodParser};
use crate::parser::query::{QueryMatch, QueryParser};
use crate::parser::{Matched, Outcome, SyntaxError};
use crate::scan::{quoted, EscapeSet, NumberScanner};
use crate::utils::{byte_at, skip_spaces};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum HistParamKind {
    Query(QueryMatch),
    Period(PeriodMatch),
    Quoted,
    /// Numeric literal or macro; an empty parameter has zero length.
    Unquoted,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistParameter {
    pub offset: usize,
    pub len: usize,
    pub kind: HistParamKind,
}

impl Matched for HistParameter {
    fn offset(&self) -> usize {
        self.offset
    }
    fn len(&self) -> usize {
        self.len
    }
}

impl HistParameter {
    /// Parameter value with quoting resolved. Quoted parameters
    /// additionally recognize `\n` besides `\"` and `\\`.
    pub fn value(&self, source: &str) -> String {
        match self.kind {
            HistParamKind::Quoted => quoted::unquote(self.text(source), EscapeSet::WithNewline),
            _ => self.text(source).to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistFunctionMatch {
    pub offset: usize,
    pub len: usize,
    pub name: String,
    pub parameters: Vec<HistParameter>,
}

impl Matched for HistFunctionMatch {
    fn offset(&self) -> usize {
        self.offset
    }
    fn len(&self) -> usize {
        self.len
    }
}

impl HistFunctionMatch {
    pub fn query(&self) -> Option<&QueryMatch> {
        match self.parameters.first() {
            Some(HistParameter {
                kind: HistParamKind::Query(query),
                ..
            }) => Some(query),
            _ => None,
        }
    }

    pub fn period(&self) -> Option<&PeriodMatch> {
        match self.parameters.get(1) {
            Some(HistParameter {
                kind: HistParamKind::Period(period),
                ..
            }) => Some(period),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HistFunctionParser {
    options: HistFunctionOptions,
    query: QueryParser,
    period: PeriodParser,
    number: NumberScanner,
    user_macro: UserMacroParser,
    lld_macro: LldMacroParser,
    lld_function: LldMacroFunctionParser,
}

impl HistFunctionParser {
    pub fn new(options: HistFunctionOptions) -> Self {
        let query = QueryParser::new(options.query.clone());
        Self {
            options,
            query,
            period: PeriodParser::new(),
            number: NumberScanner::new().with_sign(),
            user_macro: UserMacroParser::new(),
            lld_macro: LldMacroParser::new(),
            lld_function: LldMacroFunctionParser::new(),
        }
    }

    pub fn parse(&self, source: &str, pos: usize) -> Outcome<HistFunctionMatch> {
        let mut end = pos;
        while byte_at(source, end).is_some_and(|b| b.is_ascii_lowercase() || b == b'_') {
            end += 1;
        }
        if end == pos || byte_at(source, end) != Some(b'(') {
            return Outcome::Fail(SyntaxError::incorrect(pos));
        }
        let name = source[pos..end].to_string();
        end = skip_spaces(source, end + 1);

        // Only a query may open the parameter list.
        let query = match self.query.parse(source, end) {
            Outcome::Complete(query) => query,
            Outcome::Fail(err) | Outcome::Partial(_, err) => return Outcome::Fail(err),
        };
        let mut parameters = vec![HistParameter {
            offset: end,
            len: query.len,
            kind: HistParamKind::Query(query),
        }];
        end = skip_spaces(source, parameters[0].end());

        loop {
            match byte_at(source, end) {
                Some(b')') => {
                    return Outcome::Complete(HistFunctionMatch {
                        offset: pos,
                        len: end + 1 - pos,
                        name,
                        parameters,
                    })
                }
                Some(b',') => {
                    end = skip_spaces(source, end + 1);
                    let param = match self.parse_param(source, end, parameters.len()) {
                        Some(param) => param,
                        None => return Outcome::Fail(SyntaxError::incorrect(end)),
                    };
                    end = skip_spaces(source, param.end());
                    parameters.push(param);
                }
                _ => return Outcome::Fail(SyntaxError::incorrect(end)),
            }
        }
    }

    fn parse_param(&self, source: &str, pos: usize, index: usize) -> Option<HistParameter> {
        if matches!(byte_at(source, pos), Some(b',') | Some(b')')) {
            return Some(HistParameter {
                offset: pos,
                len: 0,
                kind: HistParamKind::Unquoted,
            });
        }

        if index == 1 {
            if let Outcome::Complete(period) = self.period.parse(source, pos) {
                if self.at_separator(source, period.end()) {
                    return Some(HistParameter {
                        offset: pos,
                        len: period.len,
                        kind: HistParamKind::Period(period),
                    });
                }
            }
        } else if let Some(m) = self.number.scan(source, pos) {
            if self.at_separator(source, pos + m.len) {
                return Some(HistParameter {
                    offset: pos,
                    len: m.len,
                    kind: HistParamKind::Unquoted,
                });
            }
        }

        if let Some(len) = quoted::scan(source, pos, EscapeSet::WithNewline) {
            if self.at_separator(source, pos + len) {
                return Some(HistParameter {
                    offset: pos,
                    len,
                    kind: HistParamKind::Quoted,
                });
            }
        }

        let macro_len = self.scan_macro(source, pos)?;
        if self.at_separator(source, pos + macro_len) {
            return Some(HistParameter {
                offset: pos,
                len: macro_len,
                kind: HistParamKind::Unquoted,
            });
        }
        None
    }

    fn scan_macro(&self, source: &str, pos: usize) -> Option<usize> {
        if self.options.user_macros {
            if let Outcome::Complete(m) = self.user_macro.parse(source, pos) {
                return Some(m.len);
            }
        }
        if self.options.lld_macros {
            if let Outcome::Complete(m) = self.lld_macro.parse(source, pos) {
                return Some(m.len);
            }
            if let Outcome::Complete(m) = self.lld_function.parse(source, pos) {
                return Some(m.len);
            }
        }
        None
    }

    /// Parameters must run all the way to a separator; a partial match of
    /// an alternative does not count.
    fn at_separator(&self, source: &str, pos: usize) -> bool {
        matches!(
            byte_at(source, skip_spaces(source, pos)),
            Some(b',') | Some(b')')
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::options::{FilterOptions, QueryOptions};
    use crate::parser::period::PeriodKind;

    fn options() -> HistFunctionOptions {
        HistFunctionOptions {
            query: QueryOptions {
                host_macro: false,
                host_macro_n: false,
                empty_host: false,
                wildcard_host: false,
                wildcard_item: false,
                lld_macros: false,
                filter: None,
            },
            user_macros: false,
            lld_macros: false,
        }
    }

    fn with_macros() -> HistFunctionOptions {
        HistFunctionOptions {
            user_macros: true,
            lld_macros: true,
            ..options()
        }
    }

    fn parse(source: &str) -> Outcome<HistFunctionMatch> {
        HistFunctionParser::new(options()).parse(source, 0)
    }

    #[test]
    fn test_query_only() {
        let source = "last(/host/key)";
        let m = parse(source).into_value().unwrap();
        assert_eq!(m.len, source.len());
        assert_eq!(m.name, "last");
        assert_eq!(m.parameters.len(), 1);
        assert!(m.query().is_some());
        assert!(m.period().is_none());
    }

    #[test]
    fn test_query_and_period() {
        let source = "avg(/host/key,5m)";
        let m = parse(source).into_value().unwrap();
        assert_eq!(m.len, source.len());
        let period = m.period().unwrap();
        assert_eq!(
            period.kind,
            PeriodKind::Duration {
                value: 5,
                unit: Some('m')
            }
        );
        assert_eq!(period.shift_len, 0);
    }

    #[test]
    fn test_period_with_shift() {
        let source = "trendavg(/host/key,1M:now/M)";
        let m = parse(source).into_value().unwrap();
        assert_eq!(m.len, source.len());
        assert!(m.period().unwrap().shift(source).is_some());
    }

    #[test]
    fn test_count_period_with_shift() {
        let source = "count(/host/key, #25:now/M, \"eq\", \"str\")";
        let m = parse(source).into_value().unwrap();
        assert_eq!(m.len, source.len());
        let period = m.period().unwrap();
        assert_eq!(period.kind, PeriodKind::LastValues(25));
        assert_eq!(period.shift(source), Some("now/M"));
    }

    #[test]
    fn test_query_is_mandatory() {
        assert!(parse("last()").is_fail());
        assert!(parse("last(5)").is_fail());
        assert!(parse("last(\"/host/key\")").is_fail());
    }

    #[test]
    fn test_later_parameters() {
        let source = "count(/host/key,1h,\"eq\",\"0\")";
        let m = parse(source).into_value().unwrap();
        assert_eq!(m.parameters.len(), 4);
        assert_eq!(m.parameters[2].kind, HistParamKind::Quoted);
        assert_eq!(m.parameters[2].value(source), "eq");
    }

    #[test]
    fn test_empty_parameters() {
        let source = "count(/host/key,1,)";
        let m = parse(source).into_value().unwrap();
        assert_eq!(m.parameters.len(), 3);
        assert_eq!(m.parameters[2].len, 0);
    }

    #[test]
    fn test_unquoted_must_be_numeric() {
        assert!(parse("find(/host/key,1h,abc)").is_fail());
        assert!(parse("find(/host/key,1h,-5)").is_complete());
        assert!(parse("find(/host/key,1h,2K)").is_complete());
    }

    #[test]
    fn test_fractional_period_rejected() {
        assert!(parse("avg(/host/key,1.5m)").is_fail());
    }

    #[test]
    fn test_macro_parameters_gated() {
        let source = "avg(/host/key,{$PERIOD})";
        assert!(parse(source).is_fail());
        assert!(HistFunctionParser::new(with_macros())
            .parse(source, 0)
            .is_complete());

        let lld = "count(/host/key,1h,{#C})";
        assert!(HistFunctionParser::new(with_macros())
            .parse(lld, 0)
            .is_complete());
    }

    #[test]
    fn test_only_plain_spaces_in_parameter_list() {
        assert!(parse("avg( /host/key , 5m )").is_complete());
        assert!(parse("avg(/host/key,\t5m)").is_fail());
        assert!(parse("avg(/host/key,\n5m)").is_fail());
    }

    #[test]
    fn test_quoted_newline_escape() {
        let source = r#"find(/host/key,1h,"like","a\nb")"#;
        let m = parse(source).into_value().unwrap();
        assert_eq!(m.parameters[3].value(source), "a\nb");
    }
}
