//! Semantic post-pass over an accepted token stream.
//!
//! The grammar accepts any well-formed function call; this pass checks the
//! names against the known function tables, enforces parameter-count
//! ranges, and restricts string constants to equality comparisons.

pub mod error;

use std::collections::HashMap;

use crate::logging::codes;
use crate::parser::expression::ExpressionMatch;
use crate::parser::Matched;
use crate::tokens::{Token, TokenKind};

pub use error::ValidationError;

/// Inclusive parameter-count range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Arity {
    min: usize,
    max: usize,
}

impl Arity {
    const fn fixed(n: usize) -> Self {
        Self { min: n, max: n }
    }

    const fn range(min: usize, max: usize) -> Self {
        Self { min, max }
    }

    const fn at_least(min: usize) -> Self {
        Self {
            min,
            max: usize::MAX,
        }
    }

    fn accepts(&self, count: usize) -> bool {
        self.min <= count && count <= self.max
    }
}

/// Historical functions with their parameter-count ranges. The leading
/// query counts as the first parameter.
const HIST_FUNCTIONS: &[(&str, Arity)] = &[
    ("avg", Arity::fixed(2)),
    ("band", Arity::fixed(3)),
    ("change", Arity::fixed(1)),
    ("changecount", Arity::range(2, 3)),
    ("count", Arity::range(2, 4)),
    ("countunique", Arity::range(2, 4)),
    ("find", Arity::range(2, 4)),
    ("first", Arity::fixed(2)),
    ("forecast", Arity::range(3, 5)),
    ("fuzzytime", Arity::fixed(2)),
    ("kurtosis", Arity::fixed(2)),
    ("last", Arity::range(1, 2)),
    ("logeventid", Arity::range(2, 3)),
    ("logseverity", Arity::fixed(1)),
    ("logsource", Arity::range(2, 3)),
    ("mad", Arity::fixed(2)),
    ("max", Arity::fixed(2)),
    ("min", Arity::fixed(2)),
    ("monodec", Arity::range(2, 3)),
    ("monoinc", Arity::range(2, 3)),
    ("nodata", Arity::fixed(2)),
    ("percentile", Arity::fixed(3)),
    ("rate", Arity::fixed(2)),
    ("skewness", Arity::fixed(2)),
    ("stddevpop", Arity::fixed(2)),
    ("stddevsamp", Arity::fixed(2)),
    ("sum", Arity::fixed(2)),
    ("sumofsquares", Arity::fixed(2)),
    ("timeleft", Arity::range(3, 4)),
    ("trendavg", Arity::fixed(2)),
    ("trendcount", Arity::fixed(2)),
    ("trendmax", Arity::fixed(2)),
    ("trendmin", Arity::fixed(2)),
    ("trendsum", Arity::fixed(2)),
    ("varpop", Arity::fixed(2)),
    ("varsamp", Arity::fixed(2)),
];

/// Math functions with their argument-count ranges.
const MATH_FUNCTIONS: &[(&str, Arity)] = &[
    ("abs", Arity::fixed(1)),
    ("acos", Arity::fixed(1)),
    ("asin", Arity::fixed(1)),
    ("atan", Arity::fixed(1)),
    ("atan2", Arity::fixed(2)),
    ("avg", Arity::at_least(1)),
    ("between", Arity::fixed(3)),
    ("bitand", Arity::fixed(2)),
    ("cbrt", Arity::fixed(1)),
    ("ceil", Arity::fixed(1)),
    ("cos", Arity::fixed(1)),
    ("cosh", Arity::fixed(1)),
    ("cot", Arity::fixed(1)),
    ("date", Arity::fixed(0)),
    ("dayofmonth", Arity::fixed(0)),
    ("dayofweek", Arity::fixed(0)),
    ("degrees", Arity::fixed(1)),
    ("e", Arity::fixed(0)),
    ("exp", Arity::fixed(1)),
    ("expm1", Arity::fixed(1)),
    ("floor", Arity::fixed(1)),
    ("in", Arity::at_least(2)),
    ("length", Arity::fixed(1)),
    ("log", Arity::fixed(1)),
    ("log10", Arity::fixed(1)),
    ("max", Arity::at_least(1)),
    ("min", Arity::at_least(1)),
    ("mod", Arity::fixed(2)),
    ("now", Arity::fixed(0)),
    ("pi", Arity::fixed(0)),
    ("power", Arity::fixed(2)),
    ("radians", Arity::fixed(1)),
    ("rand", Arity::fixed(0)),
    ("round", Arity::fixed(2)),
    ("signum", Arity::fixed(1)),
    ("sin", Arity::fixed(1)),
    ("sinh", Arity::fixed(1)),
    ("sqrt", Arity::fixed(1)),
    ("sum", Arity::at_least(1)),
    ("tan", Arity::fixed(1)),
    ("time", Arity::fixed(0)),
    ("truncate", Arity::fixed(2)),
];

pub struct ExpressionValidator {
    hist: HashMap<&'static str, Arity>,
    math: HashMap<&'static str, Arity>,
}

impl Default for ExpressionValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl ExpressionValidator {
    pub fn new() -> Self {
        Self {
            hist: HIST_FUNCTIONS.iter().copied().collect(),
            math: MATH_FUNCTIONS.iter().copied().collect(),
        }
    }

    /// Check every function call and string operand in an accepted match.
    /// The first offending token wins; its offset addresses the same source
    /// the match was parsed from.
    pub fn validate(&self, m: &ExpressionMatch, source: &str) -> Result<(), ValidationError> {
        let result = self.validate_tokens(&m.tokens, source, false);
        match &result {
            Ok(()) => {
                log_success!(
                    codes::success::VALIDATION_COMPLETE,
                    "token stream validated",
                    "tokens" => m.tokens.len()
                );
            }
            Err(err) => {
                log_error!(
                    err.code(),
                    &err.to_string(),
                    offset = err.offset()
                );
            }
        }
        result
    }

    /// `lone_string_ok` holds inside math-function arguments, where a bare
    /// string is a value rather than a comparison operand.
    fn validate_tokens(
        &self,
        tokens: &[Token],
        source: &str,
        lone_string_ok: bool,
    ) -> Result<(), ValidationError> {
        for (i, token) in tokens.iter().enumerate() {
            match token.kind {
                TokenKind::HistFunction => self.check_call(token, source, &self.hist)?,
                TokenKind::MathFunction => {
                    self.check_call(token, source, &self.math)?;
                    if let Some(arguments) = token.arguments() {
                        for argument in arguments {
                            let lone = argument.tokens.len() == 1;
                            self.validate_tokens(&argument.tokens, source, lone)?;
                        }
                    }
                }
                TokenKind::String => {
                    if lone_string_ok && tokens.len() == 1 {
                        continue;
                    }
                    if !is_equality_operand(tokens, i, source) {
                        return Err(ValidationError::StringOperand {
                            offset: token.offset,
                        });
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn check_call(
        &self,
        token: &Token,
        source: &str,
        table: &HashMap<&'static str, Arity>,
    ) -> Result<(), ValidationError> {
        let name = token.function_name(source).unwrap_or("");
        let Some(arity) = table.get(name) else {
            return Err(ValidationError::UnknownFunction {
                name: name.to_string(),
                offset: token.offset,
            });
        };

        let count = match token.kind {
            TokenKind::HistFunction => token.parameters().map_or(0, |p| p.len()),
            _ => token.arguments().map_or(0, |a| a.len()),
        };
        if !arity.accepts(count) {
            return Err(ValidationError::BadParameterCount {
                name: name.to_string(),
                offset: token.offset,
                actual: count,
            });
        }
        Ok(())
    }
}

/// A string constant is only valid directly beside an `=` or `<>` operator.
fn is_equality_operand(tokens: &[Token], i: usize, source: &str) -> bool {
    let beside = |token: &Token| {
        token.kind == TokenKind::Operator && matches!(token.text(source), "=" | "<>")
    };
    let before = i > 0 && beside(&tokens[i - 1]);
    let after = tokens.get(i + 1).is_some_and(beside);
    before || after
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExpressionOptions;
    use crate::parser::expression::ExpressionParser;

    fn parse(source: &str) -> ExpressionMatch {
        let parser =
            ExpressionParser::new(ExpressionOptions::trigger().build().unwrap()).unwrap();
        parser.parse(source, 0).into_value().unwrap()
    }

    fn validate(source: &str) -> Result<(), ValidationError> {
        ExpressionValidator::new().validate(&parse(source), source)
    }

    #[test]
    fn test_accepts_known_calls() {
        assert_eq!(validate("last(/host/key)=1"), Ok(()));
        assert_eq!(validate("avg(/host/key,5m)>10"), Ok(()));
        assert_eq!(validate("min(last(/host/key),2)<0"), Ok(()));
        assert_eq!(validate("now()>0"), Ok(()));
    }

    #[test]
    fn test_unknown_hist_function() {
        let err = validate("total(/host/key,5m)=1").unwrap_err();
        assert_eq!(
            err,
            ValidationError::UnknownFunction {
                name: "total".to_string(),
                offset: 0,
            }
        );
    }

    #[test]
    fn test_unknown_math_function() {
        let err = validate("frobnicate(1)=1").unwrap_err();
        assert_matches::assert_matches!(err, ValidationError::UnknownFunction { .. });
    }

    #[test]
    fn test_hist_parameter_count() {
        let err = validate("last(/host/key,#3,5)=1").unwrap_err();
        assert_eq!(
            err,
            ValidationError::BadParameterCount {
                name: "last".to_string(),
                offset: 0,
                actual: 3,
            }
        );

        assert_eq!(validate("count(/host/key,1h,\"eq\",\"5\")>0"), Ok(()));
    }

    #[test]
    fn test_math_argument_count() {
        let err = validate("power(2)=4").unwrap_err();
        assert_matches::assert_matches!(err, ValidationError::BadParameterCount { actual: 1, .. });

        assert_eq!(validate("power(2,2)=4"), Ok(()));
    }

    #[test]
    fn test_nested_arguments_checked() {
        let err = validate("min(power(2),1)=0").unwrap_err();
        assert_matches::assert_matches!(err, ValidationError::BadParameterCount { .. });
    }

    #[test]
    fn test_string_beside_equality_operators() {
        assert_eq!(validate("last(/host/key)=\"up\""), Ok(()));
        assert_eq!(validate("\"up\"<>last(/host/key)"), Ok(()));

        let err = validate("last(/host/key)+\"up\">1").unwrap_err();
        assert_eq!(err, ValidationError::StringOperand { offset: 16 });
        assert_eq!(err.offset(), 16);
    }

    #[test]
    fn test_lone_string_argument_allowed() {
        assert_eq!(validate("in(last(/host/key),\"a\",\"b\")=1"), Ok(()));
    }
}
