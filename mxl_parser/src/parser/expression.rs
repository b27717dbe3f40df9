//! The expression engine: a state machine over constants, operators and
//! parentheses, with math-function arguments parsed by re-entering the
//! machine at an incremented depth.

use serde::{Deserialize, Serialize};

use crate::config::{ExpressionOptions, OptionsError};
use crate::parser::function::scan_function_id;
use crate::parser::histfunc::{HistFunctionMatch, HistFunctionParser, HistParamKind};
use crate::parser::legacy::LegacyFunctionParser;
use crate::parser::macros::{
    LldMacroFunctionParser, LldMacroParser, MacroParser, ReferenceMode, UserMacroParser,
};
use crate::parser::{ErrorKind, Matched, Outcome, SyntaxError};
use crate::scan::{quoted, EscapeSet, KeywordSet, NumberScanner};
use crate::tokens::{Argument, FunctionParam, ParamKind, Token, TokenData, TokenKind};
use crate::utils::{byte_at, skip_whitespace};

/// A parsed expression: the matched span and its ordered token stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpressionMatch {
    pub offset: usize,
    pub len: usize,
    pub tokens: Vec<Token>,
}

impl Matched for ExpressionMatch {
    fn offset(&self) -> usize {
        self.offset
    }
    fn len(&self) -> usize {
        self.len
    }
}

/// What the machine last consumed. The initial state behaves like an
/// open parenthesis was just seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    AfterOpenParen,
    AfterBinaryOp,
    AfterLogicalOp,
    AfterNot,
    AfterUnaryMinus,
    AfterCloseParen,
    AfterConstant,
}

impl State {
    fn is_terminal(self) -> bool {
        matches!(self, State::AfterConstant | State::AfterCloseParen)
    }
}

/// Raw result of one run of the machine, before a call site decides
/// between complete, partial and failed.
struct Scan {
    tokens: Vec<Token>,
    state: State,
    level: usize,
    /// Position and token count at the last point where the expression
    /// was complete at nesting level zero.
    checkpoint: Option<(usize, usize)>,
    /// Element start where scanning broke; end of input when it ran out.
    stop: usize,
    /// Deepest offset examined, including inside failed alternatives.
    progress: usize,
    /// Depth-limit violation; aborts the whole parse.
    fatal: Option<SyntaxError>,
}

/// Failure of one constant alternative.
struct ConstantFail {
    progress: usize,
    fatal: Option<SyntaxError>,
}

impl ConstantFail {
    fn at(progress: usize) -> Self {
        Self {
            progress,
            fatal: None,
        }
    }
}

pub struct ExpressionParser {
    options: ExpressionOptions,
    binary_ops: KeywordSet,
    logical_ops: KeywordSet,
    number: NumberScanner,
    trigger_macro: MacroParser,
    hist: HistFunctionParser,
    legacy: LegacyFunctionParser,
    user_macro: UserMacroParser,
    lld_macro: LldMacroParser,
    lld_function: LldMacroFunctionParser,
}

impl ExpressionParser {
    pub fn new(options: ExpressionOptions) -> Result<Self, OptionsError> {
        options.validate()?;
        let hist = HistFunctionParser::new(options.hist_function());
        let legacy = LegacyFunctionParser::new(options.allow_function_only);
        Ok(Self {
            options,
            binary_ops: KeywordSet::new(&[
                "<", ">", "<=", ">=", "+", "-", "/", "*", "=", "<>",
            ]),
            logical_ops: KeywordSet::new(&["and", "or"]),
            number: NumberScanner::new(),
            trigger_macro: MacroParser::new(&["TRIGGER.VALUE"], ReferenceMode::None),
            hist,
            legacy,
            user_macro: UserMacroParser::new(),
            lld_macro: LldMacroParser::new(),
            lld_function: LldMacroFunctionParser::new(),
        })
    }

    pub fn options(&self) -> &ExpressionOptions {
        &self.options
    }

    pub fn parse(&self, source: &str, pos: usize) -> Outcome<ExpressionMatch> {
        let scan = self.scan(source, pos, 0);
        if let Some(fatal) = scan.fatal {
            log_debug!(
                "expression parse aborted",
                "offset" => fatal.offset,
                "reason" => "recursion depth limit"
            );
            return Outcome::Fail(fatal);
        }

        let len = source.len();
        if scan.stop >= len && scan.level == 0 && scan.state.is_terminal() {
            if let Some((checkpoint_end, _)) = scan.checkpoint {
                let end = if self.options.trim_trailing_whitespace {
                    checkpoint_end
                } else {
                    len
                };
                return Outcome::Complete(ExpressionMatch {
                    offset: pos,
                    len: end - pos,
                    tokens: scan.tokens,
                });
            }
        }

        match scan.checkpoint {
            Some((checkpoint_end, token_count)) if checkpoint_end > pos => {
                let mut tokens = scan.tokens;
                tokens.truncate(token_count);
                let err = SyntaxError::new(ErrorKind::UnparsedContent, scan.stop);
                Outcome::Partial(
                    ExpressionMatch {
                        offset: pos,
                        len: checkpoint_end - pos,
                        tokens,
                    },
                    err,
                )
            }
            _ => {
                let err = if scan.level != 0 {
                    SyntaxError::new(ErrorKind::UnbalancedParens, pos)
                } else if scan.progress >= len {
                    SyntaxError::new(ErrorKind::UnexpectedEnding, len)
                } else {
                    SyntaxError::new(ErrorKind::UnparsedContent, scan.stop)
                };
                log_debug!(
                    "expression parse failed",
                    "offset" => err.offset,
                    "kind" => err.kind
                );
                Outcome::Fail(err)
            }
        }
    }

    fn scan(&self, source: &str, start: usize, depth: usize) -> Scan {
        let mut tokens: Vec<Token> = Vec::new();
        let mut state = State::AfterOpenParen;
        let mut level: usize = 0;
        let mut checkpoint: Option<(usize, usize)> = None;
        let mut progress = start;
        let mut pos = start;
        let len = source.len();

        loop {
            let element = skip_whitespace(source, pos);
            let after_space = element > pos;
            if element >= len {
                return Scan {
                    tokens,
                    state,
                    level,
                    checkpoint,
                    stop: len,
                    progress: progress.max(len),
                    fatal: None,
                };
            }
            let b = byte_at(source, element).unwrap_or(0);

            let stepped = match state {
                State::AfterOpenParen => match b {
                    b'(' => {
                        tokens.push(Token::new(TokenKind::OpenParen, element, 1));
                        level += 1;
                        pos = element + 1;
                        true
                    }
                    b'-' => {
                        tokens.push(Token::new(TokenKind::Operator, element, 1));
                        state = State::AfterUnaryMinus;
                        pos = element + 1;
                        true
                    }
                    _ => {
                        if self.not_keyword_at(source, element) {
                            tokens.push(Token::new(TokenKind::Operator, element, 3));
                            state = State::AfterNot;
                            pos = element + 3;
                            true
                        } else {
                            match self.try_constant(source, element, depth) {
                                Ok(token) => {
                                    pos = token.end();
                                    tokens.push(token);
                                    state = State::AfterConstant;
                                    true
                                }
                                Err(fail) => {
                                    if fail.fatal.is_some() {
                                        return Scan {
                                            tokens,
                                            state,
                                            level,
                                            checkpoint,
                                            stop: element,
                                            progress,
                                            fatal: fail.fatal,
                                        };
                                    }
                                    progress = progress.max(fail.progress);
                                    false
                                }
                            }
                        }
                    }
                },
                State::AfterUnaryMinus => match b {
                    b'(' => {
                        tokens.push(Token::new(TokenKind::OpenParen, element, 1));
                        level += 1;
                        state = State::AfterOpenParen;
                        pos = element + 1;
                        true
                    }
                    b'-' => false,
                    _ => match self.try_constant(source, element, depth) {
                        Ok(token) => {
                            pos = token.end();
                            tokens.push(token);
                            state = State::AfterConstant;
                            true
                        }
                        Err(fail) => {
                            if fail.fatal.is_some() {
                                return Scan {
                                    tokens,
                                    state,
                                    level,
                                    checkpoint,
                                    stop: element,
                                    progress,
                                    fatal: fail.fatal,
                                };
                            }
                            progress = progress.max(fail.progress);
                            false
                        }
                    },
                },
                State::AfterNot | State::AfterLogicalOp => match b {
                    b'(' => {
                        tokens.push(Token::new(TokenKind::OpenParen, element, 1));
                        level += 1;
                        state = State::AfterOpenParen;
                        pos = element + 1;
                        true
                    }
                    b'-' if after_space => {
                        tokens.push(Token::new(TokenKind::Operator, element, 1));
                        state = State::AfterUnaryMinus;
                        pos = element + 1;
                        true
                    }
                    _ if after_space => {
                        if state == State::AfterLogicalOp && self.not_keyword_at(source, element) {
                            tokens.push(Token::new(TokenKind::Operator, element, 3));
                            state = State::AfterNot;
                            pos = element + 3;
                            true
                        } else {
                            match self.try_constant(source, element, depth) {
                                Ok(token) => {
                                    pos = token.end();
                                    tokens.push(token);
                                    state = State::AfterConstant;
                                    true
                                }
                                Err(fail) => {
                                    if fail.fatal.is_some() {
                                        return Scan {
                                            tokens,
                                            state,
                                            level,
                                            checkpoint,
                                            stop: element,
                                            progress,
                                            fatal: fail.fatal,
                                        };
                                    }
                                    progress = progress.max(fail.progress);
                                    false
                                }
                            }
                        }
                    }
                    _ => false,
                },
                State::AfterBinaryOp => match b {
                    b'(' => {
                        tokens.push(Token::new(TokenKind::OpenParen, element, 1));
                        level += 1;
                        state = State::AfterOpenParen;
                        pos = element + 1;
                        true
                    }
                    b'-' => {
                        tokens.push(Token::new(TokenKind::Operator, element, 1));
                        state = State::AfterUnaryMinus;
                        pos = element + 1;
                        true
                    }
                    _ => {
                        if after_space && self.not_keyword_at(source, element) {
                            tokens.push(Token::new(TokenKind::Operator, element, 3));
                            state = State::AfterNot;
                            pos = element + 3;
                            true
                        } else {
                            match self.try_constant(source, element, depth) {
                                Ok(token) => {
                                    pos = token.end();
                                    tokens.push(token);
                                    state = State::AfterConstant;
                                    true
                                }
                                Err(fail) => {
                                    if fail.fatal.is_some() {
                                        return Scan {
                                            tokens,
                                            state,
                                            level,
                                            checkpoint,
                                            stop: element,
                                            progress,
                                            fatal: fail.fatal,
                                        };
                                    }
                                    progress = progress.max(fail.progress);
                                    false
                                }
                            }
                        }
                    }
                },
                State::AfterConstant | State::AfterCloseParen => {
                    if let Some(op) = self.binary_ops.scan(source, element) {
                        tokens.push(Token::new(TokenKind::Operator, element, op.len()));
                        state = State::AfterBinaryOp;
                        pos = element + op.len();
                        true
                    } else if let Some(op) =
                        self.logical_ops.scan(source, element).filter(|_| after_space)
                    {
                        tokens.push(Token::new(TokenKind::Operator, element, op.len()));
                        state = State::AfterLogicalOp;
                        pos = element + op.len();
                        true
                    } else if b == b')' && level > 0 {
                        tokens.push(Token::new(TokenKind::CloseParen, element, 1));
                        level -= 1;
                        state = State::AfterCloseParen;
                        pos = element + 1;
                        true
                    } else {
                        false
                    }
                }
            };

            if !stepped {
                return Scan {
                    tokens,
                    state,
                    level,
                    checkpoint,
                    stop: element,
                    progress: progress.max(element),
                    fatal: None,
                };
            }
            if level == 0 && state.is_terminal() {
                checkpoint = Some((pos, tokens.len()));
            }
        }
    }

    /// `not` used as an operator: the keyword must be delimited by
    /// whitespace, otherwise it is a math-function name.
    fn not_keyword_at(&self, source: &str, pos: usize) -> bool {
        source[pos..].starts_with("not")
            && matches!(
                byte_at(source, pos + 3),
                Some(b' ') | Some(b'\t') | Some(b'\r') | Some(b'\n')
            )
    }

    /// Constant alternatives in strict priority order; the first match
    /// wins and no later alternative is retried.
    fn try_constant(&self, source: &str, pos: usize, depth: usize) -> Result<Token, ConstantFail> {
        let mut progress = pos;

        if let Some(m) = self.number.scan(source, pos) {
            return Ok(Token::with_data(
                TokenKind::Number,
                pos,
                m.len,
                TokenData::Number {
                    suffix: m.suffix,
                    value: m.value,
                },
            ));
        }

        if let Some(len) = quoted::scan(source, pos, EscapeSet::Basic) {
            let value = quoted::unquote(&source[pos..pos + len], EscapeSet::Basic);
            return Ok(Token::with_data(
                TokenKind::String,
                pos,
                len,
                TokenData::String { value },
            ));
        }

        if !self.options.calculated {
            if let Outcome::Complete(m) = self.trigger_macro.parse(source, pos) {
                return Ok(Token::new(TokenKind::Macro, pos, m.len));
            }
        }

        if self.options.collapsed {
            if let Some((id, len)) = scan_function_id(source, pos) {
                return Ok(Token::with_data(
                    TokenKind::FunctionId,
                    pos,
                    len,
                    TokenData::FunctionId { id },
                ));
            }
        } else if self.options.legacy {
            if let Outcome::Complete(m) = self.legacy.parse(source, pos) {
                return Ok(legacy_token(m));
            }
        } else {
            match self.hist.parse(source, pos) {
                Outcome::Complete(m) => return Ok(hist_token(m)),
                Outcome::Fail(err) | Outcome::Partial(_, err) => {
                    progress = progress.max(err.offset);
                }
            }
            match self.try_math(source, pos, depth) {
                Ok(token) => return Ok(token),
                Err(fail) => {
                    if fail.fatal.is_some() {
                        return Err(fail);
                    }
                    progress = progress.max(fail.progress);
                }
            }
        }

        if self.options.user_macros {
            if let Outcome::Complete(m) = self.user_macro.parse(source, pos) {
                return Ok(Token::new(TokenKind::UserMacro, pos, m.len));
            }
        }
        if self.options.lld_macros {
            if let Outcome::Complete(m) = self.lld_macro.parse(source, pos) {
                return Ok(Token::new(TokenKind::LldMacro, pos, m.len));
            }
            if let Outcome::Complete(m) = self.lld_function.parse(source, pos) {
                return Ok(Token::new(TokenKind::LldMacro, pos, m.len));
            }
        }

        Err(ConstantFail::at(progress))
    }

    /// Math function: every argument is a full sub-expression parsed at
    /// `depth + 1`.
    fn try_math(&self, source: &str, pos: usize, depth: usize) -> Result<Token, ConstantFail> {
        let mut name_end = pos;
        while byte_at(source, name_end).is_some_and(|b| b.is_ascii_lowercase() || b == b'_') {
            name_end += 1;
        }
        if name_end == pos || byte_at(source, name_end) != Some(b'(') {
            return Err(ConstantFail::at(pos));
        }
        if depth >= self.options.max_depth {
            return Err(ConstantFail {
                progress: pos,
                fatal: Some(SyntaxError::incorrect(pos)),
            });
        }
        let name_len = name_end - pos;

        let mut arguments = Vec::new();
        let mut cur = name_end + 1;

        let first = skip_whitespace(source, cur);
        if byte_at(source, first) == Some(b')') {
            return Ok(Token::with_data(
                TokenKind::MathFunction,
                pos,
                first + 1 - pos,
                TokenData::MathFunction {
                    name_len,
                    arguments,
                },
            ));
        }

        loop {
            let sub = self.scan(source, cur, depth + 1);
            if sub.fatal.is_some() {
                return Err(ConstantFail {
                    progress: sub.progress,
                    fatal: sub.fatal,
                });
            }
            let Some((arg_end, token_count)) = sub.checkpoint else {
                return Err(ConstantFail::at(sub.progress));
            };
            let mut arg_tokens = sub.tokens;
            arg_tokens.truncate(token_count);
            arguments.push(Argument {
                offset: cur,
                len: arg_end - cur,
                tokens: arg_tokens,
            });

            let next = skip_whitespace(source, arg_end);
            match byte_at(source, next) {
                Some(b',') => cur = next + 1,
                Some(b')') => {
                    return Ok(Token::with_data(
                        TokenKind::MathFunction,
                        pos,
                        next + 1 - pos,
                        TokenData::MathFunction {
                            name_len,
                            arguments,
                        },
                    ))
                }
                _ => return Err(ConstantFail::at(sub.progress.max(next))),
            }
        }
    }
}

fn hist_token(m: HistFunctionMatch) -> Token {
    let name_len = m.name.len();
    let parameters = m
        .parameters
        .iter()
        .map(|p| FunctionParam {
            kind: match &p.kind {
                HistParamKind::Query(_) => ParamKind::Query,
                HistParamKind::Period(_) => ParamKind::Period,
                HistParamKind::Quoted => ParamKind::Quoted,
                HistParamKind::Unquoted => ParamKind::Unquoted,
            },
            offset: p.offset,
            len: p.len,
        })
        .collect();
    Token::with_data(
        TokenKind::HistFunction,
        m.offset,
        m.len,
        TokenData::HistFunction {
            name_len,
            parameters,
        },
    )
}

fn legacy_token(m: crate::parser::legacy::LegacyFunctionMatch) -> Token {
    Token::with_data(
        TokenKind::Function,
        m.offset,
        m.len,
        TokenData::Function {
            host: m.host,
            key: m.key,
            name: m.function.name,
        },
    )
}
