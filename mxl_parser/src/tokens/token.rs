//! Token stream model produced by the expression engine.

use serde::{Deserialize, Serialize};

use crate::parser::Matched;

/// Closed set of token classes a parsed expression is made of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenKind {
    OpenParen,
    CloseParen,
    /// Binary, logical or unary operator.
    Operator,
    Number,
    /// Double-quoted string literal.
    String,
    /// Collapsed function reference `{<id>}`.
    FunctionId,
    /// Built-in reference macro such as `{TRIGGER.VALUE}`.
    Macro,
    UserMacro,
    LldMacro,
    /// Legacy `{host:key.func()}` function macro.
    Function,
    HistFunction,
    MathFunction,
}

impl TokenKind {
    /// Token classes that occupy a constant slot in the expression
    /// grammar.
    pub fn is_constant(self) -> bool {
        matches!(
            self,
            TokenKind::Number
                | TokenKind::String
                | TokenKind::FunctionId
                | TokenKind::Macro
                | TokenKind::UserMacro
                | TokenKind::LldMacro
                | TokenKind::Function
                | TokenKind::HistFunction
                | TokenKind::MathFunction
        )
    }
}

/// Class of a single historical function parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParamKind {
    /// `/host/item` data reference, first parameter only.
    Query,
    /// Time period, optionally with a `:now/...` shift.
    Period,
    Quoted,
    Unquoted,
}

/// One parameter of a historical function. The span covers the raw
/// parameter text without surrounding separators or padding spaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionParam {
    pub kind: ParamKind,
    pub offset: usize,
    pub len: usize,
}

impl Matched for FunctionParam {
    fn offset(&self) -> usize {
        self.offset
    }
    fn len(&self) -> usize {
        self.len
    }
}

/// One argument of a math function: a full sub-expression with its own
/// token stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Argument {
    pub offset: usize,
    pub len: usize,
    pub tokens: Vec<Token>,
}

impl Matched for Argument {
    fn offset(&self) -> usize {
        self.offset
    }
    fn len(&self) -> usize {
        self.len
    }
}

/// Structured payload attached to tokens whose text alone is not enough
/// for later evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TokenData {
    Number {
        suffix: Option<char>,
        value: f64,
    },
    String {
        /// Unquoted, unescaped value.
        value: String,
    },
    FunctionId {
        id: u64,
    },
    Function {
        /// Host and key of the legacy reference; absent in
        /// function-without-host form.
        host: Option<String>,
        key: Option<String>,
        name: String,
    },
    HistFunction {
        /// Length of the function name, before the opening parenthesis.
        name_len: usize,
        parameters: Vec<FunctionParam>,
    },
    MathFunction {
        name_len: usize,
        arguments: Vec<Argument>,
    },
}

/// A single token. Owns no reference into the source text; the span is
/// resolved against the source through [`Matched::text`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub kind: TokenKind,
    pub offset: usize,
    pub len: usize,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub data: Option<TokenData>,
}

impl Token {
    pub fn new(kind: TokenKind, offset: usize, len: usize) -> Self {
        Self {
            kind,
            offset,
            len,
            data: None,
        }
    }

    pub fn with_data(kind: TokenKind, offset: usize, len: usize, data: TokenData) -> Self {
        Self {
            kind,
            offset,
            len,
            data: Some(data),
        }
    }

    pub fn is_constant(&self) -> bool {
        self.kind.is_constant()
    }

    /// Numeric value, after suffix multiplication, for number tokens.
    pub fn number_value(&self) -> Option<f64> {
        match &self.data {
            Some(TokenData::Number { value, .. }) => Some(*value),
            _ => None,
        }
    }

    /// Unescaped value for string tokens.
    pub fn string_value(&self) -> Option<&str> {
        match &self.data {
            Some(TokenData::String { value }) => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn function_id(&self) -> Option<u64> {
        match &self.data {
            Some(TokenData::FunctionId { id }) => Some(*id),
            _ => None,
        }
    }

    /// Function name for historical and math function tokens.
    pub fn function_name<'a>(&self, source: &'a str) -> Option<&'a str> {
        match &self.data {
            Some(TokenData::HistFunction { name_len, .. })
            | Some(TokenData::MathFunction { name_len, .. }) => {
                Some(&source[self.offset..self.offset + name_len])
            }
            _ => None,
        }
    }

    /// Parameters of a historical function token.
    pub fn parameters(&self) -> Option<&[FunctionParam]> {
        match &self.data {
            Some(TokenData::HistFunction { parameters, .. }) => Some(parameters),
            _ => None,
        }
    }

    /// Arguments of a math function token.
    pub fn arguments(&self) -> Option<&[Argument]> {
        match &self.data {
            Some(TokenData::MathFunction { arguments, .. }) => Some(arguments),
            _ => None,
        }
    }
}

impl Matched for Token {
    fn offset(&self) -> usize {
        self.offset
    }
    fn len(&self) -> usize {
        self.len
    }
}
