//! Token model for parsed expressions.

pub mod token;

pub use token::{Argument, FunctionParam, ParamKind, Token, TokenData, TokenKind};
