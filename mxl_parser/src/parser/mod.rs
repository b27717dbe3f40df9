//! Parser layer: one module per grammar component, each exposing a pure
//! `parse(source, offset)` entry point that returns an [`Outcome`].

pub mod error;
pub mod expression;
pub mod filter;
pub mod function;
pub mod histfunc;
pub mod key;
pub mod legacy;
pub mod macros;
pub mod period;
pub mod query;

pub use error::{ErrorKind, SyntaxError};

/// Result of a parse attempt. A `Partial` outcome carries both a valid
/// match for a leading portion of the input and the error explaining why
/// scanning stopped where it did.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Fail(SyntaxError),
    Complete(T),
    Partial(T, SyntaxError),
}

impl<T> Outcome<T> {
    pub fn is_fail(&self) -> bool {
        matches!(self, Outcome::Fail(_))
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, Outcome::Complete(_))
    }

    pub fn is_partial(&self) -> bool {
        matches!(self, Outcome::Partial(_, _))
    }

    /// The match, if any portion of the input was accepted.
    pub fn value(&self) -> Option<&T> {
        match self {
            Outcome::Fail(_) => None,
            Outcome::Complete(value) | Outcome::Partial(value, _) => Some(value),
        }
    }

    pub fn into_value(self) -> Option<T> {
        match self {
            Outcome::Fail(_) => None,
            Outcome::Complete(value) | Outcome::Partial(value, _) => Some(value),
        }
    }

    /// The error, present for both failed and partial outcomes.
    pub fn error(&self) -> Option<&SyntaxError> {
        match self {
            Outcome::Fail(err) | Outcome::Partial(_, err) => Some(err),
            Outcome::Complete(_) => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Outcome::Fail(err) => Outcome::Fail(err),
            Outcome::Complete(value) => Outcome::Complete(f(value)),
            Outcome::Partial(value, err) => Outcome::Partial(f(value), err),
        }
    }
}

/// Implemented by every match type so callers can slice the matched text
/// back out of the source they passed in.
pub trait Matched {
    fn offset(&self) -> usize;
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn end(&self) -> usize {
        self.offset() + self.len()
    }

    fn text<'a>(&self, source: &'a str) -> &'a str {
        &source[self.offset()..self.end()]
    }
}
