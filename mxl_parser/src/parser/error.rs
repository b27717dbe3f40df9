//! Position-carrying syntax errors with lazily rendered messages.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::logging::codes;
use crate::logging::Code;
use crate::utils::excerpt;

/// Failure condition classes, in fixed selection priority. When more than
/// one condition holds at once the smaller discriminant wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Error)]
pub enum ErrorKind {
    #[error("unbalanced parentheses")]
    UnbalancedParens,

    #[error("unexpected end of expression")]
    UnexpectedEnding,

    #[error("unparsed trailing content")]
    UnparsedContent,

    #[error("incorrect syntax")]
    Incorrect,
}

/// A syntax failure: only the kind and the failing byte offset are stored.
/// The human-readable message, with its bounded source excerpt, is built on
/// demand against the source the caller still owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyntaxError {
    pub kind: ErrorKind,
    pub offset: usize,
}

impl SyntaxError {
    pub fn new(kind: ErrorKind, offset: usize) -> Self {
        Self { kind, offset }
    }

    /// Generic "no alternative matched here" failure.
    pub fn incorrect(offset: usize) -> Self {
        Self::new(ErrorKind::Incorrect, offset)
    }

    /// Render the message against the source this error was produced from.
    pub fn message(&self, source: &str) -> String {
        match self.kind {
            ErrorKind::UnbalancedParens => {
                "expression contains unbalanced parentheses".to_string()
            }
            ErrorKind::UnexpectedEnding => "unexpected end of expression".to_string(),
            ErrorKind::UnparsedContent => format!(
                "incorrect expression starting from \"{}\"",
                excerpt(source, self.offset)
            ),
            ErrorKind::Incorrect => format!(
                "incorrect syntax near \"{}\"",
                excerpt(source, self.offset)
            ),
        }
    }

    /// Logging code for this failure class.
    pub fn code(&self) -> Code {
        match self.kind {
            ErrorKind::UnbalancedParens => codes::expression::UNBALANCED_PARENS,
            ErrorKind::UnexpectedEnding => codes::expression::UNEXPECTED_ENDING,
            ErrorKind::UnparsedContent => codes::expression::UNPARSED_CONTENT,
            ErrorKind::Incorrect => codes::expression::INCORRECT_SYNTAX,
        }
    }

    /// The higher-priority of two simultaneous failure conditions.
    pub fn prefer(self, other: SyntaxError) -> SyntaxError {
        if other.kind < self.kind {
            other
        } else {
            self
        }
    }
}
