//! Semantic failures found after a successful parse.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::logging::codes;
use crate::logging::Code;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
pub enum ValidationError {
    #[error("unknown function \"{name}\"")]
    UnknownFunction { name: String, offset: usize },

    #[error("invalid number of parameters in function \"{name}\"")]
    BadParameterCount {
        name: String,
        offset: usize,
        actual: usize,
    },

    #[error("string constant can only be compared with = or <> operators")]
    StringOperand { offset: usize },
}

impl ValidationError {
    /// Byte offset of the offending token.
    pub fn offset(&self) -> usize {
        match self {
            Self::UnknownFunction { offset, .. }
            | Self::BadParameterCount { offset, .. }
            | Self::StringOperand { offset } => *offset,
        }
    }

    /// Logging code for this failure class.
    pub fn code(&self) -> Code {
        match self {
            Self::UnknownFunction { .. } => codes::validation::UNKNOWN_FUNCTION,
            Self::BadParameterCount { .. } => codes::validation::BAD_PARAMETER_COUNT,
            Self::StringOperand { .. } => codes::validation::STRING_COMPARISON,
        }
    }
}
