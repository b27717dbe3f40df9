//! Compile-time limits and per-grammar option structs.

pub mod constants;
pub mod options;

pub use options::{
    ExpressionOptions, ExpressionOptionsBuilder, FilterOptions, FunctionOptions,
    HistFunctionOptions, OptionsError, QueryOptions,
};
