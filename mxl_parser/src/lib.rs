// Internal modules
pub mod config;
#[macro_use]
pub mod logging;
pub mod parser;
pub mod scan;
pub mod tokens;
pub mod utils;
pub mod validation;

// Re-export key types for library consumers
pub use config::{ExpressionOptions, OptionsError};
pub use parser::expression::{ExpressionMatch, ExpressionParser};
pub use parser::{ErrorKind, Outcome, SyntaxError};
pub use tokens::{Token, TokenKind};
pub use validation::{ExpressionValidator, ValidationError};
