//! Low-level scanners shared by the grammar components.

pub mod keyword;
pub mod number;
pub mod quoted;

pub use keyword::KeywordSet;
pub use number::{NumberMatch, NumberScanner};
pub use quoted::EscapeSet;
