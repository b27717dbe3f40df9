//! Shared text utilities.

pub mod text;

pub use text::{byte_at, char_at, excerpt, skip_spaces, skip_whitespace};
