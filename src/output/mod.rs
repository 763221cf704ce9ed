//! Console output formatting
//!
//! Renders suite results for the terminal in several formats.

mod formatter;

pub use formatter::{OutputFormat, ResultFormatter};
