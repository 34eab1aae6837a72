//! PDF reader backend for slide fact checking.
//!
//! Treats every page of an exported lecture deck as one slide.

pub mod parser;

pub use parser::PdfParser;
