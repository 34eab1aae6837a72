//! PPTX (Office Open XML) reader backend for slide fact checking.
//!
//! Parses .pptx files, which are ZIP archives containing XML parts, into
//! ordered slide records with normalized text and an optional picture.

pub mod parser;

pub use parser::PptxParser;
