//! Legacy PPT (OLE/CFB) reader backend for slide fact checking.
//!
//! Parses PowerPoint 97-2003 binary files by walking the record tree of the
//! `PowerPoint Document` stream.

pub mod parser;

pub use parser::PptParser;
