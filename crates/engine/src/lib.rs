//! Fact-check engine for lecture slides.
//!
//! Reads a deck through a [`DocumentReader`](slidecheck_core::DocumentReader),
//! asks an LLM about each slide in order and folds the replies into a
//! [`Report`](slidecheck_core::Report).
//!
//! # Example
//!
//! ```no_run
//! use slidecheck_engine::{CheckerConfig, FactCheckEngine, FileDocumentReader, GeminiClient, VerificationClient};
//! use std::path::Path;
//!
//! let client = GeminiClient::new(CheckerConfig::from_env()).unwrap();
//! let engine = FactCheckEngine::new(
//!     FileDocumentReader::new(),
//!     VerificationClient::from_config(client),
//! );
//! let report = engine.check_document(Path::new("lecture.pptx")).unwrap();
//! println!("{} issues", report.total_issues);
//! ```

pub mod cancel;
pub mod config;
pub mod engine;
pub mod llm;
pub mod quick;
pub mod reader;
pub mod reply;
pub mod verifier;

pub use cancel::CancelToken;
pub use config::CheckerConfig;
pub use engine::FactCheckEngine;
pub use llm::{GeminiClient, LlmClient, LlmError};
pub use quick::{
    extract_candidates, CandidateCheck, CandidateKind, FactCandidate, QuickCheckOutcome,
    QUICK_CHECK_LIMIT,
};
pub use reader::FileDocumentReader;
pub use verifier::{BatchOutcome, VerificationClient};
