//! Core report model, cost model, text normalization and report export
//! for lecture slide fact checking.

pub mod cost;
pub mod document;
pub mod error;
pub mod export;
pub mod normalize;
pub mod suggest;
pub mod summary;
pub mod types;

pub use cost::{
    estimate_tokens, round_to, BatchEstimate, CostEstimate, CostModel, CostProjections,
    FileDescriptor, PricingProfile,
};
pub use document::{
    DocumentFormat, DocumentMetadata, DocumentProperties, DocumentReader, SlideImage, SlideRecord,
};
pub use error::{Error, Result};
pub use export::{ExportFormat, ReportExporter};
pub use normalize::SlideTextNormalizer;
pub use suggest::{ImprovementSuggestions, PriorityFix, SlideSuggestion, SuggestionAction};
pub use summary::{CostAnalysis, UsageRecord};
pub use types::{
    FactIssue, IssueKind, Report, Severity, SlideCheckResult, SlideStatus, StatementVerdict,
    TokenUsage, VerificationResult,
};
