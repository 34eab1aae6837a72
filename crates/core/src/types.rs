//! Domain types for fact-check results and consolidated reports.

use crate::document::DocumentMetadata;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Category of a factual problem found on a slide.
///
/// Values the verifier invents outside the known set deserialize to
/// [`IssueKind::Unrecognized`]; such issues are kept but not tallied.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    DateError,
    NumericalError,
    TechnicalClaim,
    CitationError,
    KnowledgeConsistency,
    #[default]
    #[serde(other)]
    Unrecognized,
}

impl IssueKind {
    /// All countable kinds, in report order.
    pub const KNOWN: [IssueKind; 5] = [
        IssueKind::DateError,
        IssueKind::NumericalError,
        IssueKind::TechnicalClaim,
        IssueKind::CitationError,
        IssueKind::KnowledgeConsistency,
    ];

    /// Parse a loosely formatted label ("Date Error", "date-error", "date_error").
    pub fn from_label(label: &str) -> Self {
        match normalize_label(label).as_str() {
            "date_error" => Self::DateError,
            "numerical_error" => Self::NumericalError,
            "technical_claim" => Self::TechnicalClaim,
            "citation_error" => Self::CitationError,
            "knowledge_consistency" => Self::KnowledgeConsistency,
            _ => Self::Unrecognized,
        }
    }

    /// Canonical snake_case label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DateError => "date_error",
            Self::NumericalError => "numerical_error",
            Self::TechnicalClaim => "technical_claim",
            Self::CitationError => "citation_error",
            Self::KnowledgeConsistency => "knowledge_consistency",
            Self::Unrecognized => "unrecognized",
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unrecognized)
    }
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How urgently an issue needs fixing.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    High,
    #[default]
    Medium,
    Low,
    #[serde(other)]
    Unrecognized,
}

impl Severity {
    /// All countable severities, most severe first.
    pub const KNOWN: [Severity; 3] = [Severity::High, Severity::Medium, Severity::Low];

    /// Parse a loosely formatted label ("HIGH", " medium ").
    pub fn from_label(label: &str) -> Self {
        match normalize_label(label).as_str() {
            "high" => Self::High,
            "medium" => Self::Medium,
            "low" => Self::Low,
            _ => Self::Unrecognized,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
            Self::Unrecognized => "unrecognized",
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unrecognized)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn normalize_label(label: &str) -> String {
    label
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| if c == ' ' || c == '-' { '_' } else { c })
        .collect()
}

/// A specific factual problem detected on a slide.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactIssue {
    pub kind: IssueKind,
    pub severity: Severity,
    /// The slide text the issue refers to.
    pub original_text: String,
    pub description: String,
    /// Corrected information, when the verifier knows it.
    pub correction: Option<String>,
    /// Verifier confidence, always within `[0, 1]`.
    pub confidence: f64,
    pub slide_index: u32,
}

impl FactIssue {
    /// Clamp a raw confidence into `[0, 1]`, mapping NaN to 0.5.
    pub fn clamp_confidence(raw: f64) -> f64 {
        if raw.is_nan() {
            0.5
        } else {
            raw.clamp(0.0, 1.0)
        }
    }
}

/// Outcome of checking one slide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlideStatus {
    /// Checked, nothing wrong found.
    Ok,
    /// Checked, at least one issue found.
    IssuesFound,
    /// The verifier replied but the reply was not usable.
    ParseError,
    /// The verifier could not be reached or refused the request.
    Error,
}

impl SlideStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::IssuesFound => "issues_found",
            Self::ParseError => "parse_error",
            Self::Error => "error",
        }
    }

    /// Whether the slide was actually evaluated.
    pub fn is_evaluated(&self) -> bool {
        matches!(self, Self::Ok | Self::IssuesFound)
    }
}

/// Approximate token usage and cost of one verifier call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    /// Advisory cost in USD, rounded to 6 places.
    pub estimated_cost: f64,
}

/// Result of checking a single slide.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlideCheckResult {
    pub slide_index: u32,
    pub status: SlideStatus,
    #[serde(default)]
    pub issues: Vec<FactIssue>,
    #[serde(default)]
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_usage: Option<TokenUsage>,
    /// Transport or provider failure description for `error` results.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Unparseable verifier reply for `parse_error` results.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<String>,
}

impl SlideCheckResult {
    /// A slide the verifier could not be asked about.
    pub fn error(slide_index: u32, message: impl Into<String>) -> Self {
        Self {
            slide_index,
            status: SlideStatus::Error,
            issues: Vec::new(),
            summary: String::new(),
            token_usage: None,
            error_message: Some(message.into()),
            raw_response: None,
        }
    }

    /// A slide whose verifier reply could not be decoded.
    pub fn parse_error(slide_index: u32, raw_response: impl Into<String>) -> Self {
        Self {
            slide_index,
            status: SlideStatus::ParseError,
            issues: Vec::new(),
            summary: "Response parsing failed".to_string(),
            token_usage: None,
            error_message: None,
            raw_response: Some(raw_response.into()),
        }
    }

    /// Cost of this slide's check, zero when no usage was recorded.
    pub fn cost(&self) -> f64 {
        self.token_usage.map(|u| u.estimated_cost).unwrap_or(0.0)
    }
}

/// The consolidated outcome of checking one document.
///
/// Counts are always derived from `results` by [`Report::from_results`], so
/// `total_issues` equals the number of issues across results and
/// `slides_with_issues` equals the number of `issues_found` results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub metadata: DocumentMetadata,
    pub total_slides: usize,
    pub slides_with_issues: usize,
    pub total_issues: usize,
    pub issues_by_kind: BTreeMap<IssueKind, usize>,
    pub issues_by_severity: BTreeMap<Severity, usize>,
    pub results: Vec<SlideCheckResult>,
    /// Sum of per-slide costs, rounded to 4 places.
    pub total_cost_estimate: f64,
    pub generated_at: DateTime<Utc>,
    /// True when the batch stopped early and `results` is a prefix.
    #[serde(default)]
    pub cancelled: bool,
}

impl Report {
    /// Aggregate per-slide results into a report.
    ///
    /// Issues with an unrecognized kind or severity count toward
    /// `total_issues` but are left out of the corresponding breakdown map.
    pub fn from_results(
        metadata: DocumentMetadata,
        results: Vec<SlideCheckResult>,
        total_cost_estimate: f64,
        generated_at: DateTime<Utc>,
    ) -> Self {
        let mut issues_by_kind: BTreeMap<IssueKind, usize> =
            IssueKind::KNOWN.iter().map(|k| (*k, 0)).collect();
        let mut issues_by_severity: BTreeMap<Severity, usize> =
            Severity::KNOWN.iter().map(|s| (*s, 0)).collect();
        let mut slides_with_issues = 0;
        let mut total_issues = 0;

        for result in &results {
            if result.status == SlideStatus::IssuesFound {
                slides_with_issues += 1;
            }
            for issue in &result.issues {
                total_issues += 1;
                if let Some(count) = issues_by_kind.get_mut(&issue.kind) {
                    *count += 1;
                }
                if let Some(count) = issues_by_severity.get_mut(&issue.severity) {
                    *count += 1;
                }
            }
        }

        Self {
            metadata,
            total_slides: results.len(),
            slides_with_issues,
            total_issues,
            issues_by_kind,
            issues_by_severity,
            results,
            total_cost_estimate,
            generated_at,
            cancelled: false,
        }
    }

    /// Mark the report as covering only the slides checked before cancellation.
    pub fn with_cancelled(mut self, cancelled: bool) -> Self {
        self.cancelled = cancelled;
        self
    }

    /// Count for one kind (zero when absent).
    pub fn kind_count(&self, kind: IssueKind) -> usize {
        self.issues_by_kind.get(&kind).copied().unwrap_or(0)
    }

    /// Count for one severity (zero when absent).
    pub fn severity_count(&self, severity: Severity) -> usize {
        self.issues_by_severity.get(&severity).copied().unwrap_or(0)
    }

    /// Number of results with the given status.
    pub fn status_count(&self, status: SlideStatus) -> usize {
        self.results.iter().filter(|r| r.status == status).count()
    }

    /// All issues in slide order.
    pub fn issues(&self) -> impl Iterator<Item = &FactIssue> {
        self.results.iter().flat_map(|r| r.issues.iter())
    }
}

/// The verifier's judgement on a single free-standing statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatementVerdict {
    pub fact_text: String,
    /// `None` when the verifier would not commit either way.
    pub is_correct: Option<bool>,
    pub confidence: f64,
    pub explanation: String,
    pub correction: Option<String>,
    pub sources: Vec<String>,
}

/// Outcome of a single-statement verification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum VerificationResult {
    Verified(StatementVerdict),
    ParseError { fact_text: String, raw_response: String },
    Error { fact_text: String, error_message: String },
}

impl VerificationResult {
    /// The statement that was checked.
    pub fn fact_text(&self) -> &str {
        match self {
            Self::Verified(verdict) => &verdict.fact_text,
            Self::ParseError { fact_text, .. } | Self::Error { fact_text, .. } => fact_text,
        }
    }

    pub fn verdict(&self) -> Option<&StatementVerdict> {
        match self {
            Self::Verified(verdict) => Some(verdict),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issue(slide: u32, kind: IssueKind, severity: Severity) -> FactIssue {
        FactIssue {
            kind,
            severity,
            original_text: "text".to_string(),
            description: "desc".to_string(),
            correction: None,
            confidence: 0.9,
            slide_index: slide,
        }
    }

    fn result(slide: u32, status: SlideStatus, issues: Vec<FactIssue>) -> SlideCheckResult {
        SlideCheckResult {
            slide_index: slide,
            status,
            issues,
            summary: String::new(),
            token_usage: None,
            error_message: None,
            raw_response: None,
        }
    }

    #[test]
    fn test_kind_from_label() {
        assert_eq!(IssueKind::from_label("date_error"), IssueKind::DateError);
        assert_eq!(IssueKind::from_label("Numerical Error"), IssueKind::NumericalError);
        assert_eq!(IssueKind::from_label("citation-error"), IssueKind::CitationError);
        assert_eq!(IssueKind::from_label("opinion"), IssueKind::Unrecognized);
    }

    #[test]
    fn test_severity_from_label() {
        assert_eq!(Severity::from_label("HIGH"), Severity::High);
        assert_eq!(Severity::from_label(" low "), Severity::Low);
        assert_eq!(Severity::from_label("critical"), Severity::Unrecognized);
    }

    #[test]
    fn test_unknown_labels_deserialize_to_unrecognized() {
        let kind: IssueKind = serde_json::from_str("\"speculation\"").unwrap();
        assert_eq!(kind, IssueKind::Unrecognized);
        let severity: Severity = serde_json::from_str("\"critical\"").unwrap();
        assert_eq!(severity, Severity::Unrecognized);
    }

    #[test]
    fn test_clamp_confidence() {
        assert_eq!(FactIssue::clamp_confidence(1.7), 1.0);
        assert_eq!(FactIssue::clamp_confidence(-0.2), 0.0);
        assert_eq!(FactIssue::clamp_confidence(0.42), 0.42);
        assert_eq!(FactIssue::clamp_confidence(f64::NAN), 0.5);
    }

    #[test]
    fn test_report_aggregation_invariants() {
        let results = vec![
            result(
                1,
                SlideStatus::IssuesFound,
                vec![
                    issue(1, IssueKind::DateError, Severity::High),
                    issue(1, IssueKind::NumericalError, Severity::Low),
                ],
            ),
            result(2, SlideStatus::Ok, vec![]),
            result(3, SlideStatus::IssuesFound, vec![issue(3, IssueKind::DateError, Severity::Medium)]),
            result(4, SlideStatus::Error, vec![]),
        ];
        let report = Report::from_results(DocumentMetadata::default(), results, 0.0, Utc::now());

        assert_eq!(report.total_slides, 4);
        assert_eq!(report.slides_with_issues, 2);
        assert_eq!(report.total_issues, 3);
        assert_eq!(report.kind_count(IssueKind::DateError), 2);
        assert_eq!(report.kind_count(IssueKind::NumericalError), 1);
        assert_eq!(report.kind_count(IssueKind::CitationError), 0);
        assert_eq!(report.issues_by_kind.values().sum::<usize>(), 3);
        assert_eq!(report.issues_by_severity.values().sum::<usize>(), 3);
        assert_eq!(report.issues_by_kind.len(), 5);
        assert_eq!(report.issues_by_severity.len(), 3);
    }

    #[test]
    fn test_unrecognized_issue_kept_but_not_tallied() {
        let results = vec![result(
            1,
            SlideStatus::IssuesFound,
            vec![
                issue(1, IssueKind::Unrecognized, Severity::High),
                issue(1, IssueKind::TechnicalClaim, Severity::Unrecognized),
            ],
        )];
        let report = Report::from_results(DocumentMetadata::default(), results, 0.0, Utc::now());

        assert_eq!(report.total_issues, 2);
        assert_eq!(report.results[0].issues.len(), 2);
        assert_eq!(report.issues_by_kind.values().sum::<usize>(), 1);
        assert_eq!(report.issues_by_severity.values().sum::<usize>(), 1);
        assert!(!report.issues_by_kind.contains_key(&IssueKind::Unrecognized));
    }

    #[test]
    fn test_report_json_round_trip_preserves_aggregates() {
        let results = vec![result(
            1,
            SlideStatus::IssuesFound,
            vec![issue(1, IssueKind::CitationError, Severity::Medium)],
        )];
        let report = Report::from_results(DocumentMetadata::default(), results, 0.0123, Utc::now());

        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"citation_error\":1"));
        let back: Report = serde_json::from_str(&json).unwrap();

        assert_eq!(back.total_issues, report.total_issues);
        assert_eq!(back.slides_with_issues, report.slides_with_issues);
        assert_eq!(back.issues_by_kind, report.issues_by_kind);
        assert_eq!(back.issues_by_severity, report.issues_by_severity);
        assert_eq!(back.total_cost_estimate, report.total_cost_estimate);
    }

    #[test]
    fn test_verification_result_tagging() {
        let result = VerificationResult::ParseError {
            fact_text: "claim".to_string(),
            raw_response: "??".to_string(),
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["status"], "parse_error");
        assert_eq!(result.fact_text(), "claim");
        assert!(result.verdict().is_none());
    }
}
