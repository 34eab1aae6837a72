//! Remediation suggestions derived from a report.

use crate::export::ReportExporter;
use crate::types::{IssueKind, Report, Severity};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Correction text used when the verifier offered none.
pub const NEEDS_VERIFICATION: &str = "needs verification";

/// How urgently a per-slide suggestion should be acted on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SuggestionAction {
    MustFix,
    Recommended,
}

/// A high-severity issue that should be fixed first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriorityFix {
    pub slide_index: u32,
    pub issue_text: String,
    pub severity: Severity,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlideSuggestion {
    /// The offending slide text.
    pub issue: String,
    pub correction: String,
    pub action: SuggestionAction,
    pub description: String,
}

/// Actionable output derived from a report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImprovementSuggestions {
    pub general_recommendations: Vec<String>,
    pub prioritized_fixes: Vec<PriorityFix>,
    pub per_slide_suggestions: BTreeMap<u32, Vec<SlideSuggestion>>,
}

/// Fixed recommendation emitted when at least one issue of `kind` exists.
pub fn recommendation_for(kind: IssueKind) -> Option<&'static str> {
    match kind {
        IssueKind::DateError => Some(
            "Double-check dates and years, especially when a technique was introduced or a paper was published.",
        ),
        IssueKind::NumericalError => Some(
            "Confirm numerical data such as parameter counts and benchmark scores against current sources.",
        ),
        IssueKind::TechnicalClaim => Some(
            "Review technical explanations against the primary literature and current understanding.",
        ),
        IssueKind::CitationError => Some(
            "State citations and references accurately and name the source explicitly.",
        ),
        IssueKind::KnowledgeConsistency => Some(
            "Check that slides agree with each other and with established knowledge in the field.",
        ),
        IssueKind::Unrecognized => None,
    }
}

impl ReportExporter {
    /// Derive general recommendations, prioritized fixes and per-slide suggestions.
    ///
    /// High-severity issues become prioritized fixes and must-fix suggestions,
    /// medium ones become recommended suggestions, and low ones produce nothing.
    pub fn suggest_improvements(&self, report: &Report) -> ImprovementSuggestions {
        let mut suggestions = ImprovementSuggestions::default();

        for kind in IssueKind::KNOWN {
            if report.kind_count(kind) > 0 {
                if let Some(text) = recommendation_for(kind) {
                    suggestions.general_recommendations.push(text.to_string());
                }
            }
        }

        for result in report.results.iter().filter(|r| !r.issues.is_empty()) {
            let mut slide_suggestions = Vec::new();

            for severity in [Severity::High, Severity::Medium] {
                for issue in result.issues.iter().filter(|i| i.severity == severity) {
                    let action = if severity == Severity::High {
                        suggestions.prioritized_fixes.push(PriorityFix {
                            slide_index: result.slide_index,
                            issue_text: issue.original_text.clone(),
                            severity,
                        });
                        SuggestionAction::MustFix
                    } else {
                        SuggestionAction::Recommended
                    };

                    slide_suggestions.push(SlideSuggestion {
                        issue: issue.original_text.clone(),
                        correction: issue
                            .correction
                            .clone()
                            .filter(|c| !c.trim().is_empty())
                            .unwrap_or_else(|| NEEDS_VERIFICATION.to_string()),
                        action,
                        description: issue.description.clone(),
                    });
                }
            }

            suggestions
                .per_slide_suggestions
                .insert(result.slide_index, slide_suggestions);
        }

        suggestions
    }
}
