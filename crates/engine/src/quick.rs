//! Candidate fact extraction for quick checks.
//!
//! A heuristic triage over free text: year-like and numeric tokens are pulled
//! out with a bounded window of surrounding text so each can be verified as a
//! standalone statement.

use regex::Regex;
use serde::{Deserialize, Serialize};
use slidecheck_core::VerificationResult;
use std::collections::HashSet;
use std::sync::LazyLock;

/// Maximum number of candidates verified by one quick check.
pub const QUICK_CHECK_LIMIT: usize = 5;

/// Characters of context kept on each side of a candidate.
pub const CONTEXT_RADIUS: usize = 100;

/// A number with an optional percent, magnitude or year suffix.
static CANDIDATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?P<num>[0-9]+(?:\.[0-9]+)?)(?P<suffix>\s?[%％]|[KMBTG][Bb]?|[Bb]|年)?").unwrap()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CandidateKind {
    Year,
    Number,
}

/// A factual assertion worth verifying.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactCandidate {
    pub kind: CandidateKind,
    /// The matched token as written, e.g. `2017`, `175B`, `95%`.
    pub value: String,
    /// The token with up to [`CONTEXT_RADIUS`] characters on each side.
    pub context: String,
}

/// One verified candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateCheck {
    pub candidate: FactCandidate,
    pub result: VerificationResult,
}

/// Outcome of a quick check over a text snippet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuickCheckOutcome {
    pub text: String,
    pub facts_found: usize,
    pub facts_checked: usize,
    pub checks: Vec<CandidateCheck>,
}

/// Extract distinct candidates in order of first occurrence.
pub fn extract_candidates(text: &str) -> Vec<FactCandidate> {
    let mut seen = HashSet::new();
    let mut candidates = Vec::new();

    for caps in CANDIDATE_RE.captures_iter(text) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        if !standalone(text, whole.start(), whole.end()) {
            continue;
        }

        let value = whole.as_str().trim().to_string();
        if !seen.insert(value.clone()) {
            continue;
        }

        let number = caps.name("num").map(|m| m.as_str()).unwrap_or_default();
        let suffix = caps.name("suffix").map(|m| m.as_str());
        let kind = if is_year(number, suffix) {
            CandidateKind::Year
        } else {
            CandidateKind::Number
        };

        candidates.push(FactCandidate {
            kind,
            value,
            context: context_window(text, whole.start(), whole.end(), CONTEXT_RADIUS),
        });
    }

    candidates
}

/// Reject tokens glued to letters or digits, like `v2` or `abc123`.
fn standalone(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();
    let glued = |c: Option<char>| c.is_some_and(|c| c.is_ascii_alphanumeric());
    !glued(before) && !glued(after)
}

fn is_year(number: &str, suffix: Option<&str>) -> bool {
    number.len() == 4
        && (number.starts_with("19") || number.starts_with("20"))
        && matches!(suffix, None | Some("年"))
}

/// Slice `radius` characters on each side of `start..end`, marking cut ends
/// with an ellipsis.
fn context_window(text: &str, start: usize, end: usize, radius: usize) -> String {
    let boundaries: Vec<usize> = text[..start].char_indices().map(|(i, _)| i).collect();
    let from = if boundaries.len() > radius {
        boundaries[boundaries.len() - radius]
    } else {
        0
    };
    let to = text[end..]
        .char_indices()
        .nth(radius)
        .map(|(i, _)| end + i)
        .unwrap_or(text.len());

    let mut window = String::new();
    if from > 0 {
        window.push_str("...");
    }
    window.push_str(&text[from..to]);
    if to < text.len() {
        window.push_str("...");
    }
    window
}
