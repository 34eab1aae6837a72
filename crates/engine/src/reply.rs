//! Decoding of verifier replies.
//!
//! Replies are free-form text expected to contain one JSON object, possibly
//! inside a fenced code block or surrounded by prose. Decoding tries the fenced
//! body, then the whole trimmed reply, then the outermost `{ ... }` span.
//! Every field is optional on the wire; defaults are filled in here so the rest
//! of the engine only sees complete values.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use slidecheck_core::{FactIssue, IssueKind, Severity, StatementVerdict};

/// Confidence used when the reply omits one or gives something unusable.
pub const DEFAULT_CONFIDENCE: f64 = 0.5;

/// Decode the first JSON object found in a reply.
pub fn decode_reply<T: DeserializeOwned>(raw: &str) -> Option<T> {
    let mut candidates: Vec<&str> = Vec::with_capacity(3);
    if let Some(fenced) = fenced_body(raw) {
        candidates.push(fenced);
    }
    candidates.push(raw.trim());
    if let Some(span) = outermost_object(raw) {
        candidates.push(span);
    }

    // Structs also deserialize from arrays, so require an object first.
    candidates
        .into_iter()
        .find_map(|candidate| match serde_json::from_str::<Value>(candidate) {
            Ok(value @ Value::Object(_)) => serde_json::from_value(value).ok(),
            _ => None,
        })
}

/// Body of the first fenced code block, preferring a block tagged `json`.
fn fenced_body(raw: &str) -> Option<&str> {
    let open = raw.find("```json").or_else(|| raw.find("```"))?;
    let after_ticks = &raw[open + 3..];
    // Skip the language tag, if any, up to the end of the fence line.
    let body_start = match after_ticks.find('\n') {
        Some(newline) if after_ticks[..newline].trim().chars().all(|c| c.is_alphanumeric()) => {
            newline + 1
        }
        _ => after_ticks
            .find(|c: char| !c.is_alphanumeric())
            .unwrap_or(after_ticks.len()),
    };
    let body = &after_ticks[body_start..];
    let end = body.find("```").unwrap_or(body.len());
    Some(body[..end].trim())
}

fn outermost_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (end > start).then(|| &raw[start..=end])
}

/// Wire shape of a slide check reply.
#[derive(Debug, Default, Deserialize)]
pub struct SlideReply {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub issues: Option<Vec<IssueReply>>,
    #[serde(default)]
    pub summary: Option<String>,
}

/// Wire shape of one issue. Field names follow the prompt; common variants
/// are accepted as aliases.
#[derive(Debug, Default, Deserialize)]
pub struct IssueReply {
    #[serde(default, rename = "type", alias = "kind")]
    pub kind: Option<String>,
    #[serde(default)]
    pub severity: Option<String>,
    #[serde(default)]
    pub original_text: Option<String>,
    #[serde(default, rename = "issue_description", alias = "description")]
    pub description: Option<String>,
    #[serde(default, rename = "correct_information", alias = "correction")]
    pub correction: Option<String>,
    #[serde(default)]
    pub confidence: Option<Value>,
}

impl SlideReply {
    /// Convert into issues attributed to `slide_index`, filling defaults.
    pub fn into_issues(self, slide_index: u32) -> Vec<FactIssue> {
        self.issues
            .unwrap_or_default()
            .into_iter()
            .map(|issue| issue.into_issue(slide_index))
            .collect()
    }
}

impl IssueReply {
    fn into_issue(self, slide_index: u32) -> FactIssue {
        FactIssue {
            kind: IssueKind::from_label(self.kind.as_deref().unwrap_or_default()),
            severity: self
                .severity
                .as_deref()
                .map(Severity::from_label)
                .unwrap_or_default(),
            original_text: self.original_text.unwrap_or_default(),
            description: self.description.unwrap_or_default(),
            correction: non_blank(self.correction),
            confidence: confidence_value(self.confidence.as_ref()),
            slide_index,
        }
    }
}

/// Wire shape of a single-statement reply.
#[derive(Debug, Default, Deserialize)]
pub struct StatementReply {
    #[serde(default)]
    pub is_correct: Option<Value>,
    #[serde(default)]
    pub confidence: Option<Value>,
    #[serde(default)]
    pub explanation: Option<String>,
    #[serde(default, rename = "correct_information", alias = "correction")]
    pub correction: Option<String>,
    #[serde(default)]
    pub sources: Option<Vec<Value>>,
}

impl StatementReply {
    /// Convert into a verdict about `fact_text`, filling defaults.
    pub fn into_verdict(self, fact_text: &str) -> StatementVerdict {
        let is_correct = match self.is_correct {
            Some(Value::Bool(b)) => Some(b),
            Some(Value::String(s)) => match s.trim().to_lowercase().as_str() {
                "true" | "yes" => Some(true),
                "false" | "no" => Some(false),
                _ => None,
            },
            _ => None,
        };

        let sources = self
            .sources
            .unwrap_or_default()
            .into_iter()
            .map(|source| match source {
                Value::String(s) => s,
                other => other.to_string(),
            })
            .filter(|s| !s.trim().is_empty())
            .collect();

        StatementVerdict {
            fact_text: fact_text.to_string(),
            is_correct,
            confidence: confidence_value(self.confidence.as_ref()),
            explanation: self.explanation.unwrap_or_default(),
            correction: non_blank(self.correction),
            sources,
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Read a confidence given as a number or numeric string, clamped into `[0, 1]`.
fn confidence_value(value: Option<&Value>) -> f64 {
    let raw = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    };
    FactIssue::clamp_confidence(raw.unwrap_or(DEFAULT_CONFIDENCE))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ISSUE_JSON: &str = r#"{"slide_number": 1, "status": "issues_found", "issues": [{"type": "date_error", "severity": "high", "original_text": "Transformer was invented in 2015", "issue_description": "Published in 2017", "correct_information": "2017", "confidence": 0.95}], "summary": "One date problem"}"#;

    #[test]
    fn test_fenced_reply() {
        let raw = format!("Here is my analysis:\n```json\n{}\n```\nThanks!", ISSUE_JSON);
        let reply: SlideReply = decode_reply(&raw).unwrap();
        assert_eq!(reply.summary.as_deref(), Some("One date problem"));

        let issues = reply.into_issues(1);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].kind, IssueKind::DateError);
        assert_eq!(issues[0].severity, Severity::High);
        assert_eq!(issues[0].correction.as_deref(), Some("2017"));
        assert_eq!(issues[0].confidence, 0.95);
        assert_eq!(issues[0].slide_index, 1);
    }

    #[test]
    fn test_untagged_fence_and_bare_reply() {
        let raw = format!("```\n{}\n```", ISSUE_JSON);
        assert!(decode_reply::<SlideReply>(&raw).is_some());

        let bare = format!("  {}  ", ISSUE_JSON);
        assert!(decode_reply::<SlideReply>(&bare).is_some());
    }

    #[test]
    fn test_prose_around_object() {
        let raw = r#"Sure. {"status": "ok", "issues": [], "summary": "Fine"} Hope this helps."#;
        let reply: SlideReply = decode_reply(raw).unwrap();
        assert_eq!(reply.status.as_deref(), Some("ok"));
        assert!(reply.into_issues(3).is_empty());
    }

    #[test]
    fn test_unparseable_reply() {
        assert!(decode_reply::<SlideReply>("I cannot check this slide.").is_none());
        assert!(decode_reply::<SlideReply>("```json\n{\"issues\": [\n```").is_none());
    }

    #[test]
    fn test_array_replies_rejected() {
        assert!(decode_reply::<SlideReply>(r#"["The slide has a wrong date"]"#).is_none());
        assert!(decode_reply::<SlideReply>("[]").is_none());
        assert!(decode_reply::<StatementReply>("[true]").is_none());
        assert!(decode_reply::<StatementReply>("null").is_none());
    }

    #[test]
    fn test_issue_defaults() {
        let raw = r#"{"issues": [{"original_text": "GPT-3 has 17B parameters", "confidence": 1.8}, {"type": "speculation", "severity": "critical", "confidence": "0.3"}]}"#;
        let issues = decode_reply::<SlideReply>(raw).unwrap().into_issues(2);

        assert_eq!(issues[0].kind, IssueKind::Unrecognized);
        assert_eq!(issues[0].severity, Severity::Medium);
        assert_eq!(issues[0].confidence, 1.0);
        assert_eq!(issues[0].description, "");
        assert!(issues[0].correction.is_none());

        assert_eq!(issues[1].kind, IssueKind::Unrecognized);
        assert_eq!(issues[1].severity, Severity::Unrecognized);
        assert_eq!(issues[1].confidence, 0.3);
    }

    #[test]
    fn test_alias_fields() {
        let raw = r#"{"issues": [{"kind": "Numerical Error", "description": "off by 10x", "correction": "175B"}]}"#;
        let issues = decode_reply::<SlideReply>(raw).unwrap().into_issues(4);
        assert_eq!(issues[0].kind, IssueKind::NumericalError);
        assert_eq!(issues[0].description, "off by 10x");
        assert_eq!(issues[0].correction.as_deref(), Some("175B"));
        assert_eq!(issues[0].confidence, DEFAULT_CONFIDENCE);
    }

    #[test]
    fn test_statement_verdict() {
        let raw = r#"```json
{"fact_text": "ignored", "is_correct": false, "confidence": 0.9, "explanation": "It was 2017", "correct_information": "2017", "sources": ["Vaswani et al.", {"url": "arxiv.org"}]}
```"#;
        let verdict = decode_reply::<StatementReply>(raw)
            .unwrap()
            .into_verdict("Transformer (2015)");

        assert_eq!(verdict.fact_text, "Transformer (2015)");
        assert_eq!(verdict.is_correct, Some(false));
        assert_eq!(verdict.correction.as_deref(), Some("2017"));
        assert_eq!(verdict.sources.len(), 2);
        assert_eq!(verdict.sources[0], "Vaswani et al.");
    }

    #[test]
    fn test_statement_uncommitted() {
        let verdict = decode_reply::<StatementReply>(r#"{"is_correct": null}"#)
            .unwrap()
            .into_verdict("claim");
        assert_eq!(verdict.is_correct, None);
        assert_eq!(verdict.confidence, DEFAULT_CONFIDENCE);
        assert!(verdict.sources.is_empty());
    }
}
