//! Report rendering.
//!
//! Renders a finished [`Report`] as JSON, HTML or Markdown. Rendering is a
//! pure function of the report and the format: rendering twice yields the
//! same bytes.

use crate::types::{Report, SlideCheckResult, SlideStatus};
use crate::{Error, Result};
use std::fmt::Write;
use std::str::FromStr;

/// Output format for a rendered report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// Pretty-printed JSON.
    Structured,
    /// Standalone HTML page.
    RichText,
    /// Markdown document.
    PlainMarkup,
}

impl ExportFormat {
    /// All formats, in the order artifacts are written.
    pub const ALL: [ExportFormat; 3] = [
        ExportFormat::Structured,
        ExportFormat::RichText,
        ExportFormat::PlainMarkup,
    ];

    /// File extension used for this format's artifact.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Structured => "json",
            Self::RichText => "html",
            Self::PlainMarkup => "md",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = Error;

    fn from_str(token: &str) -> Result<Self> {
        match token.trim().to_lowercase().as_str() {
            "json" | "structured" => Ok(Self::Structured),
            "html" | "rich_text" | "richtext" => Ok(Self::RichText),
            "markdown" | "md" | "plain_markup" | "plainmarkup" => Ok(Self::PlainMarkup),
            other => Err(Error::UnsupportedFormat(format!(
                "export format '{}' (expected json, html or markdown)",
                other
            ))),
        }
    }
}

/// Renders reports into textual artifacts.
#[derive(Debug, Clone, Default)]
pub struct ReportExporter;

impl ReportExporter {
    /// Create a new exporter.
    pub fn new() -> Self {
        Self
    }

    /// Render a report in the given format.
    pub fn render(&self, report: &Report, format: ExportFormat) -> Result<String> {
        match format {
            ExportFormat::Structured => Ok(serde_json::to_string_pretty(report)?),
            ExportFormat::RichText => Ok(self.render_html(report)),
            ExportFormat::PlainMarkup => Ok(self.render_markdown(report)),
        }
    }

    /// Render a report for a format token such as `"json"` or `"html"`.
    pub fn render_token(&self, report: &Report, token: &str) -> Result<String> {
        self.render(report, token.parse()?)
    }

    /// Parse a report previously rendered as [`ExportFormat::Structured`].
    pub fn parse_structured(&self, json: &str) -> Result<Report> {
        Ok(serde_json::from_str(json)?)
    }

    fn render_html(&self, report: &Report) -> String {
        let name = escape_html(report.metadata.display_name());
        let mut html = String::new();

        let _ = write!(
            html,
            r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>Fact Check Report - {name}</title>
<style>
body {{ font-family: Arial, sans-serif; margin: 20px; }}
.summary {{ background-color: #f0f0f0; padding: 15px; border-radius: 5px; }}
.slide {{ margin: 20px 0; padding: 15px; border: 1px solid #ddd; }}
.issue {{ margin: 10px 0; padding: 10px; border-left: 3px solid #ff0000; }}
.issue.high {{ border-color: #ff0000; }}
.issue.medium {{ border-color: #ff9900; }}
.issue.low {{ border-color: #ffcc00; }}
.unchecked {{ color: #888888; }}
</style>
</head>
<body>
<h1>Fact Check Report</h1>
<div class="summary">
<h2>Summary</h2>
<p>File: {name}</p>
<p>Generated: {generated}</p>
<p>Total slides: {total}</p>
<p>Slides with issues: {with_issues}</p>
<p>Total issues: {issues}</p>
<p>Slides not evaluated: {unchecked}</p>
<p>Estimated cost: ${cost:.4}</p>
"#,
            generated = report.generated_at.to_rfc3339(),
            total = report.total_slides,
            with_issues = report.slides_with_issues,
            issues = report.total_issues,
            unchecked = unevaluated(report).count(),
            cost = report.total_cost_estimate,
        );
        if report.cancelled {
            html.push_str("<p><strong>Check was cancelled; results cover a prefix of the slides.</strong></p>\n");
        }
        html.push_str("</div>\n");

        html.push_str("<h2>Issues by kind</h2>\n<ul>\n");
        for (kind, count) in report.issues_by_kind.iter().filter(|(_, c)| **c > 0) {
            let _ = writeln!(html, "<li>{}: {}</li>", kind, count);
        }
        html.push_str("</ul>\n<h2>Issues by severity</h2>\n<ul>\n");
        for (severity, count) in report.issues_by_severity.iter().filter(|(_, c)| **c > 0) {
            let _ = writeln!(html, "<li>{}: {}</li>", severity, count);
        }
        html.push_str("</ul>\n");

        for result in report.results.iter().filter(|r| !r.issues.is_empty()) {
            let _ = writeln!(
                html,
                "<div class=\"slide\">\n<h3>Slide {}</h3>\n<p>{}</p>",
                result.slide_index,
                escape_html(&result.summary)
            );
            for issue in &result.issues {
                let _ = write!(
                    html,
                    "<div class=\"issue {severity}\">\n<strong>Kind:</strong> {kind}<br>\n<strong>Severity:</strong> {severity}<br>\n<strong>Text:</strong> {text}<br>\n<strong>Problem:</strong> {description}<br>\n",
                    severity = issue.severity,
                    kind = issue.kind,
                    text = escape_html(&issue.original_text),
                    description = escape_html(&issue.description),
                );
                if let Some(correction) = &issue.correction {
                    let _ = writeln!(html, "<strong>Correction:</strong> {}<br>", escape_html(correction));
                }
                let _ = writeln!(html, "<strong>Confidence:</strong> {:.2}\n</div>", issue.confidence);
            }
            html.push_str("</div>\n");
        }

        let suggestions = self.suggest_improvements(report);
        if !suggestions.prioritized_fixes.is_empty()
            || !suggestions.general_recommendations.is_empty()
        {
            html.push_str("<h2>Suggestions</h2>\n");
            if !suggestions.prioritized_fixes.is_empty() {
                html.push_str("<h3>Fix first</h3>\n<ol>\n");
                for fix in &suggestions.prioritized_fixes {
                    let _ = writeln!(
                        html,
                        "<li>Slide {}: {}</li>",
                        fix.slide_index,
                        escape_html(&fix.issue_text)
                    );
                }
                html.push_str("</ol>\n");
            }
            if !suggestions.general_recommendations.is_empty() {
                html.push_str("<h3>Recommendations</h3>\n<ul>\n");
                for text in &suggestions.general_recommendations {
                    let _ = writeln!(html, "<li>{}</li>", escape_html(text));
                }
                html.push_str("</ul>\n");
            }
        }

        let unchecked: Vec<&SlideCheckResult> = unevaluated(report).collect();
        if !unchecked.is_empty() {
            html.push_str("<h2>Slides not evaluated</h2>\n<ul class=\"unchecked\">\n");
            for result in unchecked {
                let _ = writeln!(
                    html,
                    "<li>Slide {}: {}</li>",
                    result.slide_index,
                    escape_html(&failure_reason(result))
                );
            }
            html.push_str("</ul>\n");
        }

        html.push_str("</body>\n</html>\n");
        html
    }

    fn render_markdown(&self, report: &Report) -> String {
        let mut md = String::new();

        let _ = write!(
            md,
            "# Fact Check Report\n\n## File\n- Name: {}\n- Generated: {}\n",
            report.metadata.display_name(),
            report.generated_at.to_rfc3339()
        );
        if let Some(title) = report.metadata.title.as_deref().filter(|t| !t.is_empty()) {
            let _ = writeln!(md, "- Title: {}", title);
        }
        if let Some(author) = report.metadata.author.as_deref().filter(|a| !a.is_empty()) {
            let _ = writeln!(md, "- Author: {}", author);
        }

        let _ = write!(
            md,
            "\n## Summary\n- Total slides: {}\n- Slides with issues: {}\n- Total issues: {}\n- Slides not evaluated: {}\n- Estimated cost: ${:.4}\n",
            report.total_slides,
            report.slides_with_issues,
            report.total_issues,
            unevaluated(report).count(),
            report.total_cost_estimate
        );
        if report.cancelled {
            md.push_str("- Check was cancelled; results cover a prefix of the slides.\n");
        }

        md.push_str("\n## Issues by kind\n");
        for (kind, count) in report.issues_by_kind.iter().filter(|(_, c)| **c > 0) {
            let _ = writeln!(md, "- {}: {}", kind, count);
        }

        md.push_str("\n## Issues by severity\n");
        for (severity, count) in report.issues_by_severity.iter().filter(|(_, c)| **c > 0) {
            let _ = writeln!(md, "- {}: {}", severity, count);
        }

        md.push_str("\n## Details\n");
        for result in report.results.iter().filter(|r| !r.issues.is_empty()) {
            let _ = write!(md, "\n### Slide {}\n{}\n\n", result.slide_index, result.summary);
            for issue in &result.issues {
                let _ = write!(
                    md,
                    "#### Issue ({})\n- **Kind**: {}\n- **Text**: {}\n- **Problem**: {}\n",
                    issue.severity, issue.kind, issue.original_text, issue.description
                );
                if let Some(correction) = &issue.correction {
                    let _ = writeln!(md, "- **Correction**: {}", correction);
                }
                let _ = write!(md, "- **Confidence**: {:.2}\n\n", issue.confidence);
            }
        }

        let suggestions = self.suggest_improvements(report);
        if !suggestions.prioritized_fixes.is_empty()
            || !suggestions.general_recommendations.is_empty()
        {
            md.push_str("\n## Suggestions\n");
            if !suggestions.prioritized_fixes.is_empty() {
                md.push_str("\n### Fix first\n");
                for (n, fix) in suggestions.prioritized_fixes.iter().enumerate() {
                    let _ = writeln!(md, "{}. Slide {}: {}", n + 1, fix.slide_index, fix.issue_text);
                }
            }
            if !suggestions.general_recommendations.is_empty() {
                md.push_str("\n### Recommendations\n");
                for text in &suggestions.general_recommendations {
                    let _ = writeln!(md, "- {}", text);
                }
            }
        }

        let unchecked: Vec<&SlideCheckResult> = unevaluated(report).collect();
        if !unchecked.is_empty() {
            md.push_str("\n## Slides not evaluated\n");
            for result in unchecked {
                let _ = writeln!(md, "- Slide {}: {}", result.slide_index, failure_reason(result));
            }
        }

        md
    }
}

fn unevaluated(report: &Report) -> impl Iterator<Item = &SlideCheckResult> {
    report.results.iter().filter(|r| !r.status.is_evaluated())
}

fn failure_reason(result: &SlideCheckResult) -> String {
    match result.status {
        SlideStatus::Error => format!(
            "error ({})",
            result.error_message.as_deref().unwrap_or("unknown failure")
        ),
        SlideStatus::ParseError => "reply could not be parsed".to_string(),
        _ => result.status.as_str().to_string(),
    }
}

/// Escape text for inclusion in HTML element content or attribute values.
pub(crate) fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len() + 16);
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::DocumentMetadata;
    use crate::types::{FactIssue, IssueKind, Severity, TokenUsage};
    use chrono::{TimeZone, Utc};

    fn sample_report() -> Report {
        let results = vec![
            SlideCheckResult {
                slide_index: 1,
                status: SlideStatus::IssuesFound,
                issues: vec![FactIssue {
                    kind: IssueKind::DateError,
                    severity: Severity::High,
                    original_text: "Transformer was invented in 2015".to_string(),
                    description: "The Transformer paper <Attention> was published in 2017".to_string(),
                    correction: Some("2017".to_string()),
                    confidence: 0.95,
                    slide_index: 1,
                }],
                summary: "Date problem".to_string(),
                token_usage: Some(TokenUsage {
                    input_tokens: 300,
                    output_tokens: 120,
                    estimated_cost: 0.000135,
                }),
                error_message: None,
                raw_response: None,
            },
            SlideCheckResult::parse_error(2, "not json"),
            SlideCheckResult::error(3, "timed out"),
        ];
        let metadata = DocumentMetadata {
            file_name: "lecture.pptx".to_string(),
            file_size: 1024,
            file_type: ".pptx".to_string(),
            slide_count: Some(3),
            title: Some("LLM Overview".to_string()),
            author: None,
        };
        let generated_at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        Report::from_results(metadata, results, 0.0001, generated_at)
    }

    #[test]
    fn test_format_tokens() {
        assert_eq!("json".parse::<ExportFormat>().unwrap(), ExportFormat::Structured);
        assert_eq!("HTML".parse::<ExportFormat>().unwrap(), ExportFormat::RichText);
        assert_eq!("md".parse::<ExportFormat>().unwrap(), ExportFormat::PlainMarkup);
        assert_eq!("markdown".parse::<ExportFormat>().unwrap(), ExportFormat::PlainMarkup);
    }

    #[test]
    fn test_unsupported_format() {
        let exporter = ReportExporter::new();
        let err = exporter.render_token(&sample_report(), "pdf").unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat(_)));
    }

    #[test]
    fn test_render_is_idempotent() {
        let exporter = ReportExporter::new();
        let report = sample_report();
        for format in ExportFormat::ALL {
            let first = exporter.render(&report, format).unwrap();
            let second = exporter.render(&report, format).unwrap();
            assert_eq!(first, second);
        }
    }

    #[test]
    fn test_structured_round_trip() {
        let exporter = ReportExporter::new();
        let report = sample_report();
        let json = exporter.render(&report, ExportFormat::Structured).unwrap();
        let back = exporter.parse_structured(&json).unwrap();

        assert_eq!(back.total_slides, report.total_slides);
        assert_eq!(back.slides_with_issues, report.slides_with_issues);
        assert_eq!(back.total_issues, report.total_issues);
        assert_eq!(back.issues_by_kind, report.issues_by_kind);
        assert_eq!(back.issues_by_severity, report.issues_by_severity);
        assert_eq!(back.total_cost_estimate, report.total_cost_estimate);
        assert_eq!(back.generated_at, report.generated_at);
        assert_eq!(back, report);
    }

    #[test]
    fn test_html_escapes_model_text() {
        let exporter = ReportExporter::new();
        let html = exporter.render(&sample_report(), ExportFormat::RichText).unwrap();

        assert!(html.contains("&lt;Attention&gt;"));
        assert!(!html.contains("<Attention>"));
        assert!(html.contains("<h3>Slide 1</h3>"));
        assert!(html.contains("class=\"issue high\""));
        assert!(html.contains("Slide 3: error (timed out)"));
        assert!(html.contains("Estimated cost: $0.0001"));
    }

    #[test]
    fn test_markdown_sections() {
        let exporter = ReportExporter::new();
        let md = exporter.render(&sample_report(), ExportFormat::PlainMarkup).unwrap();

        assert!(md.starts_with("# Fact Check Report"));
        assert!(md.contains("- Title: LLM Overview"));
        assert!(md.contains("- Total slides: 3"));
        assert!(md.contains("- Slides with issues: 1"));
        assert!(md.contains("- date_error: 1"));
        assert!(md.contains("- high: 1"));
        assert!(!md.contains("- numerical_error"));
        assert!(md.contains("- **Correction**: 2017"));
        assert!(md.contains("- Slide 2: reply could not be parsed"));
    }

    #[test]
    fn test_suggestions_section() {
        let exporter = ReportExporter::new();
        let report = sample_report();

        let md = exporter.render(&report, ExportFormat::PlainMarkup).unwrap();
        assert!(md.contains("## Suggestions"));
        assert!(md.contains("1. Slide 1: Transformer was invented in 2015"));
        assert!(md.contains("- Double-check dates and years"));

        let html = exporter.render(&report, ExportFormat::RichText).unwrap();
        assert!(html.contains("<h2>Suggestions</h2>"));
        assert!(html.contains("<li>Slide 1: Transformer was invented in 2015</li>"));
    }

    #[test]
    fn test_no_suggestions_without_issues() {
        let mut report = sample_report();
        report.results.remove(0);
        let report = Report::from_results(
            report.metadata.clone(),
            report.results,
            0.0,
            report.generated_at,
        );

        let md = ReportExporter::new()
            .render(&report, ExportFormat::PlainMarkup)
            .unwrap();
        assert!(!md.contains("## Suggestions"));
        assert!(md.contains("## Slides not evaluated"));
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("a < b & \"c\""), "a &lt; b &amp; &quot;c&quot;");
    }
}
