//! Multi-report artifacts: the HTML dashboard, the cost analysis and the
//! usage-based cost report.

use crate::cost::{project_averages, round_to, VolumeProjection};
use crate::export::{escape_html, ReportExporter};
use crate::types::{Report, Severity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write;

/// File volumes projected in a cost analysis.
pub const ANALYSIS_FILE_TIERS: [u64; 3] = [10, 100, 1000];

/// Slide volumes projected in a cost analysis.
pub const ANALYSIS_SLIDE_TIERS: [u64; 3] = [100, 1000, 10000];

/// Cost of one checked file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileCost {
    pub filename: String,
    pub slides: usize,
    pub cost: f64,
    pub cost_per_slide: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisProjection {
    pub by_files: Vec<VolumeProjection>,
    pub by_slides: Vec<VolumeProjection>,
}

/// Actual spend across a set of reports, with linear projections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostAnalysis {
    pub total_cost: f64,
    pub average_cost_per_file: f64,
    pub average_cost_per_slide: f64,
    pub file_costs: Vec<FileCost>,
    pub projection: AnalysisProjection,
}

/// One line of recorded usage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageRecord {
    #[serde(default = "default_usage_date")]
    pub date: String,
    #[serde(default)]
    pub slides: usize,
    #[serde(default)]
    pub cost: f64,
}

fn default_usage_date() -> String {
    "Unknown".to_string()
}

#[derive(Debug, Default)]
struct DayTotals {
    files: usize,
    slides: usize,
    cost: f64,
}

impl ReportExporter {
    /// Render an HTML overview of several reports.
    pub fn dashboard(&self, reports: &[Report], generated_at: DateTime<Utc>) -> String {
        let total_slides: usize = reports.iter().map(|r| r.total_slides).sum();
        let total_issues: usize = reports.iter().map(|r| r.total_issues).sum();
        let total_cost: f64 = reports.iter().map(|r| r.total_cost_estimate).sum();

        let mut html = String::new();
        let _ = write!(
            html,
            r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>Fact Check Dashboard</title>
<style>
body {{ font-family: Arial, sans-serif; margin: 20px; }}
.report-card {{ border: 1px solid #ddd; padding: 15px; margin: 10px 0; border-radius: 5px; }}
.stats {{ display: flex; justify-content: space-around; margin: 10px 0; }}
.stat-item {{ text-align: center; padding: 10px; }}
.stat-value {{ font-size: 24px; font-weight: bold; color: #333; }}
.issue-high {{ color: #ff0000; }}
.issue-medium {{ color: #ff9900; }}
.issue-low {{ color: #ffcc00; }}
</style>
</head>
<body>
<h1>Fact Check Dashboard</h1>
<p>Generated: {generated}</p>
<div class="stats">
<div class="stat-item"><div class="stat-value">{files}</div><div>Files checked</div></div>
<div class="stat-item"><div class="stat-value">{total_slides}</div><div>Total slides</div></div>
<div class="stat-item"><div class="stat-value">{total_issues}</div><div>Issues found</div></div>
<div class="stat-item"><div class="stat-value">${total_cost:.4}</div><div>Total cost</div></div>
</div>
<h2>Results by file</h2>
"#,
            generated = generated_at.format("%Y-%m-%d %H:%M:%S UTC"),
            files = reports.len(),
        );

        for report in reports {
            let _ = write!(
                html,
                r#"<div class="report-card">
<h3>{name}</h3>
<p>Slides: {slides} | Slides with issues: {with_issues}</p>
<p>Issues: <span class="issue-high">high: {high}</span> | <span class="issue-medium">medium: {medium}</span> | <span class="issue-low">low: {low}</span></p>
<p>Estimated cost: ${cost:.4}</p>
</div>
"#,
                name = escape_html(report.metadata.display_name()),
                slides = report.total_slides,
                with_issues = report.slides_with_issues,
                high = report.severity_count(Severity::High),
                medium = report.severity_count(Severity::Medium),
                low = report.severity_count(Severity::Low),
                cost = report.total_cost_estimate,
            );
        }

        html.push_str("</body>\n</html>\n");
        html
    }

    /// Summarize actual spend across reports.
    pub fn cost_analysis(&self, reports: &[Report]) -> CostAnalysis {
        let total_cost: f64 = reports.iter().map(|r| r.total_cost_estimate).sum();
        let total_slides: usize = reports.iter().map(|r| r.total_slides).sum();

        let average_cost_per_file = if reports.is_empty() {
            0.0
        } else {
            total_cost / reports.len() as f64
        };
        let average_cost_per_slide = if total_slides > 0 {
            total_cost / total_slides as f64
        } else {
            0.0
        };

        let file_costs = reports
            .iter()
            .map(|r| FileCost {
                filename: r.metadata.display_name().to_string(),
                slides: r.total_slides,
                cost: r.total_cost_estimate,
                cost_per_slide: if r.total_slides > 0 {
                    round_to(r.total_cost_estimate / r.total_slides as f64, 6)
                } else {
                    0.0
                },
            })
            .collect();

        let project = |average: f64, tiers: &[u64]| -> Vec<VolumeProjection> {
            tiers
                .iter()
                .map(|&volume| VolumeProjection {
                    volume,
                    cost: round_to(average * volume as f64, 4),
                })
                .collect()
        };

        CostAnalysis {
            total_cost: round_to(total_cost, 4),
            average_cost_per_file: round_to(average_cost_per_file, 4),
            average_cost_per_slide: round_to(average_cost_per_slide, 6),
            file_costs,
            projection: AnalysisProjection {
                by_files: project(average_cost_per_file, &ANALYSIS_FILE_TIERS),
                by_slides: project(average_cost_per_slide, &ANALYSIS_SLIDE_TIERS),
            },
        }
    }

    /// Render a Markdown report of recorded usage, grouped by date, with
    /// projections appended.
    pub fn cost_report(&self, usage: &[UsageRecord], model: &str) -> String {
        let total_cost: f64 = usage.iter().map(|u| u.cost).sum();
        let total_slides: usize = usage.iter().map(|u| u.slides).sum();
        let per_file = if usage.is_empty() {
            0.0
        } else {
            total_cost / usage.len() as f64
        };
        let per_slide = if total_slides > 0 {
            total_cost / total_slides as f64
        } else {
            0.0
        };

        let mut md = String::new();
        let _ = write!(
            md,
            "# Fact Check Cost Report\n\n## Usage summary\n- Model: {}\n- Files processed: {}\n- Total slides: {}\n- Total cost: ${:.4}\n- Average cost per file: ${:.4}\n- Average cost per slide: ${:.6}\n\n## Breakdown by date\n",
            model,
            usage.len(),
            total_slides,
            total_cost,
            per_file,
            per_slide
        );

        let mut by_date: BTreeMap<&str, DayTotals> = BTreeMap::new();
        for record in usage {
            let day = by_date.entry(record.date.as_str()).or_default();
            day.files += 1;
            day.slides += record.slides;
            day.cost += record.cost;
        }
        for (date, day) in &by_date {
            let _ = write!(
                md,
                "\n### {}\n- Files: {}\n- Slides: {}\n- Cost: ${:.4}\n",
                date, day.files, day.slides, day.cost
            );
        }

        let projections = project_averages(per_file, per_slide);
        md.push_str("\n## Projected costs\n\n### By file volume\n");
        for projection in &projections.by_files {
            let _ = writeln!(md, "- {} files: ${:.2}", projection.volume, projection.cost);
        }
        md.push_str("\n### Monthly usage\n");
        for tier in &projections.monthly {
            let _ = writeln!(
                md,
                "- {}: {} - ${:.2}/month",
                tier.tier, tier.description, tier.cost
            );
        }

        md
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::DocumentMetadata;
    use crate::types::{FactIssue, IssueKind, SlideCheckResult, SlideStatus};
    use chrono::TimeZone;

    fn report(name: &str, slides: u32, high_issues: u32, cost: f64) -> Report {
        let results = (1..=slides)
            .map(|index| {
                let issues: Vec<FactIssue> = if index <= high_issues {
                    vec![FactIssue {
                        kind: IssueKind::DateError,
                        severity: Severity::High,
                        original_text: "1999".to_string(),
                        description: "wrong year".to_string(),
                        correction: None,
                        confidence: 0.9,
                        slide_index: index,
                    }]
                } else {
                    Vec::new()
                };
                SlideCheckResult {
                    slide_index: index,
                    status: if issues.is_empty() {
                        SlideStatus::Ok
                    } else {
                        SlideStatus::IssuesFound
                    },
                    issues,
                    summary: String::new(),
                    token_usage: None,
                    error_message: None,
                    raw_response: None,
                }
            })
            .collect();
        let metadata = DocumentMetadata {
            file_name: name.to_string(),
            ..Default::default()
        };
        Report::from_results(metadata, results, cost, Utc::now())
    }

    #[test]
    fn test_dashboard_totals_and_cards() {
        let reports = vec![report("a<b>.pptx", 10, 2, 0.01), report("", 5, 0, 0.02)];
        let generated_at = Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap();
        let html = ReportExporter::new().dashboard(&reports, generated_at);

        assert!(html.contains("Generated: 2024-05-01 09:30:00 UTC"));
        assert!(html.contains("<div class=\"stat-value\">15</div>"));
        assert!(html.contains("<div class=\"stat-value\">2</div>"));
        assert!(html.contains("$0.0300"));
        assert!(html.contains("<h3>a&lt;b&gt;.pptx</h3>"));
        assert!(html.contains("<h3>Unknown</h3>"));
        assert!(html.contains("high: 2"));
    }

    #[test]
    fn test_cost_analysis() {
        let reports = vec![report("one.pptx", 20, 0, 0.04), report("two.pdf", 30, 0, 0.06)];
        let analysis = ReportExporter::new().cost_analysis(&reports);

        assert_eq!(analysis.total_cost, 0.1);
        assert_eq!(analysis.average_cost_per_file, 0.05);
        assert_eq!(analysis.average_cost_per_slide, 0.002);
        assert_eq!(analysis.file_costs.len(), 2);
        assert_eq!(analysis.file_costs[0].cost_per_slide, 0.002);

        let files: Vec<u64> = analysis.projection.by_files.iter().map(|p| p.volume).collect();
        assert_eq!(files, vec![10, 100, 1000]);
        assert_eq!(analysis.projection.by_files[1].cost, 5.0);
        assert_eq!(analysis.projection.by_slides[2].cost, 20.0);
    }

    #[test]
    fn test_cost_analysis_empty() {
        let analysis = ReportExporter::new().cost_analysis(&[]);
        assert_eq!(analysis.total_cost, 0.0);
        assert_eq!(analysis.average_cost_per_file, 0.0);
        assert!(analysis.file_costs.is_empty());
    }

    #[test]
    fn test_cost_report_groups_by_date() {
        let usage = vec![
            UsageRecord {
                date: "2024-05-02".to_string(),
                slides: 10,
                cost: 0.5,
            },
            UsageRecord {
                date: "2024-05-01".to_string(),
                slides: 20,
                cost: 1.0,
            },
            UsageRecord {
                date: "2024-05-02".to_string(),
                slides: 10,
                cost: 0.5,
            },
        ];
        let md = ReportExporter::new().cost_report(&usage, "gemini-1.5-flash");

        assert!(md.contains("- Model: gemini-1.5-flash"));
        assert!(md.contains("- Files processed: 3"));
        assert!(md.contains("- Total cost: $2.0000"));
        let first = md.find("### 2024-05-01").unwrap();
        let second = md.find("### 2024-05-02").unwrap();
        assert!(first < second);
        assert!(md.contains("- Files: 2\n- Slides: 20\n- Cost: $1.0000"));
        assert!(md.contains("- 10 files: $6.67"));
        assert!(md.contains("- light: 10 files/month (200 slides) - $6.67/month"));
    }

    #[test]
    fn test_usage_record_defaults() {
        let record: UsageRecord = serde_json::from_str(r#"{"cost": 0.25}"#).unwrap();
        assert_eq!(record.date, "Unknown");
        assert_eq!(record.slides, 0);
    }
}
