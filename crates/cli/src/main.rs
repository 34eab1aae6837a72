//! CLI tool for fact checking lecture slide decks.

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use slidecheck_core::{
    CostModel, ExportFormat, FileDescriptor, ImprovementSuggestions, Report, ReportExporter,
    UsageRecord,
};
use slidecheck_engine::{
    CheckerConfig, FactCheckEngine, FileDocumentReader, GeminiClient, VerificationClient,
};
use std::collections::HashSet;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Fact-check lecture slides (.pptx, .ppt, .pdf) with an LLM.
#[derive(Parser, Debug)]
#[command(name = "slidecheck")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// API key (default: GOOGLE_API_KEY or GEMINI_API_KEY)
    #[arg(long, global = true)]
    api_key: Option<String>,

    /// Model for text-only checks
    #[arg(long, global = true)]
    model: Option<String>,

    /// Model for slides with images
    #[arg(long, global = true)]
    vision_model: Option<String>,

    /// Request timeout in seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check every slide of one or more decks and write reports
    Check {
        /// Input file(s) (.pptx, .ppt or .pdf)
        #[arg(required = true)]
        input: Vec<PathBuf>,

        /// Report format: json, html, md or all
        #[arg(short, long, default_value = "all")]
        format: String,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        output: PathBuf,

        /// Do not send slide pictures to the vision model
        #[arg(long)]
        no_images: bool,
    },

    /// Verify the years and numbers found in a text snippet
    Quick {
        /// Text to check
        text: String,
    },

    /// Estimate the cost of checking decks without calling the LLM
    Estimate {
        /// Slides in a single deck
        #[arg(short, long, conflicts_with = "files")]
        slides: Option<usize>,

        /// The deck has pictures
        #[arg(long)]
        images: bool,

        /// JSON array of {filename, slide_count, has_images}
        #[arg(long)]
        files: Option<PathBuf>,
    },

    /// Summarize recorded usage as a Markdown cost report
    Usage {
        /// JSON array of {date, slides, cost}
        records: PathBuf,
    },

    /// Build an HTML dashboard and cost analysis from JSON reports
    Dashboard {
        /// Report files written by `check --format json`
        #[arg(required = true)]
        reports: Vec<PathBuf>,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    if args.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    }

    match &args.command {
        Command::Check {
            input,
            format,
            output,
            no_images,
        } => run_check(&args, input, format, output, *no_images),
        Command::Quick { text } => run_quick(&args, text),
        Command::Estimate {
            slides,
            images,
            files,
        } => run_estimate(*slides, *images, files.as_deref()),
        Command::Usage { records } => run_usage(&args, records),
        Command::Dashboard { reports, output } => run_dashboard(reports, output),
    }
}

/// Environment configuration with command-line overrides applied.
fn checker_config(args: &Args) -> CheckerConfig {
    let mut config = CheckerConfig::from_env();
    if let Some(key) = &args.api_key {
        config = config.with_api_key(key);
    }
    if let Some(model) = &args.model {
        config = config.with_text_model(model);
    }
    if let Some(model) = &args.vision_model {
        config = config.with_vision_model(model);
    }
    if let Some(secs) = args.timeout {
        config = config.with_timeout_secs(secs);
    }
    config
}

type Engine = FactCheckEngine<FileDocumentReader, GeminiClient>;

fn build_engine(args: &Args, include_images: bool) -> Result<Engine> {
    let client = GeminiClient::new(checker_config(args))?;

    Ok(FactCheckEngine::new(
        FileDocumentReader::new().with_images(include_images),
        VerificationClient::from_config(client),
    ))
}

fn export_formats(token: &str) -> Result<Vec<ExportFormat>> {
    if token.trim().eq_ignore_ascii_case("all") {
        return Ok(ExportFormat::ALL.to_vec());
    }
    Ok(vec![ExportFormat::from_str(token)?])
}

fn run_check(
    args: &Args,
    input: &[PathBuf],
    format: &str,
    output: &Path,
    no_images: bool,
) -> Result<()> {
    let formats = export_formats(format)?;
    let engine = build_engine(args, !no_images)?;
    let exporter = ReportExporter::new();

    let stamp = timestamp();
    let mut used_bases = HashSet::new();
    let mut failed = 0;
    for input_path in input {
        if args.verbose {
            eprintln!("Processing: {}", input_path.display());
        }

        let stem = input_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("report");
        let base = artifact_base(stem, &stamp, &mut used_bases);

        match check_file(&engine, &exporter, input_path, &formats, output, &base) {
            Ok((report, suggestions)) => {
                println!(
                    "{}: {} slides, {} with issues, {} issues, {} priority fixes (est. ${:.4})",
                    report.metadata.display_name(),
                    report.total_slides,
                    report.slides_with_issues,
                    report.total_issues,
                    suggestions.prioritized_fixes.len(),
                    report.total_cost_estimate
                );
            }
            Err(e) => {
                eprintln!("Error processing {}: {:#}", input_path.display(), e);
                failed += 1;
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{} of {} files failed", failed, input.len());
    }
    Ok(())
}

/// `<stem>_<stamp>`, suffixed `_2`, `_3`, ... when another input of the
/// same run already took it.
fn artifact_base(stem: &str, stamp: &str, used: &mut HashSet<String>) -> String {
    let mut base = format!("{}_{}", stem, stamp);
    let mut n = 2;
    while !used.insert(base.clone()) {
        base = format!("{}_{}_{}", stem, stamp, n);
        n += 1;
    }
    base
}

/// Check one file and write its report artifacts.
fn check_file(
    engine: &Engine,
    exporter: &ReportExporter,
    input_path: &Path,
    formats: &[ExportFormat],
    output_dir: &Path,
    base: &str,
) -> Result<(Report, ImprovementSuggestions)> {
    let report = engine
        .check_document(input_path)
        .with_context(|| format!("Failed to check {}", input_path.display()))?;

    let suggestions = write_report_artifacts(exporter, &report, formats, output_dir, base)?;
    Ok((report, suggestions))
}

/// Write `<base>.<ext>` per format plus `<base>_suggestions.json`.
fn write_report_artifacts(
    exporter: &ReportExporter,
    report: &Report,
    formats: &[ExportFormat],
    output_dir: &Path,
    base: &str,
) -> Result<ImprovementSuggestions> {
    for format in formats {
        let content = exporter.render(report, *format)?;
        let path = artifact_path(output_dir, &format!("{}.{}", base, format.extension()))?;
        write_output(&path, &content)?;
        log::info!("Written to: {}", path.display());
    }

    let suggestions = exporter.suggest_improvements(report);
    let path = artifact_path(output_dir, &format!("{}_suggestions.json", base))?;
    write_output(&path, &serde_json::to_string_pretty(&suggestions)?)?;
    log::info!("Written to: {}", path.display());

    Ok(suggestions)
}

fn run_quick(args: &Args, text: &str) -> Result<()> {
    let engine = build_engine(args, false)?;
    let outcome = engine.quick_check(text);
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}

fn run_estimate(slides: Option<usize>, images: bool, files: Option<&Path>) -> Result<()> {
    let descriptors = match (slides, files) {
        (_, Some(path)) => {
            let json = read_input(path)?;
            serde_json::from_str::<Vec<FileDescriptor>>(&json)
                .with_context(|| format!("Invalid file list in {}", path.display()))?
        }
        (Some(count), None) => vec![FileDescriptor::new("deck", count, images)],
        (None, None) => anyhow::bail!("pass --slides or --files"),
    };

    let model = CostModel::new();
    let estimate = model.estimate_batch(&descriptors);
    let projections = model.project_costs(&estimate);

    let output = serde_json::json!({
        "estimate": estimate,
        "projections": projections,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn run_usage(args: &Args, records: &Path) -> Result<()> {
    let json = read_input(records)?;
    let usage: Vec<UsageRecord> = serde_json::from_str(&json)
        .with_context(|| format!("Invalid usage records in {}", records.display()))?;

    let model = args
        .model
        .clone()
        .unwrap_or_else(|| CheckerConfig::from_env().text_model);
    print!("{}", ReportExporter::new().cost_report(&usage, &model));
    Ok(())
}

fn run_dashboard(report_paths: &[PathBuf], output_dir: &Path) -> Result<()> {
    let exporter = ReportExporter::new();
    let reports = report_paths
        .iter()
        .map(|path| {
            let json = read_input(path)?;
            exporter
                .parse_structured(&json)
                .with_context(|| format!("Invalid report {}", path.display()))
        })
        .collect::<Result<Vec<Report>>>()?;

    let now = Utc::now();
    let stamp = now.format("%Y%m%d_%H%M%S").to_string();

    let dashboard_path = artifact_path(output_dir, &format!("dashboard_{}.html", stamp))?;
    write_output(&dashboard_path, &exporter.dashboard(&reports, now))?;

    let analysis = exporter.cost_analysis(&reports);
    let analysis_path = artifact_path(output_dir, &format!("cost_analysis_{}.json", stamp))?;
    write_output(&analysis_path, &serde_json::to_string_pretty(&analysis)?)?;

    println!("{}", dashboard_path.display());
    println!("{}", analysis_path.display());
    Ok(())
}

fn timestamp() -> String {
    Utc::now().format("%Y%m%d_%H%M%S").to_string()
}

fn read_input(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

/// Path of an artifact inside the output directory, creating the directory.
fn artifact_path(output_dir: &Path, file_name: &str) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir).with_context(|| {
        format!("Failed to create output directory: {}", output_dir.display())
    })?;
    Ok(output_dir.join(file_name))
}

/// Write output to a file.
fn write_output(path: &Path, content: &str) -> Result<()> {
    let mut file =
        File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;

    file.write_all(content.as_bytes())
        .with_context(|| format!("Failed to write to {}", path.display()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use slidecheck_core::{
        DocumentMetadata, FactIssue, IssueKind, Severity, SlideCheckResult, SlideStatus,
    };
    use tempfile::TempDir;

    fn report_with_high_issue() -> Report {
        let issue = FactIssue {
            kind: IssueKind::NumericalError,
            severity: Severity::High,
            original_text: "GPT-3 has 17B parameters".to_string(),
            description: "GPT-3 has 175B parameters".to_string(),
            correction: Some("175B".to_string()),
            confidence: 0.9,
            slide_index: 2,
        };
        let result = SlideCheckResult {
            slide_index: 2,
            status: SlideStatus::IssuesFound,
            issues: vec![issue],
            summary: "Wrong parameter count".to_string(),
            token_usage: None,
            error_message: None,
            raw_response: None,
        };
        let metadata = DocumentMetadata {
            file_name: "lecture.pdf".to_string(),
            file_size: 512,
            file_type: ".pdf".to_string(),
            slide_count: Some(2),
            title: None,
            author: None,
        };
        Report::from_results(
            metadata,
            vec![SlideCheckResult::parse_error(1, "??"), result],
            0.0,
            Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap(),
        )
    }

    #[test]
    fn test_artifact_base_dedupes_stems() {
        let mut used = HashSet::new();
        let stamp = "20240601_080000";

        assert_eq!(artifact_base("lecture", stamp, &mut used), "lecture_20240601_080000");
        assert_eq!(artifact_base("lecture", stamp, &mut used), "lecture_20240601_080000_2");
        assert_eq!(artifact_base("lecture", stamp, &mut used), "lecture_20240601_080000_3");
        assert_eq!(artifact_base("notes", stamp, &mut used), "notes_20240601_080000");
    }

    #[test]
    fn test_write_report_artifacts() {
        let dir = TempDir::new().unwrap();
        let suggestions = write_report_artifacts(
            &ReportExporter::new(),
            &report_with_high_issue(),
            &ExportFormat::ALL,
            dir.path(),
            "lecture_20240601_080000",
        )
        .unwrap();

        assert_eq!(suggestions.prioritized_fixes.len(), 1);
        for name in [
            "lecture_20240601_080000.json",
            "lecture_20240601_080000.html",
            "lecture_20240601_080000.md",
        ] {
            assert!(dir.path().join(name).exists(), "missing {}", name);
        }

        let written = std::fs::read_to_string(
            dir.path().join("lecture_20240601_080000_suggestions.json"),
        )
        .unwrap();
        let value: serde_json::Value = serde_json::from_str(&written).unwrap();
        assert_eq!(value["prioritized_fixes"][0]["slide_index"], 2);
        assert_eq!(
            value["prioritized_fixes"][0]["issue_text"],
            "GPT-3 has 17B parameters"
        );
        assert_eq!(value["per_slide_suggestions"]["2"][0]["action"], "must-fix");

        let md = std::fs::read_to_string(dir.path().join("lecture_20240601_080000.md")).unwrap();
        assert!(md.contains("1. Slide 2: GPT-3 has 17B parameters"));
    }
}
