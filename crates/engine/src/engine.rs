//! Document-level orchestration: read, verify slide by slide, aggregate.

use crate::cancel::CancelToken;
use crate::llm::LlmClient;
use crate::quick::{extract_candidates, CandidateCheck, QuickCheckOutcome, QUICK_CHECK_LIMIT};
use crate::verifier::VerificationClient;
use chrono::Utc;
use slidecheck_core::{DocumentReader, Report, Result};
use std::path::Path;

/// Drives a [`DocumentReader`] and a [`VerificationClient`] over whole documents.
pub struct FactCheckEngine<R: DocumentReader, C: LlmClient> {
    reader: R,
    verifier: VerificationClient<C>,
    quick_limit: usize,
}

impl<R: DocumentReader, C: LlmClient> FactCheckEngine<R, C> {
    pub fn new(reader: R, verifier: VerificationClient<C>) -> Self {
        Self {
            reader,
            verifier,
            quick_limit: QUICK_CHECK_LIMIT,
        }
    }

    /// Override how many candidates a quick check verifies.
    pub fn with_quick_check_limit(mut self, limit: usize) -> Self {
        self.quick_limit = limit;
        self
    }

    pub fn reader(&self) -> &R {
        &self.reader
    }

    pub fn verifier(&self) -> &VerificationClient<C> {
        &self.verifier
    }

    /// Check every slide of a document and aggregate the results.
    ///
    /// Only an unreadable or unsupported file is an error. Per-slide failures
    /// are reported through each result's status.
    pub fn check_document(&self, path: &Path) -> Result<Report> {
        self.check_document_with_cancel(path, &CancelToken::new())
    }

    /// Like [`check_document`](Self::check_document), stopping between slides
    /// once `cancel` is set. A cancelled report covers the completed prefix.
    pub fn check_document_with_cancel(&self, path: &Path, cancel: &CancelToken) -> Result<Report> {
        let mut metadata = self.reader.extract_metadata(path)?;
        let slides = self.reader.parse(path)?;
        if metadata.slide_count.is_none() {
            metadata.slide_count = Some(slides.len());
        }

        log::info!(
            "Checking {} ({} slides)",
            metadata.display_name(),
            slides.len()
        );

        let outcome = self.verifier.verify_all_with_cancel(&slides, cancel);
        let report = Report::from_results(
            metadata,
            outcome.results,
            outcome.total_cost_estimate,
            Utc::now(),
        )
        .with_cancelled(outcome.cancelled);

        log::info!(
            "Checked {} slides: {} with issues, {} issues, estimated cost ${:.4}",
            report.total_slides,
            report.slides_with_issues,
            report.total_issues,
            report.total_cost_estimate
        );

        Ok(report)
    }

    /// Verify the first few year and number assertions found in `text`.
    pub fn quick_check(&self, text: &str) -> QuickCheckOutcome {
        let candidates = extract_candidates(text);
        let facts_found = candidates.len();

        let checks: Vec<CandidateCheck> = candidates
            .into_iter()
            .take(self.quick_limit)
            .map(|candidate| {
                let result = self.verifier.verify_statement(&candidate.context);
                CandidateCheck { candidate, result }
            })
            .collect();

        log::debug!(
            "Quick check: {} candidates, {} verified",
            facts_found,
            checks.len()
        );

        QuickCheckOutcome {
            text: text.to_string(),
            facts_found,
            facts_checked: checks.len(),
            checks,
        }
    }
}
