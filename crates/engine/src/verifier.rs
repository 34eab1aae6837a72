//! Per-slide and per-statement verification over an [`LlmClient`].

use crate::cancel::CancelToken;
use crate::config::DEFAULT_PRICING;
use crate::llm::{GeminiClient, LlmClient};
use crate::reply::{decode_reply, SlideReply, StatementReply};
use slidecheck_core::{
    estimate_tokens, round_to, PricingProfile, SlideCheckResult, SlideImage, SlideRecord,
    SlideStatus, TokenUsage, VerificationResult,
};

/// Results of verifying a sequence of slides, in slide order.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchOutcome {
    pub results: Vec<SlideCheckResult>,
    /// Sum of per-slide costs, rounded to 4 places.
    pub total_cost_estimate: f64,
    /// True when the batch stopped before the last slide.
    pub cancelled: bool,
}

/// Builds prompts, calls the LLM and turns replies into typed results.
///
/// No call made through this type returns an error: transport failures and
/// unusable replies become `error` and `parse_error` results.
pub struct VerificationClient<C: LlmClient> {
    client: C,
    pricing: PricingProfile,
}

impl<C: LlmClient> VerificationClient<C> {
    pub fn new(client: C) -> Self {
        Self {
            client,
            pricing: DEFAULT_PRICING,
        }
    }

    pub fn with_pricing(mut self, pricing: PricingProfile) -> Self {
        self.pricing = pricing;
        self
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn pricing(&self) -> &PricingProfile {
        &self.pricing
    }

    /// Check one slide. The image path is taken iff `image` is present.
    pub fn verify_slide(
        &self,
        text: &str,
        slide_index: u32,
        image: Option<&SlideImage>,
    ) -> SlideCheckResult {
        let prompt = slide_prompt(text, slide_index);
        let reply = match image {
            Some(image) => self.client.generate_with_image(&prompt, image),
            None => self.client.generate_text(&prompt),
        };

        let raw = match reply {
            Ok(raw) => raw,
            Err(e) => {
                log::warn!("Slide {}: verification call failed: {}", slide_index, e);
                return SlideCheckResult::error(slide_index, e.to_string());
            }
        };

        let usage = self.usage(&prompt, &raw);
        let Some(reply) = decode_reply::<SlideReply>(&raw) else {
            log::warn!("Slide {}: could not parse verifier reply", slide_index);
            let mut result = SlideCheckResult::parse_error(slide_index, raw);
            result.token_usage = Some(usage);
            return result;
        };

        let summary = reply.summary.clone().unwrap_or_default();
        let issues = reply.into_issues(slide_index);
        let status = if issues.is_empty() {
            SlideStatus::Ok
        } else {
            SlideStatus::IssuesFound
        };
        log::debug!(
            "Slide {}: {} ({} issues)",
            slide_index,
            status.as_str(),
            issues.len()
        );

        SlideCheckResult {
            slide_index,
            status,
            issues,
            summary,
            token_usage: Some(usage),
            error_message: None,
            raw_response: None,
        }
    }

    /// Check a single free-standing statement.
    pub fn verify_statement(&self, fact_text: &str) -> VerificationResult {
        let prompt = statement_prompt(fact_text);
        let raw = match self.client.generate_text(&prompt) {
            Ok(raw) => raw,
            Err(e) => {
                log::warn!("Statement verification failed: {}", e);
                return VerificationResult::Error {
                    fact_text: fact_text.to_string(),
                    error_message: e.to_string(),
                };
            }
        };

        match decode_reply::<StatementReply>(&raw) {
            Some(reply) => VerificationResult::Verified(reply.into_verdict(fact_text)),
            None => {
                log::warn!("Could not parse statement verification reply");
                VerificationResult::ParseError {
                    fact_text: fact_text.to_string(),
                    raw_response: raw,
                }
            }
        }
    }

    /// Check every slide in order. A failing slide never stops the batch.
    pub fn verify_all(&self, slides: &[SlideRecord]) -> BatchOutcome {
        self.verify_all_with_cancel(slides, &CancelToken::new())
    }

    /// Check slides in order until done or until `cancel` is set.
    ///
    /// The token is checked before each slide, so the results are always a
    /// prefix of `slides`.
    pub fn verify_all_with_cancel(
        &self,
        slides: &[SlideRecord],
        cancel: &CancelToken,
    ) -> BatchOutcome {
        let mut results = Vec::with_capacity(slides.len());
        let mut total_cost = 0.0;
        let mut cancelled = false;

        for slide in slides {
            if cancel.is_cancelled() {
                log::info!(
                    "Cancelled after {} of {} slides",
                    results.len(),
                    slides.len()
                );
                cancelled = true;
                break;
            }

            let result = self.verify_slide(&slide.text, slide.index, slide.image.as_ref());
            total_cost += result.cost();
            results.push(result);
        }

        BatchOutcome {
            results,
            total_cost_estimate: round_to(total_cost, 4),
            cancelled,
        }
    }

    fn usage(&self, prompt: &str, reply: &str) -> TokenUsage {
        let input_tokens = estimate_tokens(prompt);
        let output_tokens = estimate_tokens(reply);
        TokenUsage {
            input_tokens,
            output_tokens,
            estimated_cost: self.pricing.call_cost(input_tokens, output_tokens),
        }
    }
}

impl VerificationClient<GeminiClient> {
    /// Verifier priced with the profile from the client's configuration.
    pub fn from_config(client: GeminiClient) -> Self {
        let pricing = client.config().pricing;
        Self::new(client).with_pricing(pricing)
    }
}

/// Fact-check prompt for one slide. Deterministic in its inputs.
pub fn slide_prompt(content: &str, slide_index: u32) -> String {
    format!(
        r#"You are an expert fact checker reviewing university lecture slides.
Check the factual accuracy of slide {slide} below.

Check for:
1. Dates and years (for example "the Transformer was introduced in 2017")
2. Numerical data (model parameter counts, benchmark scores)
3. Validity of technical claims
4. Accuracy of citations and references
5. Consistency with generally accepted knowledge

Slide content:
{content}

Respond in JSON with exactly this shape:
{{
    "slide_number": {slide},
    "status": "ok" or "issues_found",
    "issues": [
        {{
            "type": "date_error" | "numerical_error" | "technical_claim" | "citation_error" | "knowledge_consistency",
            "severity": "high" | "medium" | "low",
            "original_text": "the problematic text",
            "issue_description": "what is wrong",
            "correct_information": "the correct information, if known",
            "confidence": 0.0-1.0
        }}
    ],
    "summary": "overall assessment of the slide"
}}

If there are no problems, return "issues" as an empty array []."#,
        slide = slide_index,
        content = content,
    )
}

/// Verification prompt for one free-standing statement.
pub fn statement_prompt(fact_text: &str) -> String {
    let quoted = serde_json::to_string(fact_text).unwrap_or_else(|_| format!("\"{}\"", fact_text));
    format!(
        r#"Verify whether the following statement is factually correct:
{quoted}

Respond in JSON with exactly this shape:
{{
    "fact_text": {quoted},
    "is_correct": true or false,
    "confidence": 0.0-1.0,
    "explanation": "explanation",
    "correct_information": "the correct information, if applicable",
    "sources": ["list of useful references"]
}}"#,
        quoted = quoted,
    )
}
