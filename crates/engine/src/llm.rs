//! LLM transport: the capability trait and the Gemini REST implementation.

use crate::config::CheckerConfig;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use slidecheck_core::{Error, Result, SlideImage};
use std::time::Duration;
use thiserror::Error;

/// Failure of a single LLM call. Always recovered per slide or statement.
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("request timed out after {0}s")]
    Timeout(u64),

    #[error("provider returned error (status {status}): {body}")]
    Provider { status: u16, body: String },

    #[error("provider returned no text")]
    EmptyResponse,
}

/// A text-generation capability with an optional image input.
pub trait LlmClient {
    /// Generate a reply for a text-only prompt.
    fn generate_text(&self, prompt: &str) -> std::result::Result<String, LlmError>;

    /// Generate a reply for a prompt accompanied by one image.
    fn generate_with_image(
        &self,
        prompt: &str,
        image: &SlideImage,
    ) -> std::result::Result<String, LlmError>;
}

impl<T: LlmClient + ?Sized> LlmClient for Box<T> {
    fn generate_text(&self, prompt: &str) -> std::result::Result<String, LlmError> {
        (**self).generate_text(prompt)
    }

    fn generate_with_image(
        &self,
        prompt: &str,
        image: &SlideImage,
    ) -> std::result::Result<String, LlmError> {
        (**self).generate_with_image(prompt, image)
    }
}

/// Gemini `generateContent` client over blocking HTTP.
pub struct GeminiClient {
    config: CheckerConfig,
    client: reqwest::blocking::Client,
}

impl GeminiClient {
    /// Create a client, validating the configuration first.
    pub fn new(config: CheckerConfig) -> Result<Self> {
        config.validate()?;

        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    pub fn config(&self) -> &CheckerConfig {
        &self.config
    }

    fn endpoint(&self, model: &str) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            model
        )
    }

    fn generate(
        &self,
        model: &str,
        request: &GenerateRequest,
    ) -> std::result::Result<String, LlmError> {
        let response = self
            .client
            .post(self.endpoint(model))
            .header("x-goog-api-key", &self.config.api_key)
            .json(request)
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout(self.config.timeout_secs)
                } else {
                    LlmError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(LlmError::Provider {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateResponse = response
            .json()
            .map_err(|e| LlmError::Transport(format!("malformed provider response: {}", e)))?;

        parsed.text().ok_or(LlmError::EmptyResponse)
    }
}

impl LlmClient for GeminiClient {
    fn generate_text(&self, prompt: &str) -> std::result::Result<String, LlmError> {
        self.generate(&self.config.text_model, &GenerateRequest::text(prompt))
    }

    fn generate_with_image(
        &self,
        prompt: &str,
        image: &SlideImage,
    ) -> std::result::Result<String, LlmError> {
        self.generate(
            &self.config.vision_model,
            &GenerateRequest::with_image(prompt, image),
        )
    }
}

/// Request body for `models/{model}:generateContent`.
#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<RequestContent>,
}

#[derive(Debug, Serialize)]
struct RequestContent {
    parts: Vec<RequestPart>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum RequestPart {
    Text { text: String },
    InlineData { inline_data: InlineData },
}

#[derive(Debug, Serialize)]
struct InlineData {
    mime_type: String,
    data: String,
}

impl GenerateRequest {
    fn text(prompt: &str) -> Self {
        Self {
            contents: vec![RequestContent {
                parts: vec![RequestPart::Text {
                    text: prompt.to_string(),
                }],
            }],
        }
    }

    fn with_image(prompt: &str, image: &SlideImage) -> Self {
        let mut request = Self::text(prompt);
        request.contents[0].parts.push(RequestPart::InlineData {
            inline_data: InlineData {
                mime_type: image.mime_type.clone(),
                data: STANDARD.encode(&image.data),
            },
        });
        request
    }
}

/// Response body from `generateContent`.
#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateResponse {
    /// Concatenated text parts of the first candidate.
    fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .filter_map(|part| part.text.as_deref())
            .collect();
        (!text.trim().is_empty()).then_some(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_requires_key() {
        let err = GeminiClient::new(CheckerConfig::default()).err().unwrap();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_endpoint() {
        let client = GeminiClient::new(
            CheckerConfig::new("key").with_base_url("http://localhost:8080/v1beta/"),
        )
        .unwrap();
        assert_eq!(
            client.endpoint("gemini-1.5-flash"),
            "http://localhost:8080/v1beta/models/gemini-1.5-flash:generateContent"
        );
    }

    #[test]
    fn test_text_request_shape() {
        let body = serde_json::to_value(GenerateRequest::text("check this")).unwrap();
        assert_eq!(
            body,
            serde_json::json!({"contents": [{"parts": [{"text": "check this"}]}]})
        );
    }

    #[test]
    fn test_image_request_shape() {
        let image = SlideImage::new("image/png", vec![1, 2, 3]);
        let body = serde_json::to_value(GenerateRequest::with_image("look", &image)).unwrap();

        let parts = &body["contents"][0]["parts"];
        assert_eq!(parts[0]["text"], "look");
        assert_eq!(parts[1]["inline_data"]["mime_type"], "image/png");
        assert_eq!(parts[1]["inline_data"]["data"], "AQID");
    }

    #[test]
    fn test_response_text() {
        let response: GenerateResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"{\"status\":"},{"text":"\"ok\"}"}],"role":"model"}}]}"#,
        )
        .unwrap();
        assert_eq!(response.text().as_deref(), Some(r#"{"status":"ok"}"#));

        let empty: GenerateResponse = serde_json::from_str(r#"{"candidates":[]}"#).unwrap();
        assert!(empty.text().is_none());

        let blocked: GenerateResponse =
            serde_json::from_str(r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#).unwrap();
        assert!(blocked.text().is_none());
    }
}
