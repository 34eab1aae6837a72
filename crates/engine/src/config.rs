//! Checker configuration: credentials, endpoint, models, timeout and pricing.

use slidecheck_core::{Error, PricingProfile, Result};

/// Default Gemini REST endpoint.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default model for both text-only and image-carrying checks.
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

/// Default per-request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Default per-1k-token prices used for per-call cost estimates.
pub const DEFAULT_PRICING: PricingProfile = PricingProfile {
    input_per_1k: 0.00025,
    output_per_1k: 0.0005,
    image_per_image: 0.0,
};

/// Configuration shared by the LLM transport and the verifier.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckerConfig {
    pub api_key: String,
    pub base_url: String,
    /// Model used for text-only slides and single statements.
    pub text_model: String,
    /// Model used when a slide carries an image.
    pub vision_model: String,
    pub timeout_secs: u64,
    pub pricing: PricingProfile,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            text_model: DEFAULT_MODEL.to_string(),
            vision_model: DEFAULT_MODEL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            pricing: DEFAULT_PRICING,
        }
    }
}

impl CheckerConfig {
    /// Create a configuration with the given API key and default settings.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Self::default()
        }
    }

    /// Build a configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary variable lookup.
    ///
    /// Unparsable numeric values fall back to their defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(key) = non_empty("GOOGLE_API_KEY").or_else(|| non_empty("GEMINI_API_KEY")) {
            config.api_key = key;
        }
        if let Some(url) = non_empty("SLIDECHECK_BASE_URL") {
            config.base_url = url;
        }
        if let Some(model) = non_empty("SLIDECHECK_TEXT_MODEL") {
            config.text_model = model;
        }
        if let Some(model) = non_empty("SLIDECHECK_VISION_MODEL") {
            config.vision_model = model;
        }
        if let Some(secs) = non_empty("SLIDECHECK_TIMEOUT_SECS").and_then(|v| v.trim().parse().ok()) {
            config.timeout_secs = secs;
        }
        if let Some(price) =
            non_empty("SLIDECHECK_INPUT_PRICE_PER_1K").and_then(|v| v.trim().parse().ok())
        {
            config.pricing.input_per_1k = price;
        }
        if let Some(price) =
            non_empty("SLIDECHECK_OUTPUT_PRICE_PER_1K").and_then(|v| v.trim().parse().ok())
        {
            config.pricing.output_per_1k = price;
        }

        config
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = api_key.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_text_model(mut self, model: impl Into<String>) -> Self {
        self.text_model = model.into();
        self
    }

    pub fn with_vision_model(mut self, model: impl Into<String>) -> Self {
        self.vision_model = model.into();
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn with_pricing(mut self, pricing: PricingProfile) -> Self {
        self.pricing = pricing;
        self
    }

    /// Check that the configuration can be used to reach the provider.
    pub fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(Error::Configuration(
                "API key is required (set GOOGLE_API_KEY or pass --api-key)".to_string(),
            ));
        }
        if self.base_url.trim().is_empty() {
            return Err(Error::Configuration("base URL must not be empty".to_string()));
        }
        if self.text_model.trim().is_empty() || self.vision_model.trim().is_empty() {
            return Err(Error::Configuration("model names must not be empty".to_string()));
        }
        if self.timeout_secs == 0 {
            return Err(Error::Configuration(
                "timeout must be at least one second".to_string(),
            ));
        }
        let prices = [self.pricing.input_per_1k, self.pricing.output_per_1k];
        if prices.iter().any(|p| !p.is_finite() || *p < 0.0) {
            return Err(Error::Configuration(
                "token prices must be non-negative numbers".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = CheckerConfig::default();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.text_model, "gemini-1.5-flash");
        assert_eq!(config.vision_model, "gemini-1.5-flash");
        assert_eq!(config.timeout_secs, 120);
        assert_eq!(config.pricing.input_per_1k, 0.00025);
        assert_eq!(config.pricing.output_per_1k, 0.0005);
    }

    #[test]
    fn test_from_lookup() {
        let config = CheckerConfig::from_lookup(lookup(&[
            ("GEMINI_API_KEY", "fallback-key"),
            ("SLIDECHECK_TEXT_MODEL", "gemini-pro"),
            ("SLIDECHECK_TIMEOUT_SECS", "30"),
            ("SLIDECHECK_OUTPUT_PRICE_PER_1K", "0.001"),
        ]));

        assert_eq!(config.api_key, "fallback-key");
        assert_eq!(config.text_model, "gemini-pro");
        assert_eq!(config.vision_model, DEFAULT_MODEL);
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.pricing.output_per_1k, 0.001);
    }

    #[test]
    fn test_primary_key_wins_and_bad_numbers_fall_back() {
        let config = CheckerConfig::from_lookup(lookup(&[
            ("GOOGLE_API_KEY", "primary"),
            ("GEMINI_API_KEY", "secondary"),
            ("SLIDECHECK_TIMEOUT_SECS", "soon"),
        ]));

        assert_eq!(config.api_key, "primary");
        assert_eq!(config.timeout_secs, DEFAULT_TIMEOUT_SECS);
    }

    #[test]
    fn test_validate() {
        assert!(CheckerConfig::new("key").validate().is_ok());

        let err = CheckerConfig::new("   ").validate().unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));

        let err = CheckerConfig::new("key").with_timeout_secs(0).validate().unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));

        let negative = PricingProfile {
            input_per_1k: -1.0,
            ..DEFAULT_PRICING
        };
        let err = CheckerConfig::new("key").with_pricing(negative).validate().unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }
}
