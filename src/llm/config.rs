//! Completion endpoint configuration

use std::time::Duration;

/// Default chat-completion endpoint
pub const DEFAULT_COMPLETION_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";

/// Default chat model
pub const DEFAULT_COMPLETION_MODEL: &str = "gpt-3.5-turbo";

/// Upper bound on reply length, in tokens
pub const DEFAULT_MAX_TOKENS: u32 = 150;

/// Sampling temperature sent with every request
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Bound on how long a single remote call may take
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for the completion client
#[derive(Clone, Debug)]
pub struct CompletionConfig {
    /// URL the chat request is POSTed to
    pub endpoint: String,

    /// Model identifier sent in the request body
    pub model: String,

    /// Maximum tokens the service may generate per reply
    pub max_tokens: u32,

    /// Temperature for sampling (0.0 = deterministic, 1.0+ = creative)
    pub temperature: f32,

    /// Bounded wait for the whole request
    pub timeout: Duration,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_COMPLETION_ENDPOINT.to_string(),
            model: DEFAULT_COMPLETION_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl CompletionConfig {
    /// Set the endpoint URL
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Set the model
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Check that the values can produce a valid request
    pub fn validate(&self) -> Result<(), String> {
        if self.endpoint.trim().is_empty() {
            return Err("Completion endpoint is required".to_string());
        }
        if self.model.trim().is_empty() {
            return Err("Completion model is required".to_string());
        }
        if self.max_tokens == 0 {
            return Err("max_tokens must be greater than zero".to_string());
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(format!(
                "temperature must be within 0.0..=2.0, got {}",
                self.temperature
            ));
        }
        if self.timeout.is_zero() {
            return Err("Completion timeout must be non-zero".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CompletionConfig::default();
        assert_eq!(config.max_tokens, 150);
        assert_eq!(config.temperature, 0.7);
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_pattern() {
        let config = CompletionConfig::default()
            .with_endpoint("http://localhost:9000/v1/chat/completions")
            .with_model("gpt-4o-mini")
            .with_timeout(Duration::from_millis(250));

        assert_eq!(config.endpoint, "http://localhost:9000/v1/chat/completions");
        assert_eq!(config.model, "gpt-4o-mini");
        assert_eq!(config.timeout, Duration::from_millis(250));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(CompletionConfig::default().with_endpoint(" ").validate().is_err());
        assert!(CompletionConfig::default()
            .with_timeout(Duration::ZERO)
            .validate()
            .is_err());

        let mut config = CompletionConfig::default();
        config.temperature = 3.5;
        assert!(config.validate().is_err());
    }
}
