//! Configuration structures for model providers.

use crate::error::{LlmError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Which model a rule sends its segments to, and how.
///
/// Immutable once embedded in a rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Provider name, e.g. "openai", "anthropic", "gemini".
    pub provider: String,

    /// Model identifier, e.g. "claude-sonnet-4-20250514".
    pub model: String,

    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Upper bound on generated tokens per call.
    #[serde(default = "default_max_output_tokens", alias = "max_tokens")]
    pub max_output_tokens: u32,

    /// Rule-level system prompt; wins over the router default when non-empty.
    #[serde(default)]
    pub system_prompt: Option<String>,
}

impl ModelConfig {
    /// Create a model configuration with default sampling settings.
    pub fn new(provider: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
            temperature: default_temperature(),
            max_output_tokens: default_max_output_tokens(),
            system_prompt: None,
        }
    }

    /// Set the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the maximum number of output tokens.
    pub fn with_max_output_tokens(mut self, max_output_tokens: u32) -> Self {
        self.max_output_tokens = max_output_tokens;
        self
    }

    /// Set the rule-level system prompt.
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }
}

/// Connection settings for a remote provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteLlmConfig {
    /// API key for authentication.
    pub api_key: String,

    /// Base URL for the API.
    ///
    /// Examples:
    /// - OpenAI: "https://api.openai.com/v1"
    /// - Anthropic: "https://api.anthropic.com"
    /// - Gemini: "https://generativelanguage.googleapis.com/v1beta"
    pub base_url: String,

    /// Request timeout duration.
    #[serde(default = "default_timeout")]
    pub timeout: Duration,

    /// Organization ID (OpenAI only).
    pub organization: Option<String>,
}

impl RemoteLlmConfig {
    /// Create a new remote provider configuration.
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.into(),
            timeout: default_timeout(),
            organization: None,
        }
    }

    /// Create configuration from an environment variable holding the key.
    pub fn from_env(env_var: &str, base_url: impl Into<String>) -> Result<Self> {
        let api_key = std::env::var(env_var)
            .ok()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| LlmError::ApiKeyNotFound(format!("Environment variable: {}", env_var)))?;

        Ok(Self::new(api_key, base_url))
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the organization ID.
    pub fn with_organization(mut self, organization: impl Into<String>) -> Self {
        self.organization = Some(organization.into());
        self
    }

    pub(crate) fn http_client(&self) -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| LlmError::ConfigError(format!("Failed to create HTTP client: {}", e)))
    }
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_output_tokens() -> u32 {
    4096
}

fn default_timeout() -> Duration {
    Duration::from_secs(60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_config_defaults_from_yaml_like_json() {
        let config: ModelConfig =
            serde_json::from_str(r#"{"provider": "anthropic", "model": "claude-3-haiku-20240307"}"#)
                .unwrap();
        assert_eq!(config.temperature, 0.7);
        assert_eq!(config.max_output_tokens, 4096);
        assert!(config.system_prompt.is_none());
    }

    #[test]
    fn test_max_tokens_alias() {
        let config: ModelConfig =
            serde_json::from_str(r#"{"provider": "openai", "model": "gpt-4o", "max_tokens": 256}"#)
                .unwrap();
        assert_eq!(config.max_output_tokens, 256);
    }

    #[test]
    fn test_missing_env_key() {
        let err = RemoteLlmConfig::from_env("SEGMENT_ROUTER_TEST_UNSET_KEY", "http://localhost")
            .unwrap_err();
        assert!(err.is_auth_error());
    }
}
