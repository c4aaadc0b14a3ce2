//! Remote model provider implementations.
//!
//! These providers require API keys:
//!
//! - **OpenAI** - chat completions
//! - **Anthropic** - Claude messages API
//! - **Gemini** - Google generateContent API

pub mod claude;
pub mod gemini;
pub mod openai;

pub use claude::ClaudeClient;
pub use gemini::GeminiClient;
pub use openai::OpenAiClient;

use crate::config::RemoteLlmConfig;
use crate::error::{LlmError, Result};
use crate::provider::ModelProvider;
use std::sync::Arc;

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";
pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Create the provider registered under `name` with the given API key.
pub fn create_provider(name: &str, api_key: &str) -> Result<Arc<dyn ModelProvider>> {
    match name {
        "openai" => Ok(Arc::new(OpenAiClient::new(RemoteLlmConfig::new(
            api_key,
            OPENAI_BASE_URL,
        ))?)),
        "anthropic" | "claude" => Ok(Arc::new(ClaudeClient::new(RemoteLlmConfig::new(
            api_key,
            ANTHROPIC_BASE_URL,
        ))?)),
        "gemini" | "google" => Ok(Arc::new(GeminiClient::new(RemoteLlmConfig::new(
            api_key,
            GEMINI_BASE_URL,
        ))?)),
        other => Err(LlmError::ConfigError(format!(
            "unknown model provider: '{}'",
            other
        ))),
    }
}

/// Elapsed milliseconds since `start`, saturating.
pub(crate) fn elapsed_ms(start: std::time::Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}
