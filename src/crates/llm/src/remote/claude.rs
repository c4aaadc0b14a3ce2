//! Anthropic Claude client implementation.
//!
//! Provides integration with Anthropic's messages API:
//! - Claude 3 Opus / Haiku
//! - Claude 3.5 Sonnet
//! - Claude Sonnet 4
//!
//! # Example
//!
//! ```rust,ignore
//! use llm::remote::ClaudeClient;
//! use llm::{ModelConfig, ModelProvider, RemoteLlmConfig};
//!
//! let config = RemoteLlmConfig::from_env("ANTHROPIC_API_KEY", "https://api.anthropic.com")?;
//! let client = ClaudeClient::new(config)?;
//!
//! let model = ModelConfig::new("anthropic", "claude-sonnet-4-20250514");
//! let result = client.call("Hello!", &model, None).await?;
//! ```

use super::elapsed_ms;
use crate::config::{ModelConfig, RemoteLlmConfig};
use crate::error::{LlmError, Result};
use crate::pricing::ANTHROPIC_PRICES;
use crate::provider::{ModelProvider, SegmentResult};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Anthropic Claude API client.
#[derive(Clone)]
pub struct ClaudeClient {
    config: RemoteLlmConfig,
    client: Client,
}

impl ClaudeClient {
    /// Create a new Claude client with the given configuration.
    pub fn new(config: RemoteLlmConfig) -> Result<Self> {
        let client = config.http_client()?;
        Ok(Self { config, client })
    }

    /// Claude takes the system prompt as a top-level field, not a message.
    fn build_request(
        &self,
        prompt: &str,
        config: &ModelConfig,
        system_prompt: Option<&str>,
    ) -> ClaudeRequest {
        ClaudeRequest {
            model: config.model.clone(),
            messages: vec![ClaudeMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            system: system_prompt
                .or(config.system_prompt.as_deref())
                .map(str::to_string),
            max_tokens: config.max_output_tokens,
            temperature: config.temperature,
        }
    }

    fn convert_response(&self, config: &ModelConfig, resp: ClaudeResponse, latency_ms: u64) -> SegmentResult {
        let content = resp
            .content
            .iter()
            .filter(|c| c.content_type == "text")
            .filter_map(|c| c.text.as_deref())
            .collect::<String>();

        let input_tokens = resp.usage.input_tokens;
        let output_tokens = resp.usage.output_tokens;

        SegmentResult {
            content,
            tokens_used: input_tokens + output_tokens,
            cost_usd: ANTHROPIC_PRICES.cost(&config.model, input_tokens, output_tokens),
            latency_ms,
            model: config.model.clone(),
            provider: "anthropic".to_string(),
        }
    }
}

#[async_trait]
impl ModelProvider for ClaudeClient {
    fn name(&self) -> &str {
        "anthropic"
    }

    async fn call(
        &self,
        prompt: &str,
        config: &ModelConfig,
        system_prompt: Option<&str>,
    ) -> Result<SegmentResult> {
        let url = format!("{}/v1/messages", self.config.base_url);
        let req_body = self.build_request(prompt, config, system_prompt);

        debug!(model = %config.model, "Anthropic request to {}", url);
        let start = Instant::now();

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&req_body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(LlmError::from_status("Claude", status, error_text));
        }

        let claude_resp: ClaudeResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        Ok(self.convert_response(config, claude_resp, elapsed_ms(start)))
    }
}

// Claude API types
#[derive(Debug, Serialize)]
struct ClaudeRequest {
    model: String,
    messages: Vec<ClaudeMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize, Deserialize)]
struct ClaudeMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ClaudeResponse {
    content: Vec<ClaudeContent>,
    usage: ClaudeUsage,
}

#[derive(Debug, Deserialize)]
struct ClaudeContent {
    #[serde(rename = "type")]
    content_type: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ClaudeUsage {
    input_tokens: u64,
    output_tokens: u64,
}
