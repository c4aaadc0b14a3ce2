//! OpenAI client implementation.
//!
//! Supports chat-completion models such as GPT-4o, GPT-4 Turbo and
//! GPT-3.5 Turbo.
//!
//! # Example
//!
//! ```rust,ignore
//! use llm::remote::OpenAiClient;
//! use llm::{ModelConfig, ModelProvider, RemoteLlmConfig};
//!
//! let config = RemoteLlmConfig::from_env("OPENAI_API_KEY", "https://api.openai.com/v1")?;
//! let client = OpenAiClient::new(config)?;
//!
//! let result = client.call("Hello!", &ModelConfig::new("openai", "gpt-4o"), None).await?;
//! ```

use super::elapsed_ms;
use crate::config::{ModelConfig, RemoteLlmConfig};
use crate::error::{LlmError, Result};
use crate::pricing::OPENAI_PRICES;
use crate::provider::{ModelProvider, SegmentResult};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

/// OpenAI API client.
#[derive(Clone)]
pub struct OpenAiClient {
    config: RemoteLlmConfig,
    client: Client,
}

impl OpenAiClient {
    /// Create a new OpenAI client with the given configuration.
    pub fn new(config: RemoteLlmConfig) -> Result<Self> {
        let client = config.http_client()?;
        Ok(Self { config, client })
    }

    fn build_request(
        &self,
        prompt: &str,
        config: &ModelConfig,
        system_prompt: Option<&str>,
    ) -> OpenAiRequest {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = system_prompt.or(config.system_prompt.as_deref()) {
            messages.push(OpenAiMessage {
                role: "system".to_string(),
                content: Some(system.to_string()),
            });
        }
        messages.push(OpenAiMessage {
            role: "user".to_string(),
            content: Some(prompt.to_string()),
        });

        OpenAiRequest {
            model: config.model.clone(),
            messages,
            temperature: config.temperature,
            max_tokens: config.max_output_tokens,
        }
    }

    fn convert_response(&self, config: &ModelConfig, resp: OpenAiResponse, latency_ms: u64) -> Result<SegmentResult> {
        let choice = resp
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::InvalidResponse("missing choices[0]".to_string()))?;

        let (input_tokens, output_tokens) = resp
            .usage
            .map(|u| (u.prompt_tokens, u.completion_tokens))
            .unwrap_or((0, 0));

        Ok(SegmentResult {
            content: choice.message.content.unwrap_or_default(),
            tokens_used: input_tokens + output_tokens,
            cost_usd: OPENAI_PRICES.cost(&config.model, input_tokens, output_tokens),
            latency_ms,
            model: config.model.clone(),
            provider: "openai".to_string(),
        })
    }
}

#[async_trait]
impl ModelProvider for OpenAiClient {
    fn name(&self) -> &str {
        "openai"
    }

    async fn call(
        &self,
        prompt: &str,
        config: &ModelConfig,
        system_prompt: Option<&str>,
    ) -> Result<SegmentResult> {
        let url = format!("{}/chat/completions", self.config.base_url);
        let req_body = self.build_request(prompt, config, system_prompt);

        debug!(model = %config.model, "OpenAI request to {}", url);
        let start = Instant::now();

        let mut req = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .json(&req_body);

        if let Some(org) = &self.config.organization {
            req = req.header("OpenAI-Organization", org);
        }

        let response = req.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(LlmError::from_status("OpenAI", status, error_text));
        }

        let openai_resp: OpenAiResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        self.convert_response(config, openai_resp, elapsed_ms(start))
    }
}

// OpenAI API types
#[derive(Debug, Serialize)]
struct OpenAiRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAiMessage {
    role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
    usage: Option<OpenAiUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAiUsage {
    prompt_tokens: u64,
    completion_tokens: u64,
}
