//! Google Gemini client implementation.
//!
//! Calls the `generateContent` endpoint of the Gemini API. When the response
//! carries no usage metadata, token counts are estimated at four characters
//! per token.

use super::elapsed_ms;
use crate::config::{ModelConfig, RemoteLlmConfig};
use crate::error::{LlmError, Result};
use crate::pricing::GEMINI_PRICES;
use crate::provider::{ModelProvider, SegmentResult};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

/// Google Gemini API client.
#[derive(Clone)]
pub struct GeminiClient {
    config: RemoteLlmConfig,
    client: Client,
}

impl GeminiClient {
    /// Create a new Gemini client with the given configuration.
    pub fn new(config: RemoteLlmConfig) -> Result<Self> {
        let client = config.http_client()?;
        Ok(Self { config, client })
    }

    fn build_request(
        &self,
        prompt: &str,
        config: &ModelConfig,
        system_prompt: Option<&str>,
    ) -> GeminiRequest {
        GeminiRequest {
            contents: vec![GeminiMessage {
                role: Some("user".to_string()),
                parts: vec![GeminiPart {
                    text: prompt.to_string(),
                }],
            }],
            system_instruction: system_prompt
                .or(config.system_prompt.as_deref())
                .map(|s| GeminiMessage {
                    role: None,
                    parts: vec![GeminiPart {
                        text: s.to_string(),
                    }],
                }),
            generation_config: GeminiGenerationConfig {
                temperature: config.temperature,
                max_output_tokens: config.max_output_tokens,
            },
        }
    }

    fn convert_response(
        &self,
        prompt: &str,
        config: &ModelConfig,
        resp: GeminiResponse,
        latency_ms: u64,
    ) -> Result<SegmentResult> {
        let candidate = resp
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::InvalidResponse("Gemini returned no candidates".to_string()))?;

        let content = match candidate.content {
            Some(content) => content.parts.into_iter().map(|p| p.text).collect::<String>(),
            None => {
                let reason = candidate.finish_reason.unwrap_or_else(|| "unknown".to_string());
                return Err(if reason == "SAFETY" {
                    LlmError::ProviderError(
                        "Gemini filtered the content for safety reasons".to_string(),
                    )
                } else {
                    LlmError::InvalidResponse(format!(
                        "Gemini returned no content (finish_reason: {})",
                        reason
                    ))
                });
            }
        };

        let (input_tokens, output_tokens) = match resp.usage_metadata {
            Some(u) => (u.prompt_token_count, u.candidates_token_count),
            None => ((prompt.len() / 4) as u64, (content.len() / 4) as u64),
        };

        Ok(SegmentResult {
            content,
            tokens_used: input_tokens + output_tokens,
            cost_usd: GEMINI_PRICES.cost(&config.model, input_tokens, output_tokens),
            latency_ms,
            model: config.model.clone(),
            provider: "gemini".to_string(),
        })
    }
}

#[async_trait]
impl ModelProvider for GeminiClient {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn call(
        &self,
        prompt: &str,
        config: &ModelConfig,
        system_prompt: Option<&str>,
    ) -> Result<SegmentResult> {
        // Gemini API URL format: base_url/models/{model}:generateContent
        let url = format!(
            "{}/models/{}:generateContent",
            self.config.base_url, config.model
        );
        let req_body = self.build_request(prompt, config, system_prompt);

        debug!(model = %config.model, "Gemini request to {}", url);
        let start = Instant::now();

        // Gemini uses API key as query parameter
        let response = self
            .client
            .post(&url)
            .query(&[("key", &self.config.api_key)])
            .json(&req_body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(LlmError::from_status("Gemini", status, error_text));
        }

        let gemini_resp: GeminiResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        self.convert_response(prompt, config, gemini_resp, elapsed_ms(start))
    }
}

// Gemini API types
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiMessage>,
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    usage_metadata: Option<GeminiUsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiMessage>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsageMetadata {
    #[serde(default)]
    prompt_token_count: u64,
    #[serde(default)]
    candidates_token_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> GeminiClient {
        GeminiClient::new(RemoteLlmConfig::new(
            "test-key",
            "https://generativelanguage.googleapis.com/v1beta",
        ))
        .unwrap()
    }

    #[test]
    fn test_request_serialization() {
        let config = ModelConfig::new("gemini", "gemini-1.5-flash");
        let req = client().build_request("Hello", &config, Some("Be brief"));
        let json = serde_json::to_value(&req).unwrap();

        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(json["contents"][0]["parts"][0]["text"], "Hello");
        assert_eq!(json["systemInstruction"]["parts"][0]["text"], "Be brief");
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 4096);
    }

    #[test]
    fn test_usage_estimated_when_missing() {
        let body = r#"{"candidates": [{"content": {"role": "model", "parts": [{"text": "abcdefgh"}]}}]}"#;
        let resp: GeminiResponse = serde_json::from_str(body).unwrap();
        let config = ModelConfig::new("gemini", "gemini-1.5-pro");
        let result = client()
            .convert_response("0123456789abcdef", &config, resp, 1)
            .unwrap();

        assert_eq!(result.content, "abcdefgh");
        // 16 / 4 input + 8 / 4 output
        assert_eq!(result.tokens_used, 6);
    }

    #[test]
    fn test_safety_block_is_provider_error() {
        let body = r#"{"candidates": [{"finishReason": "SAFETY"}]}"#;
        let resp: GeminiResponse = serde_json::from_str(body).unwrap();
        let config = ModelConfig::new("gemini", "gemini-1.5-pro");
        assert!(matches!(
            client().convert_response("x", &config, resp, 0),
            Err(LlmError::ProviderError(_))
        ));
    }
}
