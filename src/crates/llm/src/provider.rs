//! The model-provider capability.

use crate::config::ModelConfig;
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Outcome of one model call over one segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentResult {
    /// Generated text.
    pub content: String,
    /// Input plus output tokens.
    pub tokens_used: u64,
    /// Cost of the call in USD.
    pub cost_usd: f64,
    /// Wall-clock latency of the call.
    pub latency_ms: u64,
    /// Model that served the call.
    pub model: String,
    /// Provider that served the call.
    pub provider: String,
}

impl SegmentResult {
    /// Result carrying only content, with zero accounting.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            tokens_used: 0,
            cost_usd: 0.0,
            latency_ms: 0,
            model: String::new(),
            provider: String::new(),
        }
    }
}

/// Trait for model providers. Each hosted API implements this once.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Provider name used in routing rules.
    fn name(&self) -> &str;

    /// Send one prompt and return the generated text with accounting.
    ///
    /// `system_prompt` is the already-resolved effective prompt; providers
    /// fall back to `config.system_prompt` only when it is `None`.
    async fn call(
        &self,
        prompt: &str,
        config: &ModelConfig,
        system_prompt: Option<&str>,
    ) -> Result<SegmentResult>;
}
