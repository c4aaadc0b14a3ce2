//! Model provider adapters for the segment router.
//!
//! Each provider wraps one hosted LLM API behind the [`ModelProvider`] trait:
//! a single `call` that sends one prompt and returns a [`SegmentResult`] with
//! the generated text, token usage, cost and latency.
//!
//! # Remote Providers
//!
//! - **OpenAI** - chat completions API (GPT-4o, GPT-4, GPT-3.5)
//! - **Anthropic** - messages API (Claude 3, 3.5, 4)
//! - **Gemini** - Google generative language API (Gemini 1.5)
//!
//! Cost is computed from a static per-model [`PriceTable`] owned by each
//! provider. Unknown model names are billed at the provider's default rate.
//!
//! # Example
//!
//! ```rust,ignore
//! use llm::{ModelConfig, ModelProvider, RemoteLlmConfig};
//! use llm::remote::OpenAiClient;
//!
//! let client = OpenAiClient::new(RemoteLlmConfig::from_env(
//!     "OPENAI_API_KEY",
//!     "https://api.openai.com/v1",
//! )?)?;
//!
//! let config = ModelConfig::new("openai", "gpt-4o-mini").with_temperature(0.2);
//! let result = client.call("Summarize: ...", &config, None).await?;
//! println!("{} (${:.6})", result.content, result.cost_usd);
//! ```

pub mod config;
pub mod error;
pub mod pricing;
pub mod provider;

#[cfg(feature = "remote")]
pub mod remote;

pub use config::{ModelConfig, RemoteLlmConfig};
pub use error::{LlmError, Result};
pub use pricing::{PriceTable, Rate};
pub use provider::{ModelProvider, SegmentResult};

#[cfg(feature = "remote")]
pub use remote::create_provider;
