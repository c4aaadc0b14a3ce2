//! Router configuration.
//!
//! A router file bundles process-wide settings with the bindings and rules
//! to register at startup:
//!
//! ```yaml
//! router:
//!   api_keys:
//!     anthropic: ${ANTHROPIC_API_KEY:}
//!   system_prompt: "You are a careful reviewer."
//!   prompt: "Evaluate the following text: {text}"
//!   max_concurrency: 4
//! bindings:
//!   - label: docs
//!     source_kind: json_file
//!     store_config:
//!       kind: json_file
//!       base_path: ./data
//! rules:
//!   - name: review
//!     model_config:
//!       provider: anthropic
//!       model: claude-3-5-sonnet-20241022
//!     chunking_config:
//!       chunk_size_tokens: 2000
//!       overlap_tokens: 100
//! ```

pub mod loader;

pub use loader::{load_yaml_config, load_yaml_file, parse_yaml_str};

use crate::chunking::ChunkingConfig;
use crate::error::{Result, RouterError};
use crate::registry::DataSourceBinding;
use llm::ModelConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Placeholder replaced by the segment text in prompt templates.
pub const TEXT_PLACEHOLDER: &str = "{text}";

/// Used when neither the rule nor the router sets a system prompt.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant.";

/// Process-wide router settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouterConfig {
    /// API keys by provider name. Missing keys are read from the
    /// provider's environment variable.
    #[serde(default)]
    pub api_keys: HashMap<String, String>,

    /// Chunk size for rules registered without a chunking config.
    #[serde(default = "default_chunk_size")]
    pub default_chunk_size: usize,

    /// Overlap for rules registered without a chunking config.
    #[serde(default = "default_overlap")]
    pub default_overlap: usize,

    #[serde(default)]
    pub system_prompt: Option<String>,

    /// Prompt template with exactly one `{text}` placeholder.
    #[serde(default)]
    pub prompt: Option<String>,

    /// Simultaneous model calls per route.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            api_keys: HashMap::new(),
            default_chunk_size: default_chunk_size(),
            default_overlap: default_overlap(),
            system_prompt: None,
            prompt: None,
            max_concurrency: default_max_concurrency(),
        }
    }
}

impl RouterConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_api_key(mut self, provider: impl Into<String>, key: impl Into<String>) -> Self {
        self.api_keys.insert(provider.into(), key.into());
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn with_prompt(mut self, template: impl Into<String>) -> Self {
        self.prompt = Some(template.into());
        self
    }

    pub fn with_max_concurrency(mut self, limit: usize) -> Self {
        self.max_concurrency = limit;
        self
    }

    pub fn with_chunk_defaults(mut self, chunk_size: usize, overlap: usize) -> Self {
        self.default_chunk_size = chunk_size;
        self.default_overlap = overlap;
        self
    }

    /// Chunking config given to rules registered without one.
    pub fn default_chunking(&self) -> ChunkingConfig {
        ChunkingConfig::default().with_size(self.default_chunk_size, self.default_overlap)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_concurrency == 0 {
            return Err(RouterError::InvalidConfig(
                "max_concurrency must be at least 1".to_string(),
            ));
        }

        if let Some(template) = &self.prompt {
            let placeholders = template.matches(TEXT_PLACEHOLDER).count();
            if placeholders != 1 {
                return Err(RouterError::InvalidConfig(format!(
                    "prompt template must contain exactly one {} placeholder, found {}",
                    TEXT_PLACEHOLDER, placeholders
                )));
            }
        }

        self.default_chunking().validate()
    }

    /// Render the prompt for one segment.
    pub fn render_prompt(&self, segment: &str) -> String {
        match &self.prompt {
            Some(template) => template.replacen(TEXT_PLACEHOLDER, segment, 1),
            None => segment.to_string(),
        }
    }

    /// First non-empty of the rule prompt, the router prompt, the built-in one.
    pub fn effective_system_prompt<'a>(&'a self, model_config: &'a ModelConfig) -> &'a str {
        [
            model_config.system_prompt.as_deref(),
            self.system_prompt.as_deref(),
        ]
        .into_iter()
        .flatten()
        .find(|p| !p.trim().is_empty())
        .unwrap_or(DEFAULT_SYSTEM_PROMPT)
    }
}

fn default_chunk_size() -> usize {
    8000
}

fn default_overlap() -> usize {
    500
}

fn default_max_concurrency() -> usize {
    1
}

/// A rule as written in a router file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleEntry {
    pub name: String,
    #[serde(alias = "model")]
    pub model_config: ModelConfig,
    /// Router defaults apply when absent.
    #[serde(default, alias = "chunking")]
    pub chunking_config: Option<ChunkingConfig>,
}

/// Settings, bindings and rules loaded together.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RouterFile {
    #[serde(default)]
    pub router: RouterConfig,
    #[serde(default)]
    pub bindings: Vec<DataSourceBinding>,
    #[serde(default)]
    pub rules: Vec<RuleEntry>,
}

impl RouterFile {
    /// Load from YAML, resolving `$include` and `${ENV:default}`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        load_yaml_config(path)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        parse_yaml_str(content)
    }
}
