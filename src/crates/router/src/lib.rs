//! Segment router.
//!
//! Fetches text from a registered data source, splits it into bounded
//! segments, sends each segment to a model, and merges the outputs into one
//! result with cost, token and latency totals.
//!
//! # Pipeline
//!
//! ```text
//! route(binding, query, rule)
//!   -> resolve -> validate -> fetch -> chunk -> render -> dispatch -> aggregate -> assemble
//! ```
//!
//! - [`ChunkingEngine`] splits text (`fixed_size`, `semantic`, `sliding_window`)
//! - [`ResultAggregator`] merges outputs (`concatenate`, `majority_vote`,
//!   `average_score`)
//! - [`Router`] owns the binding, rule and provider registries and runs the
//!   pipeline, dispatching segments through a bounded pool
//!
//! # Example
//!
//! ```rust,ignore
//! use router::{ChunkingConfig, Router, RouterConfig, SourceKind, StoreConfig};
//! use llm::ModelConfig;
//!
//! let router = Router::new(RouterConfig::default().with_max_concurrency(4))?;
//! router.register_binding("inline", SourceKind::Content, StoreConfig::Content);
//! router.register_rule(
//!     "summarize",
//!     ModelConfig::new("openai", "gpt-4o-mini"),
//!     Some(ChunkingConfig::default().with_size(2000, 100)),
//! )?;
//!
//! let response = router.route("inline", &long_text, "summarize", None).await?;
//! println!("{} (${:.4})", response.result, response.metadata.total_cost_usd);
//! ```

pub mod aggregator;
pub mod chunking;
pub mod config;
pub mod error;
pub mod registry;
pub mod response;
pub mod router;
pub mod token;

pub use aggregator::{AggregatedResult, ResultAggregator};
pub use chunking::{Aggregation, ChunkStrategy, ChunkingConfig, ChunkingEngine};
pub use config::{RouterConfig, RouterFile, RuleEntry, DEFAULT_SYSTEM_PROMPT};
pub use error::{Result, RouterError, Stage};
pub use registry::{DataSourceBinding, Registry, RuleDefinition};
pub use response::{RouteMetadata, RouteResponse, SegmentView, Usage};
pub use router::Router;
pub use token::TokenEstimator;

pub use datasource::{SourceKind, StoreConfig};
pub use llm::{ModelConfig, ModelProvider, SegmentResult};
pub use tokio_util::sync::CancellationToken;
