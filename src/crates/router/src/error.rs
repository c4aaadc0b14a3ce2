//! Error types for routing.

use datasource::SourceError;
use llm::LlmError;
use std::fmt;
use thiserror::Error;

/// Result type for router operations.
pub type Result<T> = std::result::Result<T, RouterError>;

/// Pipeline stage at which a route failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Registry lookup of binding, rule and provider.
    Resolve,
    /// Store config and chunking config checks.
    Validate,
    /// Data source connect and fetch.
    Fetch,
    /// Per-segment model calls.
    Dispatch,
    /// Configuration loading and router construction.
    Setup,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Resolve => write!(f, "resolve"),
            Stage::Validate => write!(f, "validate"),
            Stage::Fetch => write!(f, "fetch"),
            Stage::Dispatch => write!(f, "dispatch"),
            Stage::Setup => write!(f, "setup"),
        }
    }
}

/// Errors that can occur while registering or routing.
#[derive(Debug, Error)]
pub enum RouterError {
    /// Unknown binding label, rule name or provider.
    #[error("{entity} not found: {name}")]
    NotFound { entity: &'static str, name: String },

    /// Store config mismatch or malformed chunking parameters.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The data source failed to connect or fetch.
    #[error("Fetch from binding '{binding}' failed: {source}")]
    SourceFetchFailed {
        binding: String,
        #[source]
        source: SourceError,
    },

    /// A model call failed; remaining segments were abandoned.
    #[error("Model call for segment {segment} failed: {source}")]
    ModelCallFailed {
        segment: usize,
        #[source]
        source: LlmError,
    },

    /// The caller cancelled the route.
    #[error("Route cancelled during {stage}")]
    Cancelled { stage: Stage },

    /// Configuration file could not be loaded.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl RouterError {
    pub(crate) fn not_found(entity: &'static str, name: impl Into<String>) -> Self {
        RouterError::NotFound {
            entity,
            name: name.into(),
        }
    }

    /// Stage that produced this error.
    pub fn stage(&self) -> Stage {
        match self {
            RouterError::NotFound { .. } => Stage::Resolve,
            RouterError::InvalidConfig(_) => Stage::Validate,
            RouterError::SourceFetchFailed { .. } => Stage::Fetch,
            RouterError::ModelCallFailed { .. } => Stage::Dispatch,
            RouterError::Cancelled { stage } => *stage,
            RouterError::Config(_) => Stage::Setup,
        }
    }

    /// Index of the failing segment for dispatch failures.
    pub fn segment(&self) -> Option<usize> {
        match self {
            RouterError::ModelCallFailed { segment, .. } => Some(*segment),
            _ => None,
        }
    }
}
