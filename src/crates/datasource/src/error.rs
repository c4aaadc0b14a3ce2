//! Error types for data source adapters.

use crate::config::SourceKind;
use thiserror::Error;

/// Result type for data source operations.
pub type Result<T> = std::result::Result<T, SourceError>;

/// Errors raised while initializing or fetching from a data source.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Store configuration does not fit the adapter.
    #[error("Invalid store configuration: {0}")]
    InvalidConfig(String),

    /// Backend exists but was not compiled in.
    #[error("{kind} support is not compiled in (enable the `{feature}` feature)")]
    Unsupported {
        kind: SourceKind,
        feature: &'static str,
    },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Requested object, file or key does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Fetched data could not be decoded.
    #[error("Failed to parse data: {0}")]
    Parse(String),

    /// Error reported by a backend client.
    #[error("{backend} error: {message}")]
    Backend {
        backend: &'static str,
        message: String,
    },
}

impl SourceError {
    pub(crate) fn backend(backend: &'static str, err: impl std::fmt::Display) -> Self {
        SourceError::Backend {
            backend,
            message: err.to_string(),
        }
    }

    /// True when the error is a configuration problem rather than an I/O one.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            SourceError::InvalidConfig(_) | SourceError::Unsupported { .. }
        )
    }
}

impl From<serde_json::Error> for SourceError {
    fn from(err: serde_json::Error) -> Self {
        SourceError::Parse(err.to_string())
    }
}
