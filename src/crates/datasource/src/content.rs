//! Literal content: the query string is the text.

use crate::config::{SourceKind, StoreConfig};
use crate::error::{Result, SourceError};
use crate::source::DataSource;
use async_trait::async_trait;

#[derive(Debug, Clone, Default)]
pub struct ContentSource;

impl ContentSource {
    pub fn initialize(config: &StoreConfig) -> Result<Self> {
        match config {
            StoreConfig::Content => Ok(Self),
            other => Err(SourceError::InvalidConfig(format!(
                "content source cannot use a '{}' store config",
                other.kind()
            ))),
        }
    }
}

#[async_trait]
impl DataSource for ContentSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Content
    }

    async fn fetch(&self, query: &str) -> Result<String> {
        Ok(query.to_string())
    }
}
