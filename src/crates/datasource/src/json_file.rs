//! Local JSON files.

use crate::config::{JsonFileStoreConfig, SourceKind, StoreConfig};
use crate::error::{Result, SourceError};
use crate::extract::extract_text;
use crate::source::DataSource;
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::debug;

/// Reads a JSON file named by the query and extracts its text.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    config: JsonFileStoreConfig,
}

impl JsonFileSource {
    pub fn initialize(config: &StoreConfig) -> Result<Self> {
        match config {
            StoreConfig::JsonFile(c) => Ok(Self { config: c.clone() }),
            other => Err(SourceError::InvalidConfig(format!(
                "json_file source cannot use a '{}' store config",
                other.kind()
            ))),
        }
    }

    fn resolve(&self, query: &str) -> PathBuf {
        match &self.config.base_path {
            Some(base) => PathBuf::from(base).join(query),
            None => PathBuf::from(query),
        }
    }
}

#[async_trait]
impl DataSource for JsonFileSource {
    fn kind(&self) -> SourceKind {
        SourceKind::JsonFile
    }

    async fn fetch(&self, query: &str) -> Result<String> {
        let path = self.resolve(query);
        debug!(path = %path.display(), "reading JSON file");

        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(SourceError::NotFound(format!(
                    "JSON file not found: {}",
                    path.display()
                )))
            }
            Err(e) => return Err(e.into()),
        };

        let value: serde_json::Value = serde_json::from_str(&raw)?;
        Ok(extract_text(&value))
    }
}
