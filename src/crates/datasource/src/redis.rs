//! Redis string values.

use crate::config::{SourceKind, StoreConfig};
use crate::error::{Result, SourceError};
use crate::source::DataSource;
use async_trait::async_trait;
use redis::AsyncCommands;
use tracing::{debug, info};

/// Returns the value stored at the key named by the query, or an empty
/// string when the key does not exist.
pub struct RedisSource {
    client: redis::Client,
}

impl RedisSource {
    pub fn initialize(config: &StoreConfig) -> Result<Self> {
        let c = match config {
            StoreConfig::Redis(c) => c,
            other => {
                return Err(SourceError::InvalidConfig(format!(
                    "redis source cannot use a '{}' store config",
                    other.kind()
                )))
            }
        };

        let client = redis::Client::open(c.url())
            .map_err(|e| SourceError::InvalidConfig(format!("redis: {}", e)))?;
        info!(host = %c.host, port = c.port, db = c.db, "Redis source initialized");

        Ok(Self { client })
    }
}

#[async_trait]
impl DataSource for RedisSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Redis
    }

    async fn fetch(&self, query: &str) -> Result<String> {
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| SourceError::backend("redis", e))?;

        debug!(key = %query, "fetching Redis key");
        let value: Option<String> = conn
            .get(query)
            .await
            .map_err(|e| SourceError::backend("redis", e))?;

        Ok(value.unwrap_or_default())
    }
}
