//! The data-source capability and the adapter factory.

use crate::config::{SourceKind, StoreConfig};
use crate::content::ContentSource;
use crate::error::{Result, SourceError};
use crate::json_file::JsonFileSource;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// A backend that turns a query into raw text.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Kind of backend this adapter serves.
    fn kind(&self) -> SourceKind;

    /// Fetch text for `query`. Semantics of the query depend on the kind.
    async fn fetch(&self, query: &str) -> Result<String>;

    /// Release connections. Idempotent.
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// Validate `config` against `kind` and initialize the matching adapter.
pub async fn connect(kind: SourceKind, config: &StoreConfig) -> Result<Arc<dyn DataSource>> {
    config.validate_for(kind)?;
    debug!(%kind, "initializing data source");

    let source: Arc<dyn DataSource> = match kind {
        SourceKind::Content => Arc::new(ContentSource::initialize(config)?),
        SourceKind::JsonFile => Arc::new(JsonFileSource::initialize(config)?),
        SourceKind::S3 => connect_s3(config).await?,
        SourceKind::Postgres => connect_postgres(config).await?,
        SourceKind::Redis => connect_redis(config).await?,
        SourceKind::MongoDb => connect_mongodb(config).await?,
        SourceKind::DynamoDb => connect_dynamodb(config).await?,
    };

    Ok(source)
}

#[cfg(feature = "s3")]
async fn connect_s3(config: &StoreConfig) -> Result<Arc<dyn DataSource>> {
    Ok(Arc::new(crate::s3::S3Source::initialize(config)?))
}

#[cfg(not(feature = "s3"))]
async fn connect_s3(_config: &StoreConfig) -> Result<Arc<dyn DataSource>> {
    Err(unsupported(SourceKind::S3, "s3"))
}

#[cfg(feature = "postgres")]
async fn connect_postgres(config: &StoreConfig) -> Result<Arc<dyn DataSource>> {
    Ok(Arc::new(crate::postgres::PostgresSource::initialize(config).await?))
}

#[cfg(not(feature = "postgres"))]
async fn connect_postgres(_config: &StoreConfig) -> Result<Arc<dyn DataSource>> {
    Err(unsupported(SourceKind::Postgres, "postgres"))
}

#[cfg(feature = "redis")]
async fn connect_redis(config: &StoreConfig) -> Result<Arc<dyn DataSource>> {
    Ok(Arc::new(crate::redis::RedisSource::initialize(config)?))
}

#[cfg(not(feature = "redis"))]
async fn connect_redis(_config: &StoreConfig) -> Result<Arc<dyn DataSource>> {
    Err(unsupported(SourceKind::Redis, "redis"))
}

#[cfg(feature = "mongodb")]
async fn connect_mongodb(config: &StoreConfig) -> Result<Arc<dyn DataSource>> {
    Ok(Arc::new(crate::mongodb::MongoDbSource::initialize(config).await?))
}

#[cfg(not(feature = "mongodb"))]
async fn connect_mongodb(_config: &StoreConfig) -> Result<Arc<dyn DataSource>> {
    Err(unsupported(SourceKind::MongoDb, "mongodb"))
}

#[cfg(feature = "dynamodb")]
async fn connect_dynamodb(config: &StoreConfig) -> Result<Arc<dyn DataSource>> {
    Ok(Arc::new(crate::dynamodb::DynamoDbSource::initialize(config).await?))
}

#[cfg(not(feature = "dynamodb"))]
async fn connect_dynamodb(_config: &StoreConfig) -> Result<Arc<dyn DataSource>> {
    Err(unsupported(SourceKind::DynamoDb, "dynamodb"))
}

#[allow(dead_code)]
fn unsupported(kind: SourceKind, feature: &'static str) -> SourceError {
    SourceError::Unsupported { kind, feature }
}
