//! Amazon S3 (and S3-compatible) objects.

use crate::config::{S3StoreConfig, SourceKind, StoreConfig};
use crate::error::{Result, SourceError};
use crate::extract::extract_text;
use crate::source::DataSource;
use async_trait::async_trait;
use object_store::aws::AmazonS3Builder;
use object_store::path::Path as ObjectPath;
use object_store::ObjectStore;
use std::sync::Arc;
use tracing::{debug, info};

/// Reads the object whose key is the query.
///
/// JSON objects are run through text extraction; anything else is returned
/// as UTF-8 text.
pub struct S3Source {
    store: Arc<dyn ObjectStore>,
    bucket: String,
}

impl S3Source {
    pub fn initialize(config: &StoreConfig) -> Result<Self> {
        let c = match config {
            StoreConfig::S3(c) => c,
            other => {
                return Err(SourceError::InvalidConfig(format!(
                    "s3 source cannot use a '{}' store config",
                    other.kind()
                )))
            }
        };

        let store = build_store(c)?;
        info!(bucket = %c.bucket, region = %c.region, "S3 source initialized");

        Ok(Self {
            store: Arc::new(store),
            bucket: c.bucket.clone(),
        })
    }
}

fn build_store(c: &S3StoreConfig) -> Result<object_store::aws::AmazonS3> {
    let mut builder = AmazonS3Builder::new().with_region(&c.region);

    if let Some(ref key) = c.access_key {
        builder = builder.with_access_key_id(key);
    }
    if let Some(ref secret) = c.secret_key {
        builder = builder.with_secret_access_key(secret);
    }

    match c.endpoint_url.as_deref().filter(|e| !e.is_empty()) {
        Some(endpoint) => {
            let endpoint_url = if endpoint.starts_with("http://") || endpoint.starts_with("https://")
            {
                endpoint.to_string()
            } else {
                format!("https://{}", endpoint)
            };
            builder = builder
                .with_bucket_name(&c.bucket)
                .with_endpoint(&endpoint_url)
                .with_allow_http(endpoint_url.starts_with("http://"));
        }
        None => {
            builder = builder.with_url(format!("s3://{}", c.bucket));
        }
    }

    builder
        .build()
        .map_err(|e| SourceError::InvalidConfig(format!("S3 store: {}", e)))
}

#[async_trait]
impl DataSource for S3Source {
    fn kind(&self) -> SourceKind {
        SourceKind::S3
    }

    async fn fetch(&self, query: &str) -> Result<String> {
        let path = ObjectPath::from(query);
        debug!(bucket = %self.bucket, key = %query, "fetching S3 object");

        let result = match self.store.get(&path).await {
            Ok(result) => result,
            Err(object_store::Error::NotFound { .. }) => {
                return Err(SourceError::NotFound(format!(
                    "s3://{}/{}",
                    self.bucket, query
                )))
            }
            Err(e) => return Err(SourceError::backend("s3", e)),
        };
        let data = result
            .bytes()
            .await
            .map_err(|e| SourceError::backend("s3", e))?;

        let text = String::from_utf8(data.to_vec())
            .map_err(|e| SourceError::Parse(format!("object is not UTF-8: {}", e)))?;

        match serde_json::from_str::<serde_json::Value>(&text) {
            Ok(value) => Ok(extract_text(&value)),
            Err(_) => Ok(text),
        }
    }
}
