//! MongoDB collections.

use crate::config::{SourceKind, StoreConfig};
use crate::error::{Result, SourceError};
use crate::extract::extract_text;
use crate::source::DataSource;
use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{self, Bson, Document};
use mongodb::{Client, Database};
use serde_json::Value;
use tracing::{debug, info};

/// Finds documents in a collection.
///
/// The query is either a bare collection name or a JSON object
/// `{"collection": "...", "query": {...}}` with a filter document.
pub struct MongoDbSource {
    client: Client,
    database: Database,
}

impl MongoDbSource {
    pub async fn initialize(config: &StoreConfig) -> Result<Self> {
        let c = match config {
            StoreConfig::MongoDb(c) => c,
            other => {
                return Err(SourceError::InvalidConfig(format!(
                    "mongodb source cannot use a '{}' store config",
                    other.kind()
                )))
            }
        };

        let client = Client::with_uri_str(&c.connection_string)
            .await
            .map_err(|e| SourceError::backend("mongodb", e))?;
        let database = client.database(&c.database);
        info!(database = %c.database, "MongoDB source initialized");

        Ok(Self { client, database })
    }
}

/// Split a query into collection name and filter document.
fn parse_query(query: &str) -> Result<(String, Document)> {
    match serde_json::from_str::<Value>(query) {
        Ok(Value::Object(map)) => {
            let collection = map
                .get("collection")
                .and_then(Value::as_str)
                .ok_or_else(|| {
                    SourceError::Parse("MongoDB query object requires 'collection'".to_string())
                })?
                .to_string();
            let filter = match map.get("query") {
                Some(filter) => {
                    bson::to_document(filter).map_err(|e| SourceError::Parse(e.to_string()))?
                }
                None => Document::new(),
            };
            Ok((collection, filter))
        }
        _ => Ok((query.to_string(), Document::new())),
    }
}

#[async_trait]
impl DataSource for MongoDbSource {
    fn kind(&self) -> SourceKind {
        SourceKind::MongoDb
    }

    async fn fetch(&self, query: &str) -> Result<String> {
        let (collection, filter) = parse_query(query)?;
        debug!(collection = %collection, "querying MongoDB");

        let cursor = self
            .database
            .collection::<Document>(&collection)
            .find(filter)
            .await
            .map_err(|e| SourceError::backend("mongodb", e))?;
        let docs: Vec<Document> = cursor
            .try_collect()
            .await
            .map_err(|e| SourceError::backend("mongodb", e))?;

        let values: Vec<Value> = docs
            .into_iter()
            .map(|doc| Bson::Document(doc).into_relaxed_extjson())
            .collect();
        Ok(extract_text(&Value::Array(values)))
    }

    async fn close(&self) -> Result<()> {
        self.client.clone().shutdown().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_collection_name() {
        let (collection, filter) = parse_query("articles").unwrap();
        assert_eq!(collection, "articles");
        assert!(filter.is_empty());
    }

    #[test]
    fn test_query_object() {
        let (collection, filter) =
            parse_query(r#"{"collection": "articles", "query": {"lang": "en"}}"#).unwrap();
        assert_eq!(collection, "articles");
        assert_eq!(filter.get_str("lang").unwrap(), "en");
    }

    #[test]
    fn test_query_object_without_collection() {
        assert!(parse_query(r#"{"query": {}}"#).is_err());
    }
}
