//! DynamoDB tables.

use crate::config::{DynamoDbStoreConfig, SourceKind, StoreConfig};
use crate::error::{Result, SourceError};
use crate::extract::{extract_records, value_to_string};
use crate::source::DataSource;
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_dynamodb::config::{Credentials, Region};
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client;
use serde_json::{Map, Value};
use std::collections::HashMap;
use tracing::{debug, info};

/// Scans the configured table.
///
/// The query is a JSON object of attribute equality filters, applied to each
/// scanned item. `{}` or an empty query returns every item.
pub struct DynamoDbSource {
    client: Client,
    table_name: String,
}

impl DynamoDbSource {
    pub async fn initialize(config: &StoreConfig) -> Result<Self> {
        let c = match config {
            StoreConfig::DynamoDb(c) => c,
            other => {
                return Err(SourceError::InvalidConfig(format!(
                    "dynamodb source cannot use a '{}' store config",
                    other.kind()
                )))
            }
        };

        let client = build_client(c).await;
        info!(table = %c.table_name, region = %c.region, "DynamoDB source initialized");

        Ok(Self {
            client,
            table_name: c.table_name.clone(),
        })
    }
}

async fn build_client(c: &DynamoDbStoreConfig) -> Client {
    let mut loader =
        aws_config::defaults(BehaviorVersion::latest()).region(Region::new(c.region.clone()));

    if let (Some(key), Some(secret)) = (&c.access_key, &c.secret_key) {
        loader = loader.credentials_provider(Credentials::new(
            key,
            secret,
            None,
            None,
            "segment-router-dynamodb",
        ));
    }
    if let Some(endpoint) = c.endpoint_url.as_deref().filter(|e| !e.is_empty()) {
        loader = loader.endpoint_url(endpoint);
    }

    Client::new(&loader.load().await)
}

fn attribute_to_json(value: &AttributeValue) -> Value {
    match value {
        AttributeValue::S(s) => Value::String(s.clone()),
        // Numbers keep their exact decimal text.
        AttributeValue::N(n) => Value::String(n.clone()),
        AttributeValue::Bool(b) => Value::Bool(*b),
        AttributeValue::Null(_) => Value::Null,
        AttributeValue::Ss(items) | AttributeValue::Ns(items) => {
            Value::Array(items.iter().cloned().map(Value::String).collect())
        }
        AttributeValue::L(items) => Value::Array(items.iter().map(attribute_to_json).collect()),
        AttributeValue::M(map) => Value::Object(item_to_json(map)),
        AttributeValue::B(blob) => {
            Value::String(String::from_utf8_lossy(blob.as_ref()).into_owned())
        }
        _ => Value::Null,
    }
}

fn item_to_json(item: &HashMap<String, AttributeValue>) -> Map<String, Value> {
    item.iter()
        .map(|(k, v)| (k.clone(), attribute_to_json(v)))
        .collect()
}

fn parse_filters(query: &str) -> Result<Map<String, Value>> {
    if query.trim().is_empty() {
        return Ok(Map::new());
    }
    match serde_json::from_str::<Value>(query)? {
        Value::Object(map) => Ok(map),
        _ => Err(SourceError::Parse(
            "DynamoDB query must be a JSON object of attribute filters".to_string(),
        )),
    }
}

fn matches_filters(record: &Map<String, Value>, filters: &Map<String, Value>) -> bool {
    filters.iter().all(|(key, expected)| {
        record
            .get(key)
            .map(|actual| value_to_string(actual) == value_to_string(expected))
            .unwrap_or(false)
    })
}

#[async_trait]
impl DataSource for DynamoDbSource {
    fn kind(&self) -> SourceKind {
        SourceKind::DynamoDb
    }

    async fn fetch(&self, query: &str) -> Result<String> {
        let filters = parse_filters(query)?;
        debug!(table = %self.table_name, filters = filters.len(), "scanning DynamoDB table");

        let mut pages = self
            .client
            .scan()
            .table_name(&self.table_name)
            .into_paginator()
            .items()
            .send();

        let mut records = Vec::new();
        while let Some(item) = pages.next().await {
            let item = item.map_err(|e| SourceError::backend("dynamodb", e))?;
            let record = item_to_json(&item);
            if matches_filters(&record, &filters) {
                records.push(record);
            }
        }

        Ok(extract_records(records))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_attribute_conversion() {
        let mut nested = HashMap::new();
        nested.insert("inner".to_string(), AttributeValue::Bool(true));

        let mut item = HashMap::new();
        item.insert("id".to_string(), AttributeValue::N("42".to_string()));
        item.insert("content".to_string(), AttributeValue::S("hi".to_string()));
        item.insert("meta".to_string(), AttributeValue::M(nested));
        item.insert(
            "tags".to_string(),
            AttributeValue::L(vec![AttributeValue::S("a".to_string())]),
        );

        let record = item_to_json(&item);
        assert_eq!(record["id"], json!("42"));
        assert_eq!(record["meta"], json!({"inner": true}));
        assert_eq!(record["tags"], json!(["a"]));
        assert_eq!(extract_records(vec![record]), "hi");
    }

    #[test]
    fn test_filters() {
        let record = json!({"id": "42", "lang": "en"});
        let record = record.as_object().unwrap();

        assert!(matches_filters(record, &parse_filters("{}").unwrap()));
        assert!(matches_filters(record, &parse_filters("").unwrap()));
        assert!(matches_filters(record, &parse_filters(r#"{"id": 42}"#).unwrap()));
        assert!(!matches_filters(record, &parse_filters(r#"{"lang": "de"}"#).unwrap()));
        assert!(parse_filters("[1]").is_err());
    }
}
