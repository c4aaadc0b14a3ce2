//! Source kinds and their store configurations.
//!
//! `StoreConfig` is a tagged union: the variant *is* the kind, so a binding
//! whose config belongs to another kind is detected by comparing
//! [`StoreConfig::kind`] with the declared [`SourceKind`].

use crate::error::{Result, SourceError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Supported data source types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// The query is the content; nothing is fetched.
    Content,
    JsonFile,
    S3,
    Postgres,
    Redis,
    #[serde(rename = "mongodb")]
    MongoDb,
    #[serde(rename = "dynamodb")]
    DynamoDb,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SourceKind::Content => "content",
            SourceKind::JsonFile => "json_file",
            SourceKind::S3 => "s3",
            SourceKind::Postgres => "postgres",
            SourceKind::Redis => "redis",
            SourceKind::MongoDb => "mongodb",
            SourceKind::DynamoDb => "dynamodb",
        };
        f.write_str(name)
    }
}

/// S3 store configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct S3StoreConfig {
    pub region: String,
    pub bucket: String,
    #[serde(default)]
    pub access_key: Option<String>,
    #[serde(default)]
    pub secret_key: Option<String>,
    /// For S3-compatible services.
    #[serde(default)]
    pub endpoint_url: Option<String>,
}

/// MongoDB store configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MongoDbStoreConfig {
    pub connection_string: String,
    pub database: String,
}

/// PostgreSQL store configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostgresStoreConfig {
    pub connection_url: String,
    #[serde(default = "default_pg_max_connections")]
    pub max_connections: u32,
}

/// Redis store configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedisStoreConfig {
    #[serde(default = "default_redis_host")]
    pub host: String,
    #[serde(default = "default_redis_port")]
    pub port: u16,
    #[serde(default)]
    pub db: i64,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub ssl: bool,
}

impl RedisStoreConfig {
    /// Connection URL in `redis://[:password@]host:port/db` form.
    pub fn url(&self) -> String {
        let scheme = if self.ssl { "rediss" } else { "redis" };
        match &self.password {
            Some(pw) => format!("{}://:{}@{}:{}/{}", scheme, pw, self.host, self.port, self.db),
            None => format!("{}://{}:{}/{}", scheme, self.host, self.port, self.db),
        }
    }
}

impl Default for RedisStoreConfig {
    fn default() -> Self {
        Self {
            host: default_redis_host(),
            port: default_redis_port(),
            db: 0,
            password: None,
            ssl: false,
        }
    }
}

/// DynamoDB store configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DynamoDbStoreConfig {
    pub region: String,
    pub table_name: String,
    #[serde(default)]
    pub access_key: Option<String>,
    #[serde(default)]
    pub secret_key: Option<String>,
    #[serde(default)]
    pub endpoint_url: Option<String>,
}

/// JSON file store configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JsonFileStoreConfig {
    /// Base directory for relative query paths.
    #[serde(default)]
    pub base_path: Option<String>,
}

/// Store configuration, one variant per [`SourceKind`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StoreConfig {
    Content,
    JsonFile(JsonFileStoreConfig),
    S3(S3StoreConfig),
    Postgres(PostgresStoreConfig),
    Redis(RedisStoreConfig),
    #[serde(rename = "mongodb")]
    MongoDb(MongoDbStoreConfig),
    #[serde(rename = "dynamodb")]
    DynamoDb(DynamoDbStoreConfig),
}

impl StoreConfig {
    /// The source kind this configuration belongs to.
    pub fn kind(&self) -> SourceKind {
        match self {
            StoreConfig::Content => SourceKind::Content,
            StoreConfig::JsonFile(_) => SourceKind::JsonFile,
            StoreConfig::S3(_) => SourceKind::S3,
            StoreConfig::Postgres(_) => SourceKind::Postgres,
            StoreConfig::Redis(_) => SourceKind::Redis,
            StoreConfig::MongoDb(_) => SourceKind::MongoDb,
            StoreConfig::DynamoDb(_) => SourceKind::DynamoDb,
        }
    }

    /// Check that this config belongs to `expected` and that its required
    /// fields are filled in.
    pub fn validate_for(&self, expected: SourceKind) -> Result<()> {
        if self.kind() != expected {
            return Err(SourceError::InvalidConfig(format!(
                "source kind '{}' cannot use a '{}' store config",
                expected,
                self.kind()
            )));
        }

        let missing = match self {
            StoreConfig::Content | StoreConfig::JsonFile(_) => None,
            StoreConfig::S3(c) => first_empty(&[("region", &c.region), ("bucket", &c.bucket)]),
            StoreConfig::Postgres(c) => first_empty(&[("connection_url", &c.connection_url)]),
            StoreConfig::Redis(c) => first_empty(&[("host", &c.host)]),
            StoreConfig::MongoDb(c) => first_empty(&[
                ("connection_string", &c.connection_string),
                ("database", &c.database),
            ]),
            StoreConfig::DynamoDb(c) => {
                first_empty(&[("region", &c.region), ("table_name", &c.table_name)])
            }
        };

        match missing {
            Some(field) => Err(SourceError::InvalidConfig(format!(
                "{} store config requires '{}'",
                expected, field
            ))),
            None => Ok(()),
        }
    }
}

fn first_empty(fields: &[(&'static str, &String)]) -> Option<&'static str> {
    fields
        .iter()
        .find(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| *name)
}

fn default_pg_max_connections() -> u32 {
    5
}

fn default_redis_host() -> String {
    "localhost".to_string()
}

fn default_redis_port() -> u16 {
    6379
}
