//! Data source adapters for the segment router.
//!
//! A [`DataSource`] turns a query string into raw text. One adapter exists per
//! [`SourceKind`]; each is initialized from the matching [`StoreConfig`]
//! variant and rejects any other variant with [`SourceError::InvalidConfig`].
//!
//! Literal content and local JSON files are always available. The network
//! backends are behind cargo features:
//!
//! | kind | feature | query |
//! |---|---|---|
//! | `content` | - | the text itself |
//! | `json_file` | - | path, relative to `base_path` when set |
//! | `s3` | `s3` | object key |
//! | `postgres` | `postgres` | SQL statement |
//! | `redis` | `redis` | key name |
//! | `mongodb` | `mongodb` | collection name or `{"collection", "query"}` |
//! | `dynamodb` | `dynamodb` | `{}` or attribute equality filters |
//!
//! Structured results go through [`extract::extract_text`].

pub mod config;
pub mod content;
pub mod error;
pub mod extract;
pub mod json_file;
pub mod source;

#[cfg(feature = "dynamodb")]
pub mod dynamodb;
#[cfg(feature = "mongodb")]
pub mod mongodb;
#[cfg(feature = "postgres")]
pub mod postgres;
#[cfg(feature = "redis")]
pub mod redis;
#[cfg(feature = "s3")]
pub mod s3;

pub use config::{
    DynamoDbStoreConfig, JsonFileStoreConfig, MongoDbStoreConfig, PostgresStoreConfig,
    RedisStoreConfig, S3StoreConfig, SourceKind, StoreConfig,
};
pub use content::ContentSource;
pub use error::{Result, SourceError};
pub use extract::extract_text;
pub use json_file::JsonFileSource;
pub use source::{connect, DataSource};
