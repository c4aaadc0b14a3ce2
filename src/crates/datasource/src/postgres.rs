//! PostgreSQL queries.

use crate::config::{SourceKind, StoreConfig};
use crate::error::{Result, SourceError};
use crate::extract::extract_records;
use crate::source::DataSource;
use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{Column, PgPool, Row};
use tracing::{debug, info};

/// Runs the query as SQL and extracts text from each returned row.
pub struct PostgresSource {
    pool: PgPool,
}

impl PostgresSource {
    pub async fn initialize(config: &StoreConfig) -> Result<Self> {
        let c = match config {
            StoreConfig::Postgres(c) => c,
            other => {
                return Err(SourceError::InvalidConfig(format!(
                    "postgres source cannot use a '{}' store config",
                    other.kind()
                )))
            }
        };

        let pool = PgPoolOptions::new()
            .max_connections(c.max_connections)
            .connect(&c.connection_url)
            .await
            .map_err(|e| SourceError::backend("postgres", e))?;
        info!(max_connections = c.max_connections, "Postgres source initialized");

        Ok(Self { pool })
    }
}

/// Decode a row into a JSON object, trying common column types in turn.
fn row_to_json(row: &PgRow) -> Map<String, Value> {
    let mut record = Map::new();
    for (i, column) in row.columns().iter().enumerate() {
        let value = if let Ok(v) = row.try_get::<Option<String>, _>(i) {
            v.map(Value::String)
        } else if let Ok(v) = row.try_get::<Option<i64>, _>(i) {
            v.map(Value::from)
        } else if let Ok(v) = row.try_get::<Option<i32>, _>(i) {
            v.map(Value::from)
        } else if let Ok(v) = row.try_get::<Option<f64>, _>(i) {
            v.map(Value::from)
        } else if let Ok(v) = row.try_get::<Option<bool>, _>(i) {
            v.map(Value::Bool)
        } else if let Ok(v) = row.try_get::<Option<Value>, _>(i) {
            v
        } else {
            None
        };
        record.insert(column.name().to_string(), value.unwrap_or(Value::Null));
    }
    record
}

#[async_trait]
impl DataSource for PostgresSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Postgres
    }

    async fn fetch(&self, query: &str) -> Result<String> {
        let rows = sqlx::query(query)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| SourceError::backend("postgres", e))?;
        debug!(rows = rows.len(), "Postgres query returned");

        Ok(extract_records(rows.iter().map(row_to_json).collect()))
    }

    async fn close(&self) -> Result<()> {
        self.pool.close().await;
        Ok(())
    }
}
