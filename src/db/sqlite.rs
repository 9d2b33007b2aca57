//! SQLite database client implementation.
//!
//! Provides the `SqliteClient` struct that implements the `DatabaseClient`
//! trait for the embedded engine using sqlx.

use crate::config::DatabaseConfig;
use crate::db::{ColumnInfo, DatabaseClient, QueryResult, Row, Value};
use crate::error::{RelayError, Result};
use async_trait::async_trait;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Column as SqlxColumn, Row as SqlxRow, TypeInfo};
use std::time::{Duration, Instant};
use tracing::debug;

/// Query timeout in seconds.
const QUERY_TIMEOUT_SECS: u64 = 30;

/// SQLite database client.
///
/// Holds a pool capped at one connection: an in-memory database exists per
/// connection, and a single writer keeps file-backed mode serialized too.
#[derive(Debug)]
pub struct SqliteClient {
    pool: SqlitePool,
}

impl SqliteClient {
    /// Opens the database described by the config.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let url = config.connection_url();
        debug!("Opening database: {}", url);

        // The connection must never be reaped: an in-memory database dies
        // with its connection.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .acquire_timeout(Duration::from_secs(10))
            .connect(&url)
            .await
            .map_err(|e| RelayError::query(format!("Cannot open database: {e}")))?;

        Ok(Self { pool })
    }
}

#[async_trait]
impl DatabaseClient for SqliteClient {
    async fn execute_query(&self, sql: &str) -> Result<QueryResult> {
        let start = Instant::now();

        let result = tokio::time::timeout(
            Duration::from_secs(QUERY_TIMEOUT_SECS),
            sqlx::query(sql).fetch_all(&self.pool),
        )
        .await
        .map_err(|_| {
            RelayError::query(format!(
                "Query timed out after {QUERY_TIMEOUT_SECS} seconds"
            ))
        })?
        .map_err(|e| RelayError::query(e.to_string()))?;

        let columns: Vec<ColumnInfo> = result
            .first()
            .map(|first_row| {
                first_row
                    .columns()
                    .iter()
                    .map(|col| ColumnInfo::new(col.name(), col.type_info().name()))
                    .collect()
            })
            .unwrap_or_default();

        let rows: Vec<Row> = result.iter().map(convert_row).collect();

        debug!("Executed query in {:?}: {} rows", start.elapsed(), rows.len());

        Ok(QueryResult { columns, rows })
    }

    async fn close(&self) -> Result<()> {
        self.pool.close().await;
        Ok(())
    }
}

/// Converts a sqlx row into the relay's typed row representation.
///
/// SQLite columns are dynamically typed, so the declared type only guides
/// the first decode attempt; mismatches fall back to text, then blob.
fn convert_row(row: &SqliteRow) -> Row {
    row.columns()
        .iter()
        .enumerate()
        .map(|(i, col)| convert_value(row, i, col.type_info().name()))
        .collect()
}

fn convert_value(row: &SqliteRow, index: usize, type_name: &str) -> Value {
    match type_name.to_uppercase().as_str() {
        "NULL" => Value::Null,
        "INTEGER" | "INT" | "BIGINT" => match row.try_get::<Option<i64>, _>(index) {
            Ok(v) => v.into(),
            Err(_) => fallback_value(row, index),
        },
        "REAL" | "FLOAT" | "DOUBLE" | "NUMERIC" => match row.try_get::<Option<f64>, _>(index) {
            Ok(v) => v.into(),
            Err(_) => fallback_value(row, index),
        },
        "BOOLEAN" | "BOOL" => match row.try_get::<Option<bool>, _>(index) {
            Ok(v) => v.into(),
            Err(_) => fallback_value(row, index),
        },
        "DATETIME" | "TIMESTAMP" | "DATE" | "TIME" => {
            match row.try_get::<Option<String>, _>(index) {
                Ok(Some(ts)) => Value::Timestamp(ts),
                Ok(None) => Value::Null,
                Err(_) => fallback_value(row, index),
            }
        }
        "BLOB" => match row.try_get::<Option<Vec<u8>>, _>(index) {
            Ok(v) => v.into(),
            Err(_) => fallback_value(row, index),
        },
        _ => match row.try_get::<Option<String>, _>(index) {
            Ok(v) => v.into(),
            Err(_) => fallback_value(row, index),
        },
    }
}

/// Last-resort decode chain for values whose stored type disagrees with the
/// declared column type.
fn fallback_value(row: &SqliteRow, index: usize) -> Value {
    if let Ok(v) = row.try_get::<Option<i64>, _>(index) {
        return v.into();
    }
    if let Ok(v) = row.try_get::<Option<f64>, _>(index) {
        return v.into();
    }
    if let Ok(v) = row.try_get::<Option<String>, _>(index) {
        return v.into();
    }
    if let Ok(v) = row.try_get::<Option<Vec<u8>>, _>(index) {
        return v.into();
    }
    Value::Null
}
