//! In-memory stand-ins for the database client.
//!
//! The pipeline tests need two things from a fake engine: a client that
//! always produces a table, and a client that always fails. Both count their
//! calls so tests can assert which paths touched the database.

use super::{ColumnInfo, DatabaseClient, QueryResult, Value};
use crate::error::{RelayError, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Database client returning a canned one-row table for every SELECT.
#[derive(Default)]
pub struct MockDatabaseClient {
    calls: AtomicUsize,
}

impl MockDatabaseClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of statements executed against this mock.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DatabaseClient for MockDatabaseClient {
    async fn execute_query(&self, sql: &str) -> Result<QueryResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if !sql.trim_start().to_uppercase().starts_with("SELECT") {
            // Mutations come back without a result set, like the real engine.
            return Ok(QueryResult::new());
        }

        Ok(QueryResult::with_data(
            vec![ColumnInfo::new("result", "TEXT")],
            vec![vec![Value::Text(format!("Mock result for: {sql}"))]],
        ))
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// Database client that rejects every statement.
///
/// Drives the pipeline's execution-failure fallback paths.
#[derive(Default)]
pub struct FailingDatabaseClient {
    calls: AtomicUsize,
}

impl FailingDatabaseClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of statements attempted against this mock.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DatabaseClient for FailingDatabaseClient {
    async fn execute_query(&self, sql: &str) -> Result<QueryResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(RelayError::query(format!("forced failure for: {sql}")))
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}
