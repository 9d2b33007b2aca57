//! Query execution against the shared database handle.
//!
//! Thin layer over the `DatabaseClient` trait that adds timing and
//! write-path logging. Kept separate from the pipeline so execution can be
//! tested independently of the orchestration.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::classify;
use crate::db::{DatabaseClient, QueryResult};
use crate::error::Result;

/// Executes SQL statements against the long-lived database handle.
pub struct QueryExecutor {
    db: Arc<dyn DatabaseClient>,
}

impl QueryExecutor {
    /// Creates a new query executor over the shared handle.
    pub fn new(db: Arc<dyn DatabaseClient>) -> Self {
        Self { db }
    }

    /// Executes a statement, returning the full result set or an error.
    ///
    /// No partial results: an error means nothing tabular came back.
    pub async fn execute(&self, sql: &str) -> Result<QueryResult> {
        if classify::is_mutating(sql) {
            info!("Executing mutating statement");
        }

        let start = Instant::now();
        let result = self.db.execute_query(sql).await;
        let elapsed = start.elapsed();

        match &result {
            Ok(query_result) => {
                debug!(
                    rows = query_result.row_count(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Query executed"
                );
            }
            Err(e) => {
                warn!(elapsed_ms = elapsed.as_millis() as u64, "Query failed: {e}");
            }
        }

        result
    }
}
