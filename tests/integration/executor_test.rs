//! Query execution integration tests.
//!
//! Exercises the executor against a real in-memory SQLite database and a
//! file-backed one, including persistence of mutating statements.

use std::sync::Arc;

use db_relay::config::DatabaseConfig;
use db_relay::db::{DatabaseClient, SqliteClient, Value};
use db_relay::query::QueryExecutor;

async fn memory_executor() -> QueryExecutor {
    let client = SqliteClient::connect(&DatabaseConfig::in_memory())
        .await
        .unwrap();
    QueryExecutor::new(Arc::new(client))
}

#[tokio::test]
async fn test_execute_simple_select() {
    let executor = memory_executor().await;

    let result = executor
        .execute("SELECT 1 AS num, 'hello' AS greeting")
        .await
        .unwrap();

    assert_eq!(result.columns.len(), 2);
    assert_eq!(result.columns[0].name, "num");
    assert_eq!(result.columns[1].name, "greeting");
    assert_eq!(result.row_count(), 1);
    assert_eq!(result.rows[0][0], Value::Int(1));
    assert_eq!(result.rows[0][1], Value::Text("hello".to_string()));
}

#[tokio::test]
async fn test_mutations_persist_on_shared_handle() {
    let executor = memory_executor().await;

    executor
        .execute("CREATE TABLE cities (name TEXT, population INTEGER)")
        .await
        .unwrap();
    executor
        .execute("INSERT INTO cities VALUES ('Lagos', 15000000), ('Oslo', 700000)")
        .await
        .unwrap();

    let result = executor
        .execute("SELECT name FROM cities ORDER BY name")
        .await
        .unwrap();

    assert_eq!(result.row_count(), 2);
    assert_eq!(result.rows[0][0], Value::Text("Lagos".to_string()));
    assert_eq!(result.rows[1][0], Value::Text("Oslo".to_string()));
}

#[tokio::test]
async fn test_execution_error_yields_no_rows() {
    let executor = memory_executor().await;

    let err = executor
        .execute("SELECT * FROM does_not_exist")
        .await
        .unwrap_err();

    assert!(err.to_string().contains("does_not_exist"));
}

#[tokio::test]
async fn test_syntax_error_surfaces() {
    let executor = memory_executor().await;

    let err = executor.execute("SELECT FROM WHERE").await.unwrap_err();

    assert!(err.to_string().to_lowercase().contains("error"));
}

#[tokio::test]
async fn test_file_backed_database_persists_across_connections() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("relay.db");
    let config = DatabaseConfig::file(&db_path);

    {
        let client = SqliteClient::connect(&config).await.unwrap();
        client
            .execute_query("CREATE TABLE notes (body TEXT)")
            .await
            .unwrap();
        client
            .execute_query("INSERT INTO notes VALUES ('persisted')")
            .await
            .unwrap();
        client.close().await.unwrap();
    }

    let client = SqliteClient::connect(&config).await.unwrap();
    let result = client
        .execute_query("SELECT body FROM notes")
        .await
        .unwrap();

    assert_eq!(result.row_count(), 1);
    assert_eq!(result.rows[0][0], Value::Text("persisted".to_string()));
}

#[tokio::test]
async fn test_empty_select_returns_zero_rows() {
    let executor = memory_executor().await;

    executor
        .execute("CREATE TABLE empty_table (x INTEGER)")
        .await
        .unwrap();

    let result = executor
        .execute("SELECT x FROM empty_table")
        .await
        .unwrap();

    assert_eq!(result.row_count(), 0);
    assert!(result.is_empty());
}
