//! HTTP surface integration tests.
//!
//! Boots the real router on an ephemeral port and talks to it over HTTP,
//! covering the verification short-circuit and the SSE event stream.

use std::collections::HashMap;
use std::sync::Arc;

use db_relay::db::MockDatabaseClient;
use db_relay::llm::MockLlmClient;
use db_relay::pipeline::Pipeline;
use db_relay::server::{router, AppState};
use db_relay::verify::{
    sign_request, KeyRingVerifier, IDENTITY_HEADER, KEY_ID_HEADER, SIGNATURE_HEADER,
};

struct TestApp {
    base_url: String,
    db: Arc<MockDatabaseClient>,
    llm: Arc<MockLlmClient>,
}

async fn spawn_app() -> TestApp {
    let db = Arc::new(MockDatabaseClient::new());
    let llm = Arc::new(MockLlmClient::new());

    let mut keys = HashMap::new();
    keys.insert("primary".to_string(), "s3cret".to_string());

    let state = AppState {
        pipeline: Arc::new(Pipeline::new(db.clone(), llm.clone())),
        verifier: Arc::new(KeyRingVerifier::new(keys)),
    };

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router(state)).await.unwrap();
    });

    TestApp {
        base_url: format!("http://{addr}"),
        db,
        llm,
    }
}

fn conversation_body(text: &str) -> String {
    serde_json::json!({
        "conversation": [{ "role": "user", "content": text }]
    })
    .to_string()
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = spawn_app().await;

    let response = reqwest::get(format!("{}/health", app.base_url))
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), "ok");
}

#[tokio::test]
async fn test_missing_identity_short_circuits() {
    let app = spawn_app().await;
    let body = conversation_body("SELECT 1");

    let response = reqwest::Client::new()
        .post(format!("{}/webhook", app.base_url))
        .body(body)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 401);
    let error: serde_json::Value = response.json().await.unwrap();
    assert!(error["error"]
        .as_str()
        .unwrap()
        .contains("missing identity token"));

    // Verification failed before any database or LLM work.
    assert_eq!(app.db.call_count(), 0);
    assert_eq!(app.llm.call_count(), 0);
}

#[tokio::test]
async fn test_bad_signature_rejected() {
    let app = spawn_app().await;
    let body = conversation_body("SELECT 1");

    let response = reqwest::Client::new()
        .post(format!("{}/webhook", app.base_url))
        .header(IDENTITY_HEADER, "user-1")
        .header(SIGNATURE_HEADER, "bm90LXRoZS1zaWduYXR1cmU=")
        .header(KEY_ID_HEADER, "primary")
        .body(body)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 401);
    assert_eq!(app.db.call_count(), 0);
    assert_eq!(app.llm.call_count(), 0);
}

#[tokio::test]
async fn test_signed_request_streams_events() {
    let app = spawn_app().await;
    let body = conversation_body("SELECT * FROM users");
    let signature = sign_request("s3cret", "user-1", body.as_bytes());

    let response = reqwest::Client::new()
        .post(format!("{}/webhook", app.base_url))
        .header(IDENTITY_HEADER, "user-1")
        .header(SIGNATURE_HEADER, signature)
        .header(KEY_ID_HEADER, "primary")
        .body(body)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let content_type = response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(content_type.starts_with("text/event-stream"));

    let text = response.text().await.unwrap();
    assert!(text.contains(r#"{"type":"ack"}"#));
    assert!(text.contains(r#""type":"text""#));
    assert!(text.contains(r#"{"type":"done"}"#));

    assert_eq!(app.db.call_count(), 1);
}

#[tokio::test]
async fn test_invalid_body_with_valid_signature_is_bad_request() {
    let app = spawn_app().await;
    let body = "this is not json";
    let signature = sign_request("s3cret", "user-1", body.as_bytes());

    let response = reqwest::Client::new()
        .post(format!("{}/webhook", app.base_url))
        .header(IDENTITY_HEADER, "user-1")
        .header(SIGNATURE_HEADER, signature)
        .header(KEY_ID_HEADER, "primary")
        .body(body)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
    assert_eq!(app.db.call_count(), 0);
}

#[tokio::test]
async fn test_natural_language_flows_through_llm() {
    let app = spawn_app().await;
    let body = conversation_body("show all entries from cities");
    let signature = sign_request("s3cret", "user-1", body.as_bytes());

    let response = reqwest::Client::new()
        .post(format!("{}/webhook", app.base_url))
        .header(IDENTITY_HEADER, "user-1")
        .header(SIGNATURE_HEADER, signature)
        .header(KEY_ID_HEADER, "primary")
        .body(body)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let text = response.text().await.unwrap();
    assert!(text.contains(r#"{"type":"done"}"#));

    // Classified as natural language, rewritten by the LLM, then executed.
    assert_eq!(app.llm.call_count(), 1);
    assert_eq!(app.db.call_count(), 1);
}
