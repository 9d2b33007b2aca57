//! The HTTP surface of the relay.
//!
//! One POST webhook endpoint plus a health route. The webhook handler
//! verifies the delivery before anything else runs; an unverified request is
//! rejected at the HTTP level with no streamed events. Verified requests get
//! the pipeline's event stream as server-sent events, one JSON-encoded event
//! per frame.

use std::convert::Infallible;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use futures::StreamExt;
use serde::Deserialize;
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::error::{RelayError, Result};
use crate::llm::Conversation;
use crate::pipeline::Pipeline;
use crate::verify::{
    InboundAuth, RequestVerifier, IDENTITY_HEADER, KEY_ID_HEADER, SIGNATURE_HEADER,
};

/// Shared state handed to every request handler.
#[derive(Clone)]
pub struct AppState {
    /// The request pipeline.
    pub pipeline: Arc<Pipeline>,
    /// Inbound request verifier.
    pub verifier: Arc<dyn RequestVerifier>,
}

/// Inbound webhook body.
#[derive(Debug, Deserialize)]
pub struct WebhookRequest {
    /// The conversation so far; the newest user message is the request.
    pub conversation: Conversation,
}

/// Builds the relay router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/webhook", post(webhook))
        .route("/health", get(health))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Binds the listener and serves until ctrl-c.
pub async fn serve(listen: &str, state: AppState) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .map_err(|e| RelayError::config(format!("Cannot bind {listen}: {e}")))?;

    info!("Listening on {listen}");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| RelayError::internal(format!("Server error: {e}")))
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("Shutting down");
}

async fn health() -> &'static str {
    "ok"
}

/// The webhook handler: verify, parse, run the pipeline, stream events.
async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let auth = auth_from_headers(&headers);

    let identity = match state.verifier.verify(&auth, &body) {
        Ok(identity) => identity,
        Err(e) => {
            warn!("Rejected webhook delivery: {e}");
            return (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": e.to_string() })),
            )
                .into_response();
        }
    };

    let request: WebhookRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": format!("Invalid request body: {e}") })),
            )
                .into_response();
        }
    };

    info!(identity = %identity, "Accepted webhook delivery");

    let events = state.pipeline.clone().respond(request.conversation);
    let stream = events.map(|event| {
        let data = serde_json::to_string(&event).unwrap_or_default();
        Ok::<Event, Infallible>(Event::default().data(data))
    });

    Sse::new(stream)
        .keep_alive(KeepAlive::default())
        .into_response()
}

/// Extracts the authentication material from the inbound headers.
fn auth_from_headers(headers: &HeaderMap) -> InboundAuth {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };

    InboundAuth {
        identity: header(IDENTITY_HEADER),
        signature: header(SIGNATURE_HEADER),
        key_id: header(KEY_ID_HEADER),
    }
}
