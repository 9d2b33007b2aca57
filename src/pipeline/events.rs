//! Typed events streamed back to the caller.
//!
//! Every response is an ordered event sequence: `ack` first, then zero or
//! more `text` chunks, terminated by exactly one of `done` or `errors`.

use serde::{Deserialize, Serialize};

use crate::error::RelayError;

/// One event in the outbound response stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ResponseEvent {
    /// Acknowledges receipt; always the first event.
    Ack,
    /// A content fragment; chunks concatenate in arrival order.
    Text { chunk: String },
    /// Terminates a successful response.
    Done,
    /// Terminates a failed response; emitted instead of `done`.
    Errors { errors: Vec<ErrorDetail> },
}

impl ResponseEvent {
    /// Creates a text event from a rendered chunk.
    pub fn text(chunk: impl Into<String>) -> Self {
        Self::Text {
            chunk: chunk.into(),
        }
    }
}

/// A structured error carried by an `errors` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Machine-readable error category.
    #[serde(rename = "type")]
    pub error_type: String,
    /// Human-readable description.
    pub message: String,
    /// HTTP-style status code for the category.
    pub code: u16,
    /// Unique id for correlating the failure with server logs.
    pub identifier: String,
}

impl ErrorDetail {
    /// Builds the error detail for a relay error, minting a fresh
    /// correlation id.
    pub fn from_error(err: &RelayError) -> Self {
        Self {
            error_type: err.category().to_string(),
            message: err.to_string(),
            code: status_code(err),
            identifier: uuid::Uuid::new_v4().to_string(),
        }
    }
}

fn status_code(err: &RelayError) -> u16 {
    match err {
        RelayError::Verification(_) => 401,
        RelayError::Query(_) => 400,
        RelayError::Llm(_) => 502,
        RelayError::Config(_) | RelayError::Internal(_) => 500,
    }
}
