//! The relay's error taxonomy.
//!
//! One enum covers the failure classes the relay distinguishes. The pipeline
//! converts these into structured error events at the stream boundary, so
//! each variant also carries a machine-readable category tag.

use thiserror::Error;

/// Result type used throughout the relay.
pub type Result<T> = std::result::Result<T, RelayError>;

#[derive(Error, Debug)]
pub enum RelayError {
    /// The inbound delivery could not be attributed to a caller.
    #[error("Verification error: {0}")]
    Verification(String),

    /// The engine rejected a statement (syntax, missing table, timeout).
    #[error("Query error: {0}")]
    Query(String),

    /// The completion service failed (transport, auth, rate limit).
    #[error("LLM error: {0}")]
    Llm(String),

    /// Bad or missing configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// States that should be unreachable.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl RelayError {
    pub fn verification(msg: impl Into<String>) -> Self {
        Self::Verification(msg.into())
    }

    pub fn query(msg: impl Into<String>) -> Self {
        Self::Query(msg.into())
    }

    pub fn llm(msg: impl Into<String>) -> Self {
        Self::Llm(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Category tag carried by streamed error events.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Verification(_) => "verification_error",
            Self::Query(_) => "query_error",
            Self::Llm(_) => "llm_error",
            Self::Config(_) => "config_error",
            Self::Internal(_) => "internal_error",
        }
    }
}
