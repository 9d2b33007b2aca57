//! LLM integration for the relay.
//!
//! Provides the completion client trait, the OpenAI-compatible streaming
//! implementation, and mocks for testing.

pub mod mock;
pub mod openai;
pub mod prompt;
pub mod sse;
pub mod types;

pub use mock::{FailingLlmClient, MockLlmClient};
pub use openai::{OpenAiClient, OpenAiConfig};
pub use prompt::build_messages;
pub use sse::{SseDecoder, SseFrame};
pub use types::{Conversation, Message, Role};

use async_trait::async_trait;
use futures::stream::BoxStream;
use std::str::FromStr;
use std::sync::Arc;

use crate::config::LlmConfig;
use crate::error::{RelayError, Result};

/// Trait for LLM clients that can generate completions.
///
/// Implementations must be thread-safe (Send + Sync) to support async use.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Generates a completion for the given messages.
    ///
    /// Streamed deltas are accumulated into one trimmed string.
    async fn complete(&self, messages: &[Message]) -> Result<String>;

    /// Generates a streaming completion for the given messages.
    ///
    /// Returns a stream of response fragments as they arrive.
    async fn complete_stream(
        &self,
        messages: &[Message],
    ) -> Result<BoxStream<'static, Result<String>>>;
}

/// LLM provider type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LlmProvider {
    /// OpenAI-compatible chat-completions service.
    #[default]
    OpenAi,
    /// Mock client for testing (no API key required).
    Mock,
}

impl LlmProvider {
    /// Returns the provider as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Mock => "mock",
        }
    }
}

impl FromStr for LlmProvider {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "mock" => Ok(Self::Mock),
            _ => Err(format!("Unknown LLM provider: {s}")),
        }
    }
}

impl std::fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Builds the completion client for the configured provider.
pub fn build_client(config: &LlmConfig) -> Result<Arc<dyn LlmClient>> {
    let provider = config
        .provider
        .parse::<LlmProvider>()
        .map_err(RelayError::config)?;

    match provider {
        LlmProvider::OpenAi => Ok(Arc::new(OpenAiClient::from_config(config)?)),
        LlmProvider::Mock => Ok(Arc::new(MockLlmClient::new())),
    }
}
