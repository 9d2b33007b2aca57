//! OpenAI-compatible completion client.
//!
//! Talks the chat-completions wire format over a streamed exchange; the
//! decoder in [`crate::llm::sse`] turns the byte stream into frames.
//! `complete` accumulates the deltas into one string, which is what the
//! pipeline consumes.

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

use crate::config::LlmConfig;
use crate::error::{RelayError, Result};
use crate::llm::sse::{SseDecoder, SseFrame};
use crate::llm::types::Message;
use crate::llm::LlmClient;

/// Timeout covering the whole completion exchange.
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Default chat-completions endpoint.
const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";

/// How often to try opening the stream before giving up.
const STREAM_OPEN_ATTEMPTS: u32 = 3;

/// First backoff delay; doubles per attempt.
const BACKOFF_START_MS: u64 = 500;

/// Connection settings for an OpenAI-compatible service.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub model: String,
    /// Endpoint override for compatible gateways; `None` means api.openai.com.
    pub base_url: Option<String>,
    pub timeout_secs: u64,
}

impl OpenAiConfig {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }
}

/// Streaming client for the chat-completions API.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    config: OpenAiConfig,
    client: Client,
}

impl OpenAiClient {
    pub fn new(config: OpenAiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| RelayError::llm(format!("cannot build HTTP client: {e}")))?;

        Ok(Self { config, client })
    }

    /// Builds the client from the relay configuration; the API key is read
    /// from the environment variable the config names.
    pub fn from_config(llm: &LlmConfig) -> Result<Self> {
        let mut config = OpenAiConfig::new(llm.api_key()?, llm.model.clone());
        config.base_url = llm.base_url.clone();
        Self::new(config)
    }

    fn endpoint(&self) -> &str {
        self.config.base_url.as_deref().unwrap_or(OPENAI_API_URL)
    }

    fn wire_messages(messages: &[Message]) -> Vec<WireMessage> {
        messages
            .iter()
            .map(|m| WireMessage {
                role: m.role.as_str().to_string(),
                content: m.content.clone(),
            })
            .collect()
    }

    /// Maps a non-success HTTP response to an error and whether another
    /// attempt is worthwhile.
    fn api_error(status: StatusCode, body: &str) -> (RelayError, bool) {
        let detail = serde_json::from_str::<WireErrorResponse>(body)
            .map(|r| r.error.message)
            .unwrap_or_else(|_| body.to_string());

        match status {
            StatusCode::UNAUTHORIZED => (
                RelayError::llm("completion API rejected the configured key"),
                false,
            ),
            StatusCode::TOO_MANY_REQUESTS => {
                (RelayError::llm("completion API rate limit hit"), true)
            }
            s if s.is_server_error() => (
                RelayError::llm(format!("completion API unavailable ({s}): {detail}")),
                true,
            ),
            s => (
                RelayError::llm(format!("completion API error ({s}): {detail}")),
                false,
            ),
        }
    }

    /// One attempt at opening the completion stream.
    async fn try_open(
        &self,
        request: &WireRequest,
    ) -> std::result::Result<reqwest::Response, (RelayError, bool)> {
        let sent = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.config.api_key)
            .json(request)
            .send()
            .await;

        let response = match sent {
            Ok(r) => r,
            Err(e) if e.is_timeout() => {
                return Err((RelayError::llm("completion request timed out"), true))
            }
            Err(e) if e.is_connect() => {
                return Err((
                    RelayError::llm(format!("cannot reach completion API: {e}")),
                    true,
                ))
            }
            Err(e) => {
                return Err((
                    RelayError::llm(format!("completion request failed: {e}")),
                    false,
                ))
            }
        };

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(Self::api_error(status, &body))
    }

    /// Opens the stream, retrying transient failures with backoff.
    ///
    /// Only opening is retried. Once frames are flowing, a transport failure
    /// is terminal.
    async fn open_stream(&self, messages: &[Message]) -> Result<reqwest::Response> {
        let request = WireRequest {
            model: self.config.model.clone(),
            messages: Self::wire_messages(messages),
            stream: true,
        };

        let mut backoff = Duration::from_millis(BACKOFF_START_MS);
        let mut attempt = 0;

        loop {
            attempt += 1;
            match self.try_open(&request).await {
                Ok(response) => return Ok(response),
                Err((error, retryable)) => {
                    if !retryable || attempt >= STREAM_OPEN_ATTEMPTS {
                        return Err(error);
                    }
                    warn!(attempt, "Completion attempt failed, retrying in {backoff:?}: {error}");
                }
            }

            tokio::time::sleep(backoff).await;
            backoff *= 2;
        }
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn complete(&self, messages: &[Message]) -> Result<String> {
        let response = self.open_stream(messages).await?;

        let mut decoder = SseDecoder::new();
        let mut content = String::new();
        let mut bytes_stream = response.bytes_stream();

        'outer: while let Some(chunk) = bytes_stream.next().await {
            let bytes = chunk.map_err(|e| RelayError::llm(format!("stream error: {e}")))?;

            for frame in decoder.feed(&bytes) {
                match frame {
                    SseFrame::Delta(delta) => content.push_str(&delta),
                    SseFrame::Done => break 'outer,
                }
            }
        }

        Ok(content.trim().to_string())
    }

    async fn complete_stream(
        &self,
        messages: &[Message],
    ) -> Result<BoxStream<'static, Result<String>>> {
        let response = self.open_stream(messages).await?;

        let stream = async_stream::stream! {
            let mut decoder = SseDecoder::new();
            let mut bytes_stream = response.bytes_stream();

            while let Some(chunk) = bytes_stream.next().await {
                match chunk {
                    Ok(bytes) => {
                        for frame in decoder.feed(&bytes) {
                            match frame {
                                SseFrame::Delta(delta) => yield Ok(delta),
                                SseFrame::Done => return,
                            }
                        }
                    }
                    Err(e) => {
                        yield Err(RelayError::llm(format!("stream error: {e}")));
                        return;
                    }
                }
            }
        };

        Ok(stream.boxed())
    }
}

// Chat-completions wire types.

#[derive(Debug, Serialize)]
struct WireRequest {
    model: String,
    messages: Vec<WireMessage>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct WireErrorResponse {
    error: WireError,
}

#[derive(Debug, Deserialize)]
struct WireError {
    message: String,
}
