//! Deterministic completion clients for tests.
//!
//! The pattern mock answers like a well-behaved SQL assistant: fenced SQL
//! for requests it recognizes, prose for everything else. The failing mock
//! drives the adapter-error paths.

use async_trait::async_trait;
use futures::stream::{self, BoxStream};
use futures::StreamExt;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::{RelayError, Result};
use crate::llm::types::{Message, Role};
use crate::llm::LlmClient;

/// Built-in (pattern, response) rules; first match wins.
const DEFAULT_RULES: &[(&str, &str)] = &[
    ("cities", "```sql\nSELECT * FROM cities;\n```"),
    (
        "population",
        "```sql\nSELECT name, population FROM cities ORDER BY population DESC;\n```",
    ),
];

/// Prose answer for inputs no rule covers.
const FALLBACK_ANSWER: &str = "I couldn't turn that into a query for this database.";

/// Completion client answering from a fixed rule table.
#[derive(Debug, Default)]
pub struct MockLlmClient {
    rules: Vec<(String, String)>,
    calls: AtomicUsize,
}

impl MockLlmClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a rule checked before the built-in ones: when the newest user
    /// message contains `pattern`, the mock answers `response`.
    pub fn with_response(
        mut self,
        pattern: impl Into<String>,
        response: impl Into<String>,
    ) -> Self {
        self.rules.push((pattern.into(), response.into()));
        self
    }

    /// Number of completions requested from this mock.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn answer(&self, input: &str) -> String {
        let input = input.to_lowercase();

        let custom = self
            .rules
            .iter()
            .find(|(pattern, _)| input.contains(&pattern.to_lowercase()))
            .map(|(_, response)| response.clone());

        custom
            .or_else(|| {
                DEFAULT_RULES
                    .iter()
                    .find(|(pattern, _)| input.contains(pattern))
                    .map(|(_, response)| response.to_string())
            })
            .unwrap_or_else(|| FALLBACK_ANSWER.to_string())
    }

    fn newest_user_text(messages: &[Message]) -> &str {
        messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
            .unwrap_or_default()
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.answer(Self::newest_user_text(messages)))
    }

    async fn complete_stream(
        &self,
        messages: &[Message],
    ) -> Result<BoxStream<'static, Result<String>>> {
        let response = self.complete(messages).await?;

        // One chunk per line, like a slow but orderly stream.
        let chunks: Vec<String> = response.split_inclusive('\n').map(str::to_string).collect();

        Ok(stream::iter(chunks.into_iter().map(Ok)).boxed())
    }
}

/// Completion client whose every request fails.
#[derive(Debug, Default)]
pub struct FailingLlmClient {
    calls: AtomicUsize,
}

impl FailingLlmClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of completions attempted against this mock.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmClient for FailingLlmClient {
    async fn complete(&self, _messages: &[Message]) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(RelayError::llm("forced completion failure"))
    }

    async fn complete_stream(
        &self,
        _messages: &[Message],
    ) -> Result<BoxStream<'static, Result<String>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(RelayError::llm("forced completion failure"))
    }
}
