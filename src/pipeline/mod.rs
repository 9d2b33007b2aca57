//! The request pipeline: classify, execute or delegate, render, emit.
//!
//! One pipeline run serves one inbound request. The fallback policy is an
//! explicit state loop with a hard bound of two fallback attempts: a failed
//! direct execution falls back to an LLM rewrite, a failed rewrite execution
//! falls back to the LLM's raw text. The user always receives a terminal
//! event.

mod events;

pub use events::{ErrorDetail, ResponseEvent};

use std::sync::Arc;

use futures::stream::BoxStream;
use futures::StreamExt;
use tracing::{debug, error, warn};

use crate::classify;
use crate::db::DatabaseClient;
use crate::error::{RelayError, Result};
use crate::llm::{build_messages, Conversation, LlmClient};
use crate::query::QueryExecutor;
use crate::render;

/// Per-request orchestrator tying classifier, executor, and LLM together.
///
/// Cheap to share: construct once at startup, wrap in an `Arc`, and call
/// [`Pipeline::respond`] per request.
pub struct Pipeline {
    executor: QueryExecutor,
    llm: Arc<dyn LlmClient>,
}

/// Execution state for one request, bounding the fallback chain.
enum Attempt {
    /// Execute the user's message as-is.
    Direct,
    /// Delegate to the LLM for a rewrite (or a prose answer).
    Rewrite,
    /// Execute SQL extracted from the LLM output; `raw` is kept as the
    /// final fallback answer.
    Generated { sql: String, raw: String },
}

impl Pipeline {
    /// Creates a pipeline over the shared database handle and LLM client.
    pub fn new(db: Arc<dyn DatabaseClient>, llm: Arc<dyn LlmClient>) -> Self {
        Self {
            executor: QueryExecutor::new(db),
            llm,
        }
    }

    /// Runs the pipeline for one conversation, streaming typed events.
    ///
    /// The stream always starts with `ack` and always terminates: `done`
    /// after the text chunks on success, or a single `errors` event when the
    /// run failed. Errors are converted exactly once, here at the boundary;
    /// nothing escapes the stream.
    pub fn respond(self: Arc<Self>, conversation: Conversation) -> BoxStream<'static, ResponseEvent> {
        let stream = async_stream::stream! {
            yield ResponseEvent::Ack;

            match self.answer(&conversation).await {
                Ok(chunks) => {
                    for chunk in chunks {
                        yield ResponseEvent::text(chunk);
                    }
                    yield ResponseEvent::Done;
                }
                Err(e) => {
                    error!("Pipeline run failed: {e}");
                    yield ResponseEvent::Errors {
                        errors: vec![ErrorDetail::from_error(&e)],
                    };
                }
            }
        };

        stream.boxed()
    }

    /// Produces the ordered text chunks for a conversation.
    ///
    /// This is the classify → execute-or-delegate → render state loop.
    async fn answer(&self, conversation: &Conversation) -> Result<Vec<String>> {
        let message = conversation
            .last_user_text()
            .ok_or_else(|| RelayError::internal("conversation has no user message"))?
            .trim()
            .to_string();

        let sql_like = classify::looks_like_sql(&message);
        debug!(sql_like, "Classified inbound message");

        let mut attempt = if sql_like {
            Attempt::Direct
        } else {
            Attempt::Rewrite
        };

        loop {
            attempt = match attempt {
                Attempt::Direct => match self.executor.execute(&message).await {
                    Ok(result) => return Ok(render::render_table(&result)),
                    Err(e) => {
                        warn!("Direct execution failed, delegating to the LLM: {e}");
                        Attempt::Rewrite
                    }
                },

                Attempt::Rewrite => {
                    let output = self.llm.complete(&build_messages(conversation)).await?;
                    let candidate = classify::extract_sql(&output)
                        .unwrap_or_else(|| output.trim().to_string());

                    if classify::looks_like_sql(&candidate) {
                        debug!("LLM output classified as SQL");
                        Attempt::Generated {
                            sql: candidate,
                            raw: output,
                        }
                    } else {
                        // Not SQL: the prose answer is the final answer.
                        return Ok(vec![output]);
                    }
                }

                Attempt::Generated { sql, raw } => match self.executor.execute(&sql).await {
                    Ok(result) => return Ok(render::render_table(&result)),
                    Err(e) => {
                        warn!("Generated statement failed, returning the raw response: {e}");
                        return Ok(vec![raw]);
                    }
                },
            };
        }
    }
}
