//! Prompt construction for LLM requests.
//!
//! The relay biases every completion toward emitting a bare SQL statement,
//! so the pipeline can re-classify and execute the output.

use crate::llm::types::{Conversation, Message};

/// System instruction prepended to every delegated conversation.
const SQL_SYSTEM_PROMPT: &str = "\
You are a SQL assistant for a SQLite database. Translate the user's request \
into a single valid SQLite statement.

INSTRUCTIONS:
- Return ONLY the SQL statement, no explanations
- Generate only valid SQLite SQL
- Never emit more than one statement
- If the request cannot be answered with SQL, answer in plain prose instead

OUTPUT FORMAT:
Return the SQL wrapped in ```sql code blocks.";

/// Builds the message list for a delegated completion.
///
/// Prepends exactly one system message to a copy of the conversation; the
/// caller's history is left untouched.
pub fn build_messages(conversation: &Conversation) -> Vec<Message> {
    let mut messages = Vec::with_capacity(conversation.len() + 1);
    messages.push(Message::system(SQL_SYSTEM_PROMPT));
    messages.extend(conversation.messages().iter().cloned());
    messages
}
