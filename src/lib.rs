//! A webhook relay that turns chat messages into SQL against an embedded
//! database, falling back to an LLM when the message is not SQL.

pub mod classify;
pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod llm;
pub mod logging;
pub mod pipeline;
pub mod query;
pub mod render;
pub mod server;
pub mod verify;
