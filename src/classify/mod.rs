//! Heuristic SQL detection for inbound messages and LLM output.
//!
//! The relay never parses SQL before handing it to the engine; it only needs
//! a cheap signal for "this looks like a statement" to pick the execution
//! path. Known limitation: a natural-language sentence that leads with one of
//! the statement verbs ("select the best restaurant") classifies as SQL and
//! will fail execution, landing in the LLM fallback path instead.

mod extract;

pub use extract::extract_sql;

use regex::Regex;
use std::sync::OnceLock;

/// Statement verbs that mark a message as likely SQL.
///
/// Mid-statement tokens (FROM, WHERE, JOIN) are deliberately absent: alone
/// they are overwhelmingly plain English ("show all entries from cities").
const SQL_KEYWORDS: &str =
    "select|insert|update|delete|create|drop|alter|attach|detach|pragma|explain|vacuum|truncate|replace|merge";

fn sql_keyword_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(r"(?i)\b(?:{SQL_KEYWORDS})\b")).expect("keyword pattern is valid")
    })
}

fn mutating_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)\b(?:insert|update|delete|create|drop|alter|attach|detach|truncate|replace|vacuum)\b",
        )
        .expect("mutation pattern is valid")
    })
}

/// Returns true if the text is likely a SQL statement.
///
/// Case-insensitive, whole-word match against the keyword set; `selective`
/// does not match on SELECT.
pub fn looks_like_sql(text: &str) -> bool {
    sql_keyword_regex().is_match(text)
}

/// Returns true if the statement writes to the database.
///
/// Used only to log the write path; the executor runs the statement either
/// way.
pub fn is_mutating(sql: &str) -> bool {
    mutating_regex().is_match(sql)
}
