//! SQL extraction from LLM output.
//!
//! Completion models usually wrap generated SQL in markdown code fences even
//! when instructed not to. Before re-classifying LLM output, the pipeline
//! strips the first fenced block so the candidate statement is bare SQL.

/// Extracts a SQL candidate from an LLM response.
///
/// Prefers a ` ```sql ` block; falls back to the first untagged ` ``` `
/// block. Returns `None` when the response carries no usable fenced block,
/// in which case the caller should classify the raw text instead.
pub fn extract_sql(response: &str) -> Option<String> {
    extract_fenced_block(response, Some("sql")).or_else(|| extract_fenced_block(response, None))
}

/// Returns the content of the first fenced block whose language tag matches.
///
/// `lang: None` matches only untagged fences, so a ` ```python ` block is
/// never mistaken for SQL.
fn extract_fenced_block(text: &str, lang: Option<&str>) -> Option<String> {
    let mut in_block = false;
    let mut capture: Option<Vec<&str>> = None;

    for line in text.lines() {
        let trimmed = line.trim();
        if let Some(tag) = trimmed.strip_prefix("```") {
            if in_block {
                if let Some(lines) = capture.take() {
                    let sql = lines.join("\n").trim().to_string();
                    if !sql.is_empty() {
                        return Some(sql);
                    }
                }
                in_block = false;
            } else {
                in_block = true;
                let tag = tag.trim();
                let matched = match lang {
                    Some(l) => tag.eq_ignore_ascii_case(l),
                    None => tag.is_empty(),
                };
                if matched {
                    capture = Some(Vec::new());
                }
            }
            continue;
        }

        if let Some(lines) = capture.as_mut() {
            lines.push(line);
        }
    }

    None
}
