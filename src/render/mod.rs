//! Result rendering for streamed responses.
//!
//! Converts a query result into ordered text chunks. Chunks are
//! newline-terminated so concatenating them in emission order yields a valid
//! document; reordering corrupts the output. All rows are rendered; callers
//! wanting pagination slice the result first.

use crate::db::QueryResult;

/// The single chunk emitted for an empty result set.
pub const NO_RESULTS: &str = "_(no results)_\n";

/// Renders a result set as a Markdown table, one chunk per line.
///
/// Header and separator chunks come first, then one chunk per data row with
/// values joined in header column order. A zero-row result yields exactly
/// the no-results chunk.
pub fn render_table(result: &QueryResult) -> Vec<String> {
    if result.rows.is_empty() {
        return vec![NO_RESULTS.to_string()];
    }

    let mut chunks = Vec::with_capacity(result.rows.len() + 2);

    let header = result
        .columns
        .iter()
        .map(|c| escape_cell(&c.name))
        .collect::<Vec<_>>()
        .join(" | ");
    chunks.push(format!("| {header} |\n"));

    let separator = vec!["---"; result.columns.len()].join(" | ");
    chunks.push(format!("| {separator} |\n"));

    for row in &result.rows {
        let cells = row
            .iter()
            .map(|v| escape_cell(&v.to_string()))
            .collect::<Vec<_>>()
            .join(" | ");
        chunks.push(format!("| {cells} |\n"));
    }

    chunks
}

/// Renders a result set as a single serialized JSON chunk.
///
/// Column order is preserved by keeping columns and rows as parallel arrays.
pub fn render_json(result: &QueryResult) -> Vec<String> {
    let columns: Vec<&str> = result.columns.iter().map(|c| c.name.as_str()).collect();
    let rows: Vec<Vec<serde_json::Value>> = result
        .rows
        .iter()
        .map(|row| row.iter().map(|v| v.to_json()).collect())
        .collect();

    let payload = serde_json::json!({
        "columns": columns,
        "rows": rows,
        "row_count": result.rows.len(),
    });

    vec![format!("{payload}\n")]
}

/// Escapes a cell so it stays within its table column.
///
/// Pipes would open a new column; newlines would open a new row.
fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|").replace(['\r', '\n'], " ")
}
