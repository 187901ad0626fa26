//! Loading the query list.

use crate::error::SearchError;
use crate::types::Query;
use std::path::Path;

/// Read one query per line, trimming surrounding whitespace.
///
/// Blank lines are kept and become empty queries; they are sent to the
/// search API like any other line.
pub async fn load_queries<P: AsRef<Path>>(path: P) -> Result<Vec<Query>, SearchError> {
    let path = path.as_ref();
    let content = tokio::fs::read_to_string(path).await.map_err(|e| {
        SearchError::file_error(
            path.to_string_lossy(),
            format!("Failed to read query list: {}", e),
        )
    })?;

    Ok(parse_queries(&content))
}

/// Split file content into queries, numbering them in load order.
pub fn parse_queries(content: &str) -> Vec<Query> {
    content
        .lines()
        .enumerate()
        .map(|(seq, line)| Query::new(seq, line.trim()))
        .collect()
}
