//! Command implementations

pub mod check;
pub mod compile;
pub mod relations;
pub mod run;

use std::path::Path;

use anyhow::Context;
use relq_core::Query;

use crate::error::CliError;

/// Reads the query description from `--query` or `--query-file`.
/// Neither given means the empty description `{}`.
pub fn read_query(inline: Option<&str>, file: Option<&Path>) -> Result<Query, CliError> {
    let text = match (inline, file) {
        (Some(text), _) => text.to_owned(),
        (None, Some(path)) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        (None, None) => "{}".to_owned(),
    };
    tracing::debug!(bytes = text.len(), "read query description");
    Ok(Query::from_json(&text)?)
}
