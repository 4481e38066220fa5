//! Run command implementation
//!
//! Executes a query description against a SQLite database file and prints
//! `{"count": n, "result": [...]}`.

use std::path::PathBuf;

use anyhow::Context;
use relq_core::{Config, Query, Where};
use relq_sqlite::Database;
use serde_json::json;

use crate::error::CliError;

pub struct RunOptions {
    pub entity: String,
    pub query: Query,
    /// Overrides the configured database file
    pub database: Option<PathBuf>,
    /// Delete the rows matching this filter instead of querying
    pub delete: Option<Where>,
}

/// Run the run command
pub fn run(config: &Config, config_path: &str, opts: RunOptions) -> Result<(), CliError> {
    let path = opts
        .database
        .or_else(|| config.database.clone())
        .ok_or_else(|| CliError::NoDatabase(config_path.to_owned()))?;
    if !path.exists() {
        return Err(anyhow::anyhow!("database {} does not exist", path.display()).into());
    }

    let db = Database::open_with_config(&path, config)
        .with_context(|| format!("failed to open {}", path.display()))?;
    tracing::info!(database = %path.display(), entity = %opts.entity, "running query");

    let value = match opts.delete {
        Some(filter) => {
            let deleted = db.delete(&opts.entity, &filter)?;
            json!({"count": deleted.len(), "result": deleted})
        }
        None => {
            let (records, count) = db.find_and_count(&opts.entity, &opts.query)?;
            json!({"count": count, "result": records})
        }
    };

    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}
