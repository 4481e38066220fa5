//! Error types for the CLI

use thiserror::Error;

use relq_core::{ConfigError, QueryError};
use relq_sqlite::SqliteError;

/// CLI errors
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The query description is not valid JSON
    #[error("Invalid query description: {0}")]
    InvalidQuery(#[from] serde_json::Error),

    /// The query description does not compile
    #[error("{0}")]
    Compile(#[from] QueryError),

    /// Database error
    #[error("{0}")]
    Database(#[from] SqliteError),

    /// A command needs a database but none was given
    #[error("No database given: pass --database or set `database` in {0}")]
    NoDatabase(String),

    /// Other errors
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
