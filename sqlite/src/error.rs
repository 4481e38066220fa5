use relq_core::QueryError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SqliteError {
    /// The query description could not be compiled
    #[error("Query error: {0}")]
    Query(#[from] QueryError),

    /// Rusqlite specific errors
    #[error("Rusqlite error: {0}")]
    Rusqlite(#[from] rusqlite::Error),

    /// A row did not decode into the requested model
    #[error("Mapping error: {0}")]
    Mapping(#[from] serde_json::Error),

    /// A delete was requested with an empty condition
    #[error("refusing to delete from `{0}` without a condition")]
    MissingWhereClause(String),

    /// An update matched no row by its key
    #[error("no row of `{entity}` has `{column}` = {key}")]
    NoMatchingRow {
        entity: String,
        column: String,
        key: serde_json::Value,
    },

    /// A batch write failed at record `index`; nothing in the batch was kept
    #[error("record {index}: {source}")]
    Record {
        index: usize,
        #[source]
        source: Box<SqliteError>,
    },
}

/// Result type for database operations
pub type Result<T, E = SqliteError> = std::result::Result<T, E>;
