use thiserror::Error;

/// Errors raised while compiling a query description.
///
/// These are request-shape errors: they are never transient, so callers map
/// them straight to a response instead of retrying.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// A field path does not match the identifier grammar (`^\w+(\.\w+)*$`)
    #[error("field `{0}` is not a valid field path")]
    FieldInvalid(String),

    /// An entity name is not a single identifier
    #[error("entity `{0}` is not a valid identifier")]
    EntityInvalid(String),

    /// The predicate is not part of the operator whitelist
    #[error("unsupported predicate `{0}`")]
    UnsupportedPredicate(String),

    /// The value shape does not fit the predicate (e.g. `between` without a pair)
    #[error("invalid value for `{field}` with predicate `{predicate}`: {reason}")]
    InvalidValue {
        field: String,
        predicate: &'static str,
        reason: &'static str,
    },

    /// An eager-load or join-filter names a relation the entity does not declare
    #[error("cannot find relation `{relation}` for entity `{entity}`")]
    RelationNotFound { relation: String, entity: String },

    /// A record to update does not carry its key column
    #[error("record has no value for key column `{0}`")]
    MissingKey(String),

    /// Ordering direction other than ASC/DESC
    #[error("order direction `{direction}` for field `{field}` must be ASC or DESC")]
    OrderInvalid { field: String, direction: String },

    /// Compilation was invoked without a backing connection
    #[error("query has no backing connection")]
    NilConnection,
}

impl QueryError {
    pub(crate) fn relation_not_found(relation: &str, entity: &str) -> Self {
        Self::RelationNotFound {
            relation: relation.to_owned(),
            entity: entity.to_owned(),
        }
    }
}

/// Result type for query compilation
pub type Result<T, E = QueryError> = std::result::Result<T, E>;
