//! Compiles JSON query descriptions into parameterized SQL.
//!
//! The entry point is [`Compiler`]: given a [`Query`], an entity name and a
//! relation [`Registry`], it produces a [`CompiledQuery`] whose parts are
//! applied to a [`QueryHandle`]. Nothing here talks to a database.

pub mod config;
pub mod dialect;
pub mod error;
pub mod expressions;
pub mod join;
pub mod model;
pub mod notify;
pub mod query;
pub mod relation;
pub mod sql;
mod tracing;

// Re-export key types and traits
pub use config::{Config, ConfigError};
pub use dialect::Dialect;
pub use error::{QueryError, Result};
pub use expressions::{Field, Operator, Where};
pub use join::{JoinClause, JoinContext, With};
pub use model::Model;
pub use notify::{Event, Hub, Operation, Subscriber, SubscriberId, Topic};
pub use query::{
    CompiledQuery, Compiler, Direction, Order, Preload, Query, QueryHandle, Relations,
    SelectBuilder, Statement,
};
pub use relation::{Cardinality, Registry, RegistryBuilder, Relation};
pub use serde_json::Value;
pub use sql::Fragment;
