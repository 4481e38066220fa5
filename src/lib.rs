//! # relq
//!
//! Compiles JSON query descriptions into parameterized SQL: field filters,
//! relation join-filters, eager-loads, ordering and pagination.
//!
//! ## Quick Start
//!
//! ```rust
//! use relq::prelude::*;
//!
//! let registry = Registry::builder()
//!     .relation("users", "posts", Relation::direct("posts", "id", "user_id"))
//!     .build();
//!
//! let query = Query::from_json(
//!     r#"{
//!         "where": {"field": {"name": "age", "predicate": ">=", "value": 18}},
//!         "with": {"posts": {}},
//!         "orders": [{"field": "username"}],
//!         "limit": 10
//!     }"#,
//! )?;
//!
//! let statement = Compiler::new(&registry)
//!     .apply(&query, "users", Some(SelectBuilder::new(Dialect::PostgreSQL, "users")))?
//!     .to_statement();
//!
//! assert_eq!(
//!     statement.sql,
//!     r#"SELECT DISTINCT "users".* FROM "users" INNER JOIN "posts" AS "posts_1" ON "users"."id" = "posts_1"."user_id" WHERE "users"."age" >= $1 ORDER BY "users"."username" ASC LIMIT 10"#
//! );
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Executors
//!
//! | Database | Driver   | Feature Flag | Status |
//! |----------|----------|--------------|--------|
//! | SQLite   | rusqlite | `sqlite`     | ✅     |
//!
//! Other dialects are supported at the SQL level through [`SelectBuilder`]
//! or a custom [`QueryHandle`].

/// Result type for compile operations
pub use relq_core::error::Result;

/// Error types
pub mod error {
    pub use relq_core::config::Error as ConfigError;
    pub use relq_core::error::QueryError;

    #[cfg(feature = "sqlite")]
    pub use relq_sqlite::SqliteError;
}

/// Core types shared by every executor.
pub mod core {
    pub use relq_core::*;
}

pub use relq_core::{
    Compiler, CompiledQuery, Config, Dialect, Direction, Model, Order, Preload, Query,
    QueryHandle, Registry, Relation, Relations, SelectBuilder, Statement, Where, With,
};

/// SQLite executor
#[cfg(feature = "sqlite")]
pub mod sqlite {
    pub use relq_sqlite::*;
}

/// Everything needed to build and compile queries.
pub mod prelude {
    pub use relq_core::{
        Cardinality, Compiler, Config, Dialect, Field, Model, Operator, Order, Query,
        QueryHandle, Registry, Relation, SelectBuilder, Where, With,
    };

    #[cfg(feature = "sqlite")]
    pub use relq_sqlite::{Database, Record};
}
