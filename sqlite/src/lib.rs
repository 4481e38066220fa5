//! SQLite execution for relq
//!
//! Renders compiled query descriptions with [`SelectBuilder`](relq_core::SelectBuilder),
//! binds their JSON parameters and runs them on `rusqlite`, including eager-loads.

mod database;
mod error;
mod preload;
pub mod values;

pub use database::{Database, Record};
pub use error::{Result, SqliteError};
