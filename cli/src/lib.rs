//! relq CLI - compile and run JSON query descriptions
//!
//! Reads the relation registry from a `relq.toml` file:
//!
//! ```toml
//! dialect = "sqlite"
//! table_prefix = ""
//! database = "./app.db"
//! entities = ["users", "posts"]
//!
//! [relations.users.posts]
//! kind = "direct"
//! target = "posts"
//! local_column = "id"
//! target_column = "user_id"
//! ```
//!
//! # Commands
//!
//! - `relq compile --entity users --query '{...}'` - print the SQL and params
//! - `relq run --entity users --query '{...}'` - run against the database
//! - `relq relations` - list the declared relations
//! - `relq check` - validate the config file

pub mod commands;
pub mod error;
pub mod output;

pub use error::CliError;
