use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::notify::{Operation, Topic};

/// A record type stored in one entity's table.
///
/// The compiler only deals in entity names; `Model` ties a Rust type to its
/// entity so executors can decode rows into it.
///
/// ```
/// # use relq_core::Model;
/// #[derive(serde::Serialize, serde::Deserialize)]
/// struct User {
///     id: i64,
///     username: String,
/// }
///
/// impl Model for User {
///     const ENTITY: &'static str = "users";
/// }
///
/// assert_eq!(User::topic(relq_core::Operation::Delete).to_string(), "users:delete");
/// ```
pub trait Model: Serialize + DeserializeOwned {
    /// Entity name, as used in the relation registry
    const ENTITY: &'static str;

    fn topic(operation: Operation) -> Topic {
        Topic::new(Self::ENTITY, operation)
    }
}
