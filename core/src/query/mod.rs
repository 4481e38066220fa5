//! Query descriptions and their compilation.
//!
//! A [`Query`] is the JSON-decoded description of a read: selection,
//! filtering (directly or through relations), ordering, pagination and
//! eager-loads. The [`Compiler`] turns it into a [`CompiledQuery`], which is
//! applied to any [`QueryHandle`]. [`SelectBuilder`] is the handle that
//! renders plain SQL statements; [`write`] renders the INSERT and UPDATE
//! statements for single records.

mod compile;
mod handle;
mod order;
mod relations;
mod select;
pub mod write;

pub use compile::{CompiledQuery, Compiler, Preload};
pub use handle::QueryHandle;
pub use order::{Direction, Order};
pub use relations::Relations;
pub use select::{SelectBuilder, Statement};

use serde::{Deserialize, Serialize};

use crate::expressions::Where;
use crate::join::With;

/// A read request for one entity.
///
/// Every field is optional; an absent field means "not requested".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Query {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub select: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub omit: Vec<String>,
    /// Join-filters: relation name → filter on the related entity
    #[serde(skip_serializing_if = "Relations::is_empty")]
    pub with: Relations<With>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<u64>,
    #[serde(rename = "where", skip_serializing_if = "Option::is_none")]
    pub filter: Option<Where>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub orders: Vec<Order>,
    /// Eager-loads: relation name → scope query, or `null` for everything
    #[serde(skip_serializing_if = "Relations::is_empty")]
    pub preloads: Relations<Option<Query>>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes a query description from JSON text
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn select<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.select.extend(columns.into_iter().map(Into::into));
        self
    }

    pub fn omit<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.omit.extend(columns.into_iter().map(Into::into));
        self
    }

    pub fn filter(mut self, filter: Where) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Adds a join-filter through `relation`
    pub fn with(mut self, relation: impl Into<String>, with: With) -> Self {
        self.with.insert(relation, with);
        self
    }

    /// Eager-loads `relation`, optionally scoped by `scope`
    pub fn preload(mut self, relation: impl Into<String>, scope: Option<Query>) -> Self {
        self.preloads.insert(relation, scope);
        self
    }

    pub fn order(mut self, order: Order) -> Self {
        self.orders.push(order);
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }
}
