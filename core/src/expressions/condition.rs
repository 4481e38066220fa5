use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::predicate::{Field, Operator};
use crate::error::Result;
use crate::sql::Fragment;

/// A node of the filter tree.
///
/// Every branch is optional; the branches that are present combine with AND
/// in the order `not`, `and`, `or`, `field`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Where {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not: Option<Box<Where>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub or: Vec<Where>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub and: Vec<Where>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<Field>,
}

impl Where {
    /// Leaf node for a single predicate
    pub fn field(name: impl Into<String>, predicate: Operator, value: impl Into<Value>) -> Self {
        Self {
            field: Some(Field::new(name, predicate, value)),
            ..Self::default()
        }
    }

    pub fn eq(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::field(name, Operator::Eq, value)
    }

    pub fn is_null(name: impl Into<String>) -> Self {
        Self::field(name, Operator::Null, Value::Null)
    }

    pub fn not(inner: Where) -> Self {
        Self {
            not: Some(Box::new(inner)),
            ..Self::default()
        }
    }

    pub fn all(children: impl IntoIterator<Item = Where>) -> Self {
        Self {
            and: children.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn any(children: impl IntoIterator<Item = Where>) -> Self {
        Self {
            or: children.into_iter().collect(),
            ..Self::default()
        }
    }

    /// True when no branch is set
    pub fn is_empty(&self) -> bool {
        self.not.is_none() && self.or.is_empty() && self.and.is_empty() && self.field.is_none()
    }

    /// Compiles the tree against a column qualifier (`""`, `"users."`, `"posts_1."`).
    ///
    /// An empty node yields an empty fragment, which callers treat as "no filter".
    /// The first error anywhere in the tree aborts compilation.
    pub fn compile(&self, prefix: &str) -> Result<Fragment> {
        let mut parts = Vec::with_capacity(4);

        if let Some(not) = &self.not {
            parts.push(not.compile(prefix)?.negate());
        }

        if !self.and.is_empty() {
            parts.push(Fragment::and(compile_all(&self.and, prefix)?));
        }

        if !self.or.is_empty() {
            parts.push(Fragment::or(compile_all(&self.or, prefix)?));
        }

        if let Some(field) = &self.field {
            parts.push(field.compile(prefix)?);
        }

        Ok(Fragment::and(parts))
    }
}

fn compile_all(nodes: &[Where], prefix: &str) -> Result<Vec<Fragment>> {
    nodes.iter().map(|node| node.compile(prefix)).collect()
}
