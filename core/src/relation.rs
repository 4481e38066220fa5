//! Relation descriptors and the registry mapping entities to their relations.
//!
//! The registry is built once (in code with [`RegistryBuilder`] or from a
//! [`Config`](crate::config::Config)) and then only read. It is `Send + Sync`
//! and is passed by reference into every compile, so any number of
//! compilations can share it without synchronization.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{QueryError, Result};

/// How many related rows an eager-load attaches to each parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cardinality {
    /// Attach a single object (or `null`)
    One,
    /// Attach an array
    #[default]
    Many,
}

/// How an origin entity connects to a target entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Relation {
    /// `origin.local_column = target.target_column`
    Direct {
        target: String,
        local_column: String,
        target_column: String,
        #[serde(default)]
        cardinality: Cardinality,
    },
    /// Through a junction table:
    /// `origin.key_column = junction.junction_origin_column` and
    /// `target.key_column = junction.junction_target_column`.
    ManyToMany {
        target: String,
        key_column: String,
        /// Carried for documentation only; joins always use `key_column` on both sides.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target_key: Option<String>,
        junction: String,
        junction_origin_column: String,
        junction_target_column: String,
    },
}

impl Relation {
    pub fn direct(
        target: impl Into<String>,
        local_column: impl Into<String>,
        target_column: impl Into<String>,
    ) -> Self {
        Self::Direct {
            target: target.into(),
            local_column: local_column.into(),
            target_column: target_column.into(),
            cardinality: Cardinality::Many,
        }
    }

    pub fn many_to_many(
        target: impl Into<String>,
        key_column: impl Into<String>,
        junction: impl Into<String>,
        junction_origin_column: impl Into<String>,
        junction_target_column: impl Into<String>,
    ) -> Self {
        Self::ManyToMany {
            target: target.into(),
            key_column: key_column.into(),
            target_key: None,
            junction: junction.into(),
            junction_origin_column: junction_origin_column.into(),
            junction_target_column: junction_target_column.into(),
        }
    }

    /// Sets the cardinality of a direct relation. Many-to-many relations are always `Many`.
    pub fn with_cardinality(mut self, value: Cardinality) -> Self {
        if let Self::Direct { cardinality, .. } = &mut self {
            *cardinality = value;
        }
        self
    }

    /// Target entity name
    pub fn target(&self) -> &str {
        match self {
            Self::Direct { target, .. } | Self::ManyToMany { target, .. } => target,
        }
    }

    pub fn cardinality(&self) -> Cardinality {
        match self {
            Self::Direct { cardinality, .. } => *cardinality,
            Self::ManyToMany { .. } => Cardinality::Many,
        }
    }

    /// Every table and column name the relation renders into SQL.
    pub(crate) fn identifiers(&self) -> Vec<&str> {
        match self {
            Self::Direct {
                target,
                local_column,
                target_column,
                ..
            } => vec![target.as_str(), local_column.as_str(), target_column.as_str()],
            Self::ManyToMany {
                target,
                key_column,
                junction,
                junction_origin_column,
                junction_target_column,
                ..
            } => vec![
                target.as_str(),
                key_column.as_str(),
                junction.as_str(),
                junction_origin_column.as_str(),
                junction_target_column.as_str(),
            ],
        }
    }
}

/// Entity name → relation name → relation descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Registry {
    entities: BTreeMap<String, BTreeMap<String, Relation>>,
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Looks up a relation declared on `entity`.
    #[inline]
    pub fn lookup(&self, entity: &str, relation: &str) -> Option<&Relation> {
        self.entities.get(entity)?.get(relation)
    }

    /// Like [`lookup`](Self::lookup) but fails with `RelationNotFound`
    /// naming both the relation and the entity.
    pub fn resolve(&self, entity: &str, relation: &str) -> Result<&Relation> {
        self.lookup(entity, relation)
            .ok_or_else(|| QueryError::relation_not_found(relation, entity))
    }

    pub fn contains_entity(&self, entity: &str) -> bool {
        self.entities.contains_key(entity)
    }

    /// Declared entity names, sorted
    pub fn entities(&self) -> impl Iterator<Item = &str> {
        self.entities.keys().map(String::as_str)
    }

    /// Relations declared on `entity`, sorted by name
    pub fn relations(&self, entity: &str) -> impl Iterator<Item = (&str, &Relation)> {
        self.entities
            .get(entity)
            .into_iter()
            .flat_map(|relations| relations.iter().map(|(name, rel)| (name.as_str(), rel)))
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

impl From<BTreeMap<String, BTreeMap<String, Relation>>> for Registry {
    fn from(entities: BTreeMap<String, BTreeMap<String, Relation>>) -> Self {
        Self { entities }
    }
}

/// Builder for [`Registry`].
#[derive(Debug, Clone, Default)]
pub struct RegistryBuilder {
    entities: BTreeMap<String, BTreeMap<String, Relation>>,
}

impl RegistryBuilder {
    /// Declares an entity, even if it has no relations
    pub fn entity(mut self, name: impl Into<String>) -> Self {
        self.entities.entry(name.into()).or_default();
        self
    }

    /// Declares `entity.name` → `relation`. The target entity is declared too.
    pub fn relation(
        mut self,
        entity: impl Into<String>,
        name: impl Into<String>,
        relation: Relation,
    ) -> Self {
        self.entities.entry(relation.target().to_owned()).or_default();
        self.entities
            .entry(entity.into())
            .or_default()
            .insert(name.into(), relation);
        self
    }

    pub fn build(self) -> Registry {
        Registry {
            entities: self.entities,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn registry() -> Registry {
        Registry::builder()
            .relation("users", "posts", Relation::direct("posts", "id", "user_id"))
            .relation(
                "posts",
                "author",
                Relation::direct("users", "user_id", "id").with_cardinality(Cardinality::One),
            )
            .relation(
                "posts",
                "tags",
                Relation::many_to_many("tags", "id", "post_tags", "post_id", "tag_id"),
            )
            .entity("audit_logs")
            .build()
    }

    #[test]
    fn test_lookup_and_resolve() {
        let registry = registry();
        assert_eq!(registry.lookup("users", "posts").map(Relation::target), Some("posts"));
        assert!(registry.lookup("users", "tags").is_none());
        assert!(registry.lookup("ghosts", "posts").is_none());

        assert_eq!(
            registry.resolve("users", "comments"),
            Err(QueryError::RelationNotFound {
                relation: "comments".into(),
                entity: "users".into(),
            })
        );
    }

    #[test]
    fn test_targets_are_declared() {
        let registry = registry();
        let entities: Vec<_> = registry.entities().collect();
        assert_eq!(entities, ["audit_logs", "posts", "tags", "users"]);
        assert_eq!(registry.relations("tags").count(), 0);
        assert_eq!(registry.relations("posts").count(), 2);
    }

    #[test]
    fn test_cardinality() {
        let registry = registry();
        assert_eq!(
            registry.lookup("posts", "author").unwrap().cardinality(),
            Cardinality::One
        );
        assert_eq!(
            registry.lookup("posts", "tags").unwrap().cardinality(),
            Cardinality::Many
        );
        // Many-to-many ignores the override
        let m2m = Relation::many_to_many("t", "id", "j", "a", "b").with_cardinality(Cardinality::One);
        assert_eq!(m2m.cardinality(), Cardinality::Many);
    }

    #[test]
    fn test_relation_serde_shape() {
        let relation: Relation = serde_json::from_value(json!({
            "kind": "many_to_many",
            "target": "tags",
            "key_column": "id",
            "target_key": "tag_id",
            "junction": "post_tags",
            "junction_origin_column": "post_id",
            "junction_target_column": "tag_id"
        }))
        .unwrap();
        assert_eq!(relation.target(), "tags");

        let direct: Relation = serde_json::from_value(json!({
            "kind": "direct",
            "target": "posts",
            "local_column": "id",
            "target_column": "user_id"
        }))
        .unwrap();
        assert_eq!(direct, Relation::direct("posts", "id", "user_id"));
    }
}
