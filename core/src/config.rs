//! Configuration for relq
//!
//! Loads `relq.toml`: dialect, naming-strategy table prefix and the relation
//! registry.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::dialect::Dialect;
use crate::query::Compiler;
use crate::relation::{Registry, Relation};
use crate::sql::is_identifier;

pub const CONFIG_FILE: &str = "relq.toml";

/// Parsed `relq.toml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub dialect: Dialect,
    /// Prepended to every entity name to form its physical table name
    pub table_prefix: String,
    /// Default database file for commands that execute queries
    pub database: Option<PathBuf>,
    /// Entities declared without relations
    pub entities: Vec<String>,
    /// `[relations.<entity>.<name>]` tables
    pub relations: BTreeMap<String, BTreeMap<String, Relation>>,
}

impl Config {
    /// Load from the default config file
    pub fn load() -> Result<Self, Error> {
        Self::load_from(Path::new(CONFIG_FILE))
    }

    /// Load from a specific path
    pub fn load_from(path: &Path) -> Result<Self, Error> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::NotFound(path.into())
            } else {
                Error::Io(path.into(), e)
            }
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| Error::Parse(path.into(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Parse from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, Error> {
        let config: Self =
            toml::from_str(content).map_err(|e| Error::Parse(PathBuf::from("<inline>"), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Every name that ends up in SQL must be a plain identifier.
    fn validate(&self) -> Result<(), Error> {
        if !self.table_prefix.is_empty() && !is_identifier(&self.table_prefix) {
            return Err(Error::InvalidIdentifier {
                context: "table_prefix".into(),
                name: self.table_prefix.clone(),
            });
        }

        for entity in &self.entities {
            check_identifier("entities", entity)?;
        }

        for (entity, relations) in &self.relations {
            check_identifier("relations", entity)?;
            for (name, relation) in relations {
                for ident in relation.identifiers() {
                    check_identifier(&format!("relations.{entity}.{name}"), ident)?;
                }
            }
        }
        Ok(())
    }

    /// Builds the relation registry. Relation targets and listed entities are
    /// declared even when they have no relations of their own.
    pub fn registry(&self) -> Registry {
        let mut builder = Registry::builder();
        for entity in &self.entities {
            builder = builder.entity(entity.as_str());
        }
        for (entity, relations) in &self.relations {
            builder = builder.entity(entity.as_str());
            for (name, relation) in relations {
                builder = builder.relation(entity.as_str(), name.as_str(), relation.clone());
            }
        }
        builder.build()
    }

    /// A compiler over `registry` using this config's table prefix
    pub fn compiler<'r>(&'r self, registry: &'r Registry) -> Compiler<'r> {
        Compiler::new(registry).with_table_prefix(&self.table_prefix)
    }

    /// Physical table name of `entity`
    #[inline]
    pub fn table_name(&self, entity: &str) -> String {
        format!("{}{entity}", self.table_prefix)
    }
}

fn check_identifier(context: &str, name: &str) -> Result<(), Error> {
    if is_identifier(name) {
        Ok(())
    } else {
        Err(Error::InvalidIdentifier {
            context: context.into(),
            name: name.into(),
        })
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to read {}: {}", .0.display(), .1)]
    Io(PathBuf, #[source] std::io::Error),

    #[error("failed to parse {}: {}", .0.display(), .1)]
    Parse(PathBuf, #[source] toml::de::Error),

    #[error("invalid identifier '{name}' in {context}")]
    InvalidIdentifier { context: String, name: String },
}

pub type ConfigError = Error;

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relation::Cardinality;

    const BLOG: &str = r#"
        dialect = "postgres"
        table_prefix = "app_"

        [relations.users.posts]
        kind = "direct"
        target = "posts"
        local_column = "id"
        target_column = "user_id"

        [relations.posts.author]
        kind = "direct"
        target = "users"
        local_column = "user_id"
        target_column = "id"
        cardinality = "one"

        [relations.posts.tags]
        kind = "many_to_many"
        target = "tags"
        key_column = "id"
        junction = "post_tags"
        junction_origin_column = "post_id"
        junction_target_column = "tag_id"
    "#;

    #[test]
    fn blog() {
        let cfg = Config::from_toml_str(BLOG).unwrap();
        assert_eq!(cfg.dialect, Dialect::PostgreSQL);
        assert_eq!(cfg.table_name("users"), "app_users");

        let registry = cfg.registry();
        assert_eq!(
            registry.lookup("posts", "author").map(Relation::cardinality),
            Some(Cardinality::One)
        );
        assert!(registry.contains_entity("tags"));
        assert!(registry.lookup("users", "tags").is_none());
    }

    #[test]
    fn defaults() {
        let cfg = Config::from_toml_str("").unwrap();
        assert_eq!(cfg.dialect, Dialect::SQLite);
        assert!(cfg.table_prefix.is_empty());
        assert!(cfg.database.is_none());
        assert!(cfg.registry().is_empty());
    }

    #[test]
    fn bare_entities() {
        let cfg = Config::from_toml_str(r#"entities = ["audit_logs"]"#).unwrap();
        assert!(cfg.registry().contains_entity("audit_logs"));
    }

    #[test]
    fn rejects_unsafe_identifiers() {
        let err = Config::from_toml_str(
            r#"
            [relations.users.posts]
            kind = "direct"
            target = "posts; DROP TABLE users"
            local_column = "id"
            target_column = "user_id"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidIdentifier { .. }));

        let err = Config::from_toml_str(r#"table_prefix = "a.b""#).unwrap_err();
        assert!(matches!(err, Error::InvalidIdentifier { .. }));
    }

    #[test]
    fn rejects_unknown_keys() {
        assert!(matches!(
            Config::from_toml_str(r#"dialect = "oracle""#),
            Err(Error::Parse(..))
        ));
        assert!(matches!(
            Config::from_toml_str(r#"prefix = "x_""#),
            Err(Error::Parse(..))
        ));
    }

    #[test]
    fn load_missing() {
        let err = Config::load_from(Path::new("/nonexistent/relq.toml")).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
}
