//! Filter-through-relation joins.
//!
//! A [`With`] node filters the origin rows by conditions on a related entity.
//! Each hop becomes one `INNER JOIN` (two for many-to-many relations) on a
//! freshly generated alias, and the node's own filter is compiled against
//! that alias.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::expressions::Where;
use crate::query::Relations;
use crate::relation::{Registry, Relation};
use crate::sql::{Fragment, quote_ident};

/// Relation-scoped filter, optionally continuing through further relations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct With {
    #[serde(default, rename = "where", skip_serializing_if = "Option::is_none")]
    pub filter: Option<Where>,
    #[serde(default, skip_serializing_if = "Relations::is_empty")]
    pub with: Relations<With>,
}

impl With {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the filter applied to the related entity
    pub fn filter(mut self, filter: Where) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Continues through `relation` of the related entity
    pub fn with(mut self, relation: impl Into<String>, next: With) -> Self {
        self.with.insert(relation, next);
        self
    }

    /// Compiles this hop through `relation`, joining from the table or alias
    /// `origin_ref`.
    ///
    /// Nested relations are resolved against the registry under this hop's
    /// target entity and their joins and filters are appended in declaration order.
    pub fn compile(
        &self,
        ctx: &mut JoinContext<'_>,
        origin_ref: &str,
        relation: &Relation,
    ) -> Result<JoinClause> {
        let suffix = ctx.next_alias();
        let target = relation.target();
        let alias = ctx.alias(target, suffix);

        let mut join = String::with_capacity(128);
        match relation {
            Relation::Direct {
                local_column,
                target_column,
                ..
            } => {
                write_join(
                    &mut join,
                    &ctx.table(target),
                    &alias,
                    (origin_ref, local_column),
                    (&alias, target_column),
                );
            }
            Relation::ManyToMany {
                key_column,
                junction,
                junction_origin_column,
                junction_target_column,
                ..
            } => {
                let junction_alias = ctx.alias(junction, suffix);
                write_join(
                    &mut join,
                    &ctx.table(junction),
                    &junction_alias,
                    (origin_ref, key_column),
                    (&junction_alias, junction_origin_column),
                );
                join.push(' ');
                write_join(
                    &mut join,
                    &ctx.table(target),
                    &alias,
                    (&alias, key_column),
                    (&junction_alias, junction_target_column),
                );
            }
        }

        let mut filters = Vec::with_capacity(1 + self.with.len());
        if let Some(filter) = &self.filter {
            filters.push(filter.compile(&format!("{alias}."))?);
        }

        for (name, next) in self.with.iter() {
            let next_relation = ctx.registry.resolve(target, name)?;
            let clause = next.compile(ctx, &alias, next_relation)?;
            join.push(' ');
            join.push_str(&clause.join);
            filters.push(clause.filter);
        }

        Ok(JoinClause {
            alias,
            join,
            filter: Fragment::and(filters),
        })
    }
}

/// `INNER JOIN "table" AS "alias" ON "l"."lc" = "r"."rc"`
fn write_join(buf: &mut String, table: &str, alias: &str, left: (&str, &str), right: (&str, &str)) {
    buf.push_str("INNER JOIN ");
    buf.push_str(&quote_ident(table));
    buf.push_str(" AS ");
    buf.push_str(&quote_ident(alias));
    buf.push_str(" ON ");
    write_column(buf, left.0, left.1);
    buf.push_str(" = ");
    write_column(buf, right.0, right.1);
}

fn write_column(buf: &mut String, qualifier: &str, column: &str) {
    buf.push_str(&quote_ident(qualifier));
    buf.push('.');
    buf.push_str(&quote_ident(column));
}

/// Result of compiling one relation hop (and everything nested below it).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JoinClause {
    /// Alias given to the hop's target table
    pub alias: String,
    /// One or more `INNER JOIN ... ON ...` clauses, space separated
    pub join: String,
    /// Conditions on the joined tables; empty when the hop only constrains existence
    pub filter: Fragment,
}

/// Shared state for compiling the join-filters of one query.
///
/// The alias counter is shared by every hop of the query, so sibling and
/// nested joins on the same target entity always get distinct aliases.
#[derive(Debug)]
pub struct JoinContext<'r> {
    registry: &'r Registry,
    table_prefix: &'r str,
    aliases: usize,
}

impl<'r> JoinContext<'r> {
    pub fn new(registry: &'r Registry, table_prefix: &'r str) -> Self {
        Self {
            registry,
            table_prefix,
            aliases: 0,
        }
    }

    #[inline]
    fn next_alias(&mut self) -> usize {
        self.aliases += 1;
        self.aliases
    }

    /// Physical table name of an entity
    #[inline]
    fn table(&self, entity: &str) -> String {
        format!("{}{entity}", self.table_prefix)
    }

    #[inline]
    fn alias(&self, entity: &str, suffix: usize) -> String {
        format!("{}{entity}_{suffix}", self.table_prefix)
    }

    /// Number of aliases generated so far
    pub fn alias_count(&self) -> usize {
        self.aliases
    }
}
