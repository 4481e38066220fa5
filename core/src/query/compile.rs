//! Query assembly: eager-loads, joins, filter, ordering and pagination.

use crate::error::{QueryError, Result};
use crate::join::JoinContext;
use crate::relation::{Registry, Relation};
use crate::sql::{Fragment, is_identifier};

use super::Query;
use super::handle::QueryHandle;

/// Compiles [`Query`] descriptions against a relation registry.
///
/// Compilation is pure: it reads the registry and the query and allocates
/// local buffers only, so one compiler can serve any number of threads.
#[derive(Debug, Clone, Copy)]
pub struct Compiler<'r> {
    registry: &'r Registry,
    table_prefix: &'r str,
}

impl<'r> Compiler<'r> {
    pub fn new(registry: &'r Registry) -> Self {
        Self {
            registry,
            table_prefix: "",
        }
    }

    /// Sets the naming-strategy prefix prepended to every physical table name
    pub fn with_table_prefix(mut self, table_prefix: &'r str) -> Self {
        self.table_prefix = table_prefix;
        self
    }

    pub fn registry(&self) -> &'r Registry {
        self.registry
    }

    pub fn table_prefix(&self) -> &'r str {
        self.table_prefix
    }

    /// Physical table name of `entity`
    #[inline]
    pub fn table_name(&self, entity: &str) -> String {
        format!("{}{entity}", self.table_prefix)
    }

    /// Physical table name of `entity`, rejecting names that are not a
    /// single identifier
    pub fn table(&self, entity: &str) -> Result<String> {
        if !is_identifier(entity) {
            return Err(QueryError::EntityInvalid(entity.to_owned()));
        }
        Ok(self.table_name(entity))
    }

    /// Compiles `query` for `entity` without touching any handle.
    ///
    /// The first error aborts compilation, including errors in nested
    /// eager-load scopes.
    pub fn compile(&self, query: &Query, entity: &str) -> Result<CompiledQuery> {
        let table = self.table(entity)?;

        let mut preloads = Vec::with_capacity(query.preloads.len());
        for (name, scope) in query.preloads.iter() {
            let relation = self.registry.resolve(entity, name)?;
            let scope = match scope {
                Some(scope) => Some(Box::new(self.compile(scope, relation.target())?)),
                None => None,
            };
            preloads.push(Preload {
                name: name.to_owned(),
                relation: relation.clone(),
                scope,
            });
        }

        // Join filters first, in declaration order, then the root filter
        let mut ctx = JoinContext::new(self.registry, self.table_prefix);
        let mut joins = Vec::with_capacity(query.with.len());
        let mut conditions = Vec::with_capacity(query.with.len() + 1);
        for (name, with) in query.with.iter() {
            let relation = self.registry.resolve(entity, name)?;
            let clause = with.compile(&mut ctx, &table, relation)?;
            joins.push(clause.join);
            conditions.push(clause.filter);
        }

        if let Some(filter) = &query.filter {
            conditions.push(filter.compile(&format!("{table}."))?);
        }
        let filter = Fragment::and(conditions);

        let orders = query
            .orders
            .iter()
            .map(|order| order.compile(&table))
            .collect::<Result<Vec<_>>>()?;

        crate::relq_trace_compile!(entity, joins.len(), filter.params.len());

        Ok(CompiledQuery {
            entity: entity.to_owned(),
            table,
            select: query.select.clone(),
            omit: query.omit.clone(),
            joins,
            filter,
            orders,
            limit: query.limit,
            offset: query.offset,
            preloads,
        })
    }

    /// Compiles `query` for `entity` and applies it to `handle`.
    ///
    /// Fails with [`QueryError::NilConnection`] when there is no handle.
    pub fn apply<H: QueryHandle>(&self, query: &Query, entity: &str, handle: Option<H>) -> Result<H> {
        let handle = handle.ok_or(QueryError::NilConnection)?;
        Ok(self.compile(query, entity)?.apply(handle))
    }
}

/// A query description resolved against the registry.
///
/// All identifiers are validated and quoted; every condition carries its
/// parameters in placeholder order.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    pub entity: String,
    /// Physical table name (prefix applied)
    pub table: String,
    pub select: Vec<String>,
    pub omit: Vec<String>,
    /// One entry per top-level join-filter
    pub joins: Vec<String>,
    /// Join-filter conditions followed by the root filter
    pub filter: Fragment,
    /// Rendered ORDER BY terms
    pub orders: Vec<String>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    pub preloads: Vec<Preload>,
}

impl CompiledQuery {
    /// Applies every part to `handle` in the fixed order: eager-loads, joins,
    /// selection, omissions, filter, limit, offset, ordering.
    pub fn apply<H: QueryHandle>(&self, mut handle: H) -> H {
        for preload in &self.preloads {
            handle = handle.preload(preload.clone());
        }
        for join in &self.joins {
            handle = handle.inner_join(join);
        }
        if !self.select.is_empty() {
            handle = handle.select(&self.select);
        }
        if !self.omit.is_empty() {
            handle = handle.omit(&self.omit);
        }
        if !self.filter.is_empty() {
            handle = handle.filter(self.filter.clone());
        }
        if let Some(limit) = self.limit {
            handle = handle.limit(limit);
        }
        if let Some(offset) = self.offset {
            handle = handle.offset(offset);
        }
        for order in &self.orders {
            handle = handle.order(order);
        }
        handle
    }

    /// Total number of bound parameters, not counting eager-load scopes
    pub fn param_count(&self) -> usize {
        self.filter.params.len()
    }
}

/// An eager-load request: the relation to follow and an optional scope
/// compiled against the relation's target entity.
#[derive(Debug, Clone, PartialEq)]
pub struct Preload {
    pub name: String,
    pub relation: Relation,
    pub scope: Option<Box<CompiledQuery>>,
}
