//! Statement rendering for compiled queries.

use core::fmt::Write;

use serde::Serialize;
use serde_json::Value;

use crate::dialect::Dialect;
use crate::sql::{Fragment, is_field, is_identifier, qualify, quote_ident, requote, write_ident};

use super::compile::Preload;
use super::handle::QueryHandle;

/// A rendered statement: dialect SQL plus flattened parameter values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<Value>,
}

/// A [`QueryHandle`] that collects the compiled parts and renders them as
/// SQL text for one dialect.
///
/// ```
/// # use relq_core::{Compiler, Dialect, Query, Registry, SelectBuilder, Where};
/// let registry = Registry::builder().entity("users").build();
/// let query = Query::new().filter(Where::eq("username", "alice")).limit(1);
/// let handle = SelectBuilder::new(Dialect::PostgreSQL, "users");
/// let statement = Compiler::new(&registry)
///     .apply(&query, "users", Some(handle))
///     .unwrap()
///     .to_statement();
/// assert_eq!(
///     statement.sql,
///     r#"SELECT "users".* FROM "users" WHERE "users"."username" = $1 LIMIT 1"#
/// );
/// ```
#[derive(Debug, Clone)]
pub struct SelectBuilder {
    dialect: Dialect,
    table: String,
    columns: Vec<String>,
    aliased: Vec<String>,
    omitted: Vec<String>,
    joins: Vec<String>,
    filters: Vec<Fragment>,
    orders: Vec<String>,
    limit: Option<u64>,
    offset: Option<u64>,
    preloads: Vec<Preload>,
}

impl SelectBuilder {
    /// Starts a statement over the physical table `table`
    pub fn new(dialect: Dialect, table: impl Into<String>) -> Self {
        Self {
            dialect,
            table: table.into(),
            columns: Vec::new(),
            aliased: Vec::new(),
            omitted: Vec::new(),
            joins: Vec::new(),
            filters: Vec::new(),
            orders: Vec::new(),
            limit: None,
            offset: None,
            preloads: Vec::new(),
        }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Eager-loads requested through [`QueryHandle::preload`]
    pub fn preloads(&self) -> &[Preload] {
        &self.preloads
    }

    /// Columns to drop from each result row
    pub fn omitted(&self) -> &[String] {
        &self.omitted
    }

    /// Adds `column` to an explicit selection. A `*` selection already
    /// contains every column and is left alone.
    pub fn require_column(&mut self, column: &str) {
        if !self.columns.is_empty() && !self.columns.iter().any(|c| c == column) {
            self.columns.push(column.to_owned());
        }
    }

    /// Selects `"qualifier"."column" AS "alias"` in addition to the table's columns
    pub fn column_as(mut self, qualifier: &str, column: &str, alias: &str) -> Self {
        let mut expr = qualify(&format!("{qualifier}."), column);
        expr.push_str(" AS ");
        write_ident(alias, &mut expr);
        self.aliased.push(expr);
        self
    }

    /// `SELECT [DISTINCT] cols FROM table [joins] [WHERE] [ORDER BY] [LIMIT] [OFFSET]`
    ///
    /// Rows are de-duplicated when join-filters are present, since one
    /// origin row may match several related rows.
    pub fn to_statement(&self) -> Statement {
        let mut sql = String::with_capacity(128);
        sql.push_str("SELECT ");
        if !self.joins.is_empty() {
            sql.push_str("DISTINCT ");
        }
        self.write_columns(&mut sql);
        self.write_from(&mut sql);

        let mut params = Vec::new();
        self.write_where(&mut sql, &mut params);

        if !self.orders.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&self.orders.join(", "));
        }
        self.write_pagination(&mut sql);

        self.finish(sql, params)
    }

    /// `SELECT COUNT(*)` over the same rows, ignoring ordering and pagination
    pub fn to_count_statement(&self) -> Statement {
        let mut sql = String::with_capacity(128);
        let mut params = Vec::new();

        if self.joins.is_empty() {
            sql.push_str("SELECT COUNT(*)");
            self.write_from(&mut sql);
            self.write_where(&mut sql, &mut params);
        } else {
            sql.push_str("SELECT COUNT(*) FROM (SELECT DISTINCT ");
            write_ident(&self.table, &mut sql);
            sql.push_str(".*");
            self.write_from(&mut sql);
            self.write_where(&mut sql, &mut params);
            sql.push_str(r#") AS "relq_count""#);
        }

        self.finish(sql, params)
    }

    /// `DELETE FROM table WHERE ...`, or `None` when there is no condition.
    ///
    /// Joins are not rendered; a delete is always scoped by its own table's columns.
    pub fn to_delete_statement(&self) -> Option<Statement> {
        if self.filters.is_empty() {
            return None;
        }
        let mut sql = String::with_capacity(64);
        sql.push_str("DELETE FROM ");
        write_ident(&self.table, &mut sql);
        let mut params = Vec::new();
        self.write_where(&mut sql, &mut params);
        Some(self.finish(sql, params))
    }

    /// Switches identifier quoting for dialects that do not use `"`.
    fn finish(&self, sql: String, params: Vec<Value>) -> Statement {
        let sql = match self.dialect.identifier_quote() {
            '"' => sql,
            quote => requote(&sql, quote),
        };
        Statement { sql, params }
    }

    fn write_columns(&self, sql: &mut String) {
        if self.columns.is_empty() {
            write_ident(&self.table, sql);
            sql.push_str(".*");
        }
        for (i, column) in self.columns.iter().enumerate() {
            if i > 0 {
                sql.push_str(", ");
            }
            if is_identifier(column) {
                sql.push_str(&qualify(&format!("{}.", self.table), column));
            } else if is_field(column) {
                sql.push_str(&qualify("", column));
            } else {
                sql.push_str(&quote_ident(column));
            }
        }
        for expr in &self.aliased {
            sql.push_str(", ");
            sql.push_str(expr);
        }
    }

    fn write_from(&self, sql: &mut String) {
        sql.push_str(" FROM ");
        write_ident(&self.table, sql);
        for join in &self.joins {
            sql.push(' ');
            sql.push_str(join);
        }
    }

    fn write_where(&self, sql: &mut String, params: &mut Vec<Value>) {
        match self.filters.as_slice() {
            [] => {}
            [only] => {
                sql.push_str(" WHERE ");
                self.write_fragment(only, sql, params);
            }
            many => {
                sql.push_str(" WHERE ");
                for (i, fragment) in many.iter().enumerate() {
                    if i > 0 {
                        sql.push_str(" AND ");
                    }
                    sql.push('(');
                    self.write_fragment(fragment, sql, params);
                    sql.push(')');
                }
            }
        }
    }

    /// Copies `fragment` into `sql`, rendering each `?` for the dialect and
    /// expanding list parameters to one placeholder per element.
    fn write_fragment(&self, fragment: &Fragment, sql: &mut String, params: &mut Vec<Value>) {
        let mut values = fragment.params.iter();
        let mut quoted = false;

        for c in fragment.sql.chars() {
            match c {
                '"' => {
                    quoted = !quoted;
                    sql.push(c);
                }
                '?' if !quoted => match values.next() {
                    Some(Value::Array(items)) if items.is_empty() => sql.push_str("NULL"),
                    Some(Value::Array(items)) => {
                        for (i, item) in items.iter().enumerate() {
                            if i > 0 {
                                sql.push_str(", ");
                            }
                            params.push(item.clone());
                            sql.push_str(&self.dialect.render_placeholder(params.len()));
                        }
                    }
                    Some(value) => {
                        params.push(value.clone());
                        sql.push_str(&self.dialect.render_placeholder(params.len()));
                    }
                    None => sql.push(c),
                },
                _ => sql.push(c),
            }
        }
    }

    fn write_pagination(&self, sql: &mut String) {
        match (self.limit, self.offset) {
            (Some(limit), _) => {
                let _ = write!(sql, " LIMIT {limit}");
            }
            // SQLite and MySQL only accept OFFSET after a LIMIT
            (None, Some(_)) => match self.dialect {
                Dialect::SQLite => sql.push_str(" LIMIT -1"),
                Dialect::MySQL => sql.push_str(" LIMIT 18446744073709551615"),
                Dialect::PostgreSQL => {}
            },
            (None, None) => {}
        }
        if let Some(offset) = self.offset {
            let _ = write!(sql, " OFFSET {offset}");
        }
    }
}

impl QueryHandle for SelectBuilder {
    fn select(mut self, columns: &[String]) -> Self {
        self.columns.extend(columns.iter().cloned());
        self
    }

    fn omit(mut self, columns: &[String]) -> Self {
        self.omitted.extend(columns.iter().cloned());
        self
    }

    fn inner_join(mut self, join: &str) -> Self {
        self.joins.push(join.to_owned());
        self
    }

    fn filter(mut self, condition: Fragment) -> Self {
        if !condition.is_empty() {
            self.filters.push(condition);
        }
        self
    }

    fn order(mut self, term: &str) -> Self {
        self.orders.push(term.to_owned());
        self
    }

    fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    fn preload(mut self, preload: Preload) -> Self {
        self.preloads.push(preload);
        self
    }
}
