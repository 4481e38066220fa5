//! INSERT and UPDATE statements for one record.
//!
//! Record values bind as-is: a list or object is a single JSON parameter,
//! never expanded.

use serde_json::{Map, Value};

use crate::dialect::Dialect;
use crate::error::{QueryError, Result};
use crate::sql::{is_identifier, requote, write_ident};

use super::Statement;

/// `INSERT INTO "table" ("a", "b") VALUES (?, ?)`, or `DEFAULT VALUES` for an
/// empty record.
pub fn insert(dialect: Dialect, table: &str, record: &Map<String, Value>) -> Result<Statement> {
    let mut sql = String::with_capacity(64);
    sql.push_str("INSERT INTO ");
    write_ident(table, &mut sql);

    if record.is_empty() {
        sql.push_str(" DEFAULT VALUES");
        return Ok(finish(dialect, sql, Vec::new()));
    }

    let mut params = Vec::with_capacity(record.len());
    sql.push_str(" (");
    for (i, column) in record.keys().enumerate() {
        check_column(column)?;
        if i > 0 {
            sql.push_str(", ");
        }
        write_ident(column, &mut sql);
    }
    sql.push_str(") VALUES (");
    for (i, value) in record.values().enumerate() {
        if i > 0 {
            sql.push_str(", ");
        }
        params.push(value.clone());
        sql.push_str(&dialect.render_placeholder(params.len()));
    }
    sql.push(')');
    Ok(finish(dialect, sql, params))
}

/// `UPDATE "table" SET "a" = ?, ... WHERE "key" = ?`.
///
/// The record must carry a non-null `key`; every other column is assigned.
/// A record holding only the key assigns the key to itself.
pub fn update(dialect: Dialect, table: &str, key: &str, record: &Map<String, Value>) -> Result<Statement> {
    check_column(key)?;
    let key_value = record
        .get(key)
        .filter(|value| !value.is_null())
        .ok_or_else(|| QueryError::MissingKey(key.to_owned()))?;

    let mut sql = String::with_capacity(64);
    let mut params = Vec::with_capacity(record.len());
    sql.push_str("UPDATE ");
    write_ident(table, &mut sql);
    sql.push_str(" SET ");

    let mut assignments = record.iter().filter(|(column, _)| *column != key).peekable();
    if assignments.peek().is_none() {
        write_assignment(dialect, key, key_value, &mut sql, &mut params);
    }
    for (i, (column, value)) in assignments.enumerate() {
        check_column(column)?;
        if i > 0 {
            sql.push_str(", ");
        }
        write_assignment(dialect, column, value, &mut sql, &mut params);
    }

    sql.push_str(" WHERE ");
    write_assignment(dialect, key, key_value, &mut sql, &mut params);
    Ok(finish(dialect, sql, params))
}

fn check_column(column: &str) -> Result<()> {
    if is_identifier(column) {
        Ok(())
    } else {
        Err(QueryError::FieldInvalid(column.to_owned()))
    }
}

fn write_assignment(dialect: Dialect, column: &str, value: &Value, sql: &mut String, params: &mut Vec<Value>) {
    write_ident(column, sql);
    params.push(value.clone());
    sql.push_str(" = ");
    sql.push_str(&dialect.render_placeholder(params.len()));
}

fn finish(dialect: Dialect, sql: String, params: Vec<Value>) -> Statement {
    let sql = match dialect.identifier_quote() {
        '"' => sql,
        quote => requote(&sql, quote),
    };
    Statement { sql, params }
}
