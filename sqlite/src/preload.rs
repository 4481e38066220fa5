//! Eager-load execution.
//!
//! Each eager-load runs one extra query per relation: the related rows whose
//! key is among the parent keys (`IN` list), with the load's own scope
//! applied. Results are grouped by key and attached to each parent under
//! the relation name.

use std::collections::HashMap;

use relq_core::sql::{qualify, quote_ident};
use relq_core::{Cardinality, Dialect, Fragment, Preload, QueryHandle, Relation, SelectBuilder, Value};
use rusqlite::{Connection, params_from_iter};

use crate::database::Record;
use crate::error::Result;
use crate::values::{JsonParam, to_json};

const JUNCTION_ALIAS: &str = "__relq_junction";
const ORIGIN_COLUMN: &str = "__relq_origin";

/// Runs `handle` and every eager-load it carries, recursively.
///
/// Columns the eager-loads join on are added to an explicit selection.
/// Omitted columns are *not* removed here; see [`strip`].
pub(crate) fn fetch(conn: &Connection, mut handle: SelectBuilder, table_prefix: &str) -> Result<Vec<Record>> {
    let keys: Vec<String> = handle
        .preloads()
        .iter()
        .map(|preload| origin_column(&preload.relation).to_owned())
        .collect();
    for key in &keys {
        handle.require_column(key);
    }

    let mut records = query(conn, &handle.to_statement())?;
    for preload in handle.preloads() {
        attach(conn, table_prefix, preload, &mut records)?;
    }
    Ok(records)
}

/// Removes omitted columns from every record
pub(crate) fn strip(records: &mut [Record], omitted: &[String]) {
    if omitted.is_empty() {
        return;
    }
    for record in records {
        for column in omitted {
            record.remove(column);
        }
    }
}

/// Runs a rendered statement and collects its rows as JSON objects.
pub(crate) fn query(conn: &Connection, statement: &relq_core::Statement) -> Result<Vec<Record>> {
    relq_core::relq_trace_query!(&statement.sql, statement.params.len());

    let mut stmt = conn.prepare(&statement.sql)?;
    let names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    let mut rows = stmt.query(params_from_iter(statement.params.iter().map(JsonParam)))?;

    let mut records = Vec::new();
    while let Some(row) = rows.next()? {
        let mut record = Record::new();
        for (i, name) in names.iter().enumerate() {
            record.insert(name.clone(), to_json(row.get_ref(i)?));
        }
        records.push(record);
    }
    Ok(records)
}

/// Parent column the relation is keyed on
fn origin_column(relation: &Relation) -> &str {
    match relation {
        Relation::Direct { local_column, .. } => local_column,
        Relation::ManyToMany { key_column, .. } => key_column,
    }
}

fn attach(conn: &Connection, table_prefix: &str, preload: &Preload, parents: &mut [Record]) -> Result<()> {
    let relation = &preload.relation;
    let origin = origin_column(relation);

    let mut keys: Vec<Value> = Vec::new();
    for parent in parents.iter() {
        if let Some(key) = parent.get(origin).filter(|key| !key.is_null()) {
            if !keys.contains(key) {
                keys.push(key.clone());
            }
        }
    }

    let mut groups: HashMap<String, Vec<Record>> = HashMap::new();
    if !keys.is_empty() {
        let table = format!("{table_prefix}{}", relation.target());
        let handle = SelectBuilder::new(Dialect::SQLite, table.as_str());
        let handle = match &preload.scope {
            Some(scope) => scope.apply(handle),
            None => handle,
        };
        let omitted = handle.omitted().to_vec();

        let (handle, group_column) = match relation {
            Relation::Direct { target_column, .. } => {
                let condition = format!("{} IN (?)", qualify(&format!("{table}."), target_column));
                let mut handle = handle.filter(Fragment::new(condition, [Value::Array(keys)]));
                handle.require_column(target_column);
                (handle, target_column.as_str())
            }
            Relation::ManyToMany {
                key_column,
                junction,
                junction_origin_column,
                junction_target_column,
                ..
            } => {
                let join = format!(
                    "INNER JOIN {} AS {} ON {} = {}",
                    quote_ident(&format!("{table_prefix}{junction}")),
                    quote_ident(JUNCTION_ALIAS),
                    qualify(&format!("{JUNCTION_ALIAS}."), junction_target_column),
                    qualify(&format!("{table}."), key_column),
                );
                let condition = format!(
                    "{} IN (?)",
                    qualify(&format!("{JUNCTION_ALIAS}."), junction_origin_column)
                );
                let handle = handle
                    .inner_join(&join)
                    .filter(Fragment::new(condition, [Value::Array(keys)]))
                    .column_as(JUNCTION_ALIAS, junction_origin_column, ORIGIN_COLUMN);
                (handle, ORIGIN_COLUMN)
            }
        };

        for mut row in fetch(conn, handle, table_prefix)? {
            let key = match relation {
                Relation::Direct { .. } => row.get(group_column).cloned(),
                Relation::ManyToMany { .. } => row.remove(ORIGIN_COLUMN),
            };
            let Some(key) = key.as_ref().and_then(group_key) else { continue };
            strip(std::slice::from_mut(&mut row), &omitted);
            groups.entry(key).or_default().push(row);
        }
    }

    for parent in parents.iter_mut() {
        let related = parent
            .get(origin)
            .and_then(group_key)
            .and_then(|key| groups.get(&key))
            .cloned()
            .unwrap_or_default();
        let value = match relation.cardinality() {
            Cardinality::Many => Value::Array(related.into_iter().map(Value::Object).collect()),
            Cardinality::One => related.into_iter().next().map_or(Value::Null, Value::Object),
        };
        parent.insert(preload.name.clone(), value);
    }
    Ok(())
}

/// Grouping key for a relation column value.
///
/// `IN` compares with column affinity, so the INTEGER `1` matches the TEXT
/// `'1'`. Numeric text therefore groups with the number it spells; booleans
/// group as the integers they bind as. `NULL` never matches.
fn group_key(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::Bool(b) => Some(format!("n:{}", i64::from(*b))),
        Value::Number(n) => Some(match n.as_i64() {
            Some(i) => format!("n:{i}"),
            None => number_key(n.as_f64().unwrap_or(f64::NAN)),
        }),
        Value::String(s) => {
            let trimmed = s.trim();
            if let Ok(i) = trimmed.parse::<i64>() {
                Some(format!("n:{i}"))
            } else {
                match trimmed.parse::<f64>() {
                    Ok(f) if f.is_finite() => Some(number_key(f)),
                    _ => Some(format!("s:{s}")),
                }
            }
        }
        other => Some(format!("s:{other}")),
    }
}

/// Whole reals group with the equal integer
fn number_key(f: f64) -> String {
    if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
        format!("n:{}", f as i64)
    } else {
        format!("n:{f}")
    }
}
