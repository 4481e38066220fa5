//! JSON values as SQLite parameters and columns.

use relq_core::Value;
use rusqlite::types::{ToSqlOutput, Value as SqlValue, ValueRef};

/// Binds a JSON value as a SQLite parameter.
///
/// Booleans bind as `0`/`1`, numbers as INTEGER when they fit an `i64` and
/// REAL otherwise, strings as TEXT. Arrays and objects bind as their JSON text.
#[derive(Debug, Clone, Copy)]
pub struct JsonParam<'a>(pub &'a Value);

impl rusqlite::ToSql for JsonParam<'_> {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        let value = match self.0 {
            Value::Null => SqlValue::Null,
            Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
            Value::Number(n) => match n.as_i64() {
                Some(i) => SqlValue::Integer(i),
                None => SqlValue::Real(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => return Ok(ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes()))),
            Value::Array(_) | Value::Object(_) => SqlValue::Text(self.0.to_string()),
        };
        Ok(ToSqlOutput::Owned(value))
    }
}

/// Converts a column value to JSON.
///
/// Non-finite reals become `null`; blobs become arrays of byte values.
pub fn to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(r) => serde_json::Number::from_f64(r).map_or(Value::Null, Value::Number),
        ValueRef::Text(items) => Value::String(String::from_utf8_lossy(items).into_owned()),
        ValueRef::Blob(items) => Value::Array(items.iter().copied().map(Value::from).collect()),
    }
}
