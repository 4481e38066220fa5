use core::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{QueryError, Result};
use crate::sql::{is_field, qualify};

/// Sort direction of an ORDER BY term
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    /// Parses `asc`/`desc` in any case. An empty string means ascending.
    pub fn parse(direction: &str) -> Option<Self> {
        if direction.is_empty() || direction.eq_ignore_ascii_case("asc") {
            Some(Self::Asc)
        } else if direction.eq_ignore_ascii_case("desc") {
            Some(Self::Desc)
        } else {
            None
        }
    }

    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// One ORDER BY term as received: the direction is validated at compile time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    #[serde(default)]
    pub field: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub direction: String,
}

impl Order {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Asc.as_sql().to_owned(),
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Desc.as_sql().to_owned(),
        }
    }

    /// Renders `"table"."field" DIR`.
    pub fn compile(&self, table: &str) -> Result<String> {
        if !is_field(&self.field) {
            return Err(QueryError::FieldInvalid(self.field.clone()));
        }
        let direction = Direction::parse(&self.direction).ok_or_else(|| QueryError::OrderInvalid {
            field: self.field.clone(),
            direction: self.direction.clone(),
        })?;

        let mut sql = qualify(&format!("{table}."), &self.field);
        sql.push(' ');
        sql.push_str(direction.as_sql());
        Ok(sql)
    }
}
