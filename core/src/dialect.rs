//! SQL dialects and their placeholder syntax.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

/// Target database dialect.
///
/// Compiled fragments always use `?` and `"ident"` quoting; the dialect only
/// matters when a [`SelectBuilder`](crate::query::SelectBuilder) renders the
/// final statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    #[default]
    SQLite,
    #[serde(alias = "postgres")]
    PostgreSQL,
    MySQL,
}

impl Dialect {
    pub const ALL: &'static [&'static str] = &["sqlite", "postgresql", "mysql"];

    #[inline]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SQLite => "sqlite",
            Self::PostgreSQL => "postgresql",
            Self::MySQL => "mysql",
        }
    }

    /// Identifier quote character: `` ` `` for MySQL, `"` otherwise.
    #[inline]
    pub const fn identifier_quote(self) -> char {
        match self {
            Self::MySQL => '`',
            Self::SQLite | Self::PostgreSQL => '"',
        }
    }

    /// Renders a placeholder for the given 1-based parameter index.
    ///
    /// - PostgreSQL: `$1`, `$2`, ...
    /// - SQLite/MySQL: `?`
    #[inline]
    pub fn render_placeholder(self, index: usize) -> Cow<'static, str> {
        match self {
            Self::PostgreSQL => Cow::Owned(format!("${index}")),
            Self::SQLite | Self::MySQL => Cow::Borrowed("?"),
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sqlite" => Ok(Self::SQLite),
            "postgresql" | "postgres" => Ok(Self::PostgreSQL),
            "mysql" => Ok(Self::MySQL),
            other => Err(format!(
                "unknown dialect `{other}`, expected one of: {}",
                Self::ALL.join(", ")
            )),
        }
    }
}
