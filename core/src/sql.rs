//! SQL fragments and identifier helpers.
//!
//! Every compiler stage produces a [`Fragment`]: SQL text using `?` for each
//! bound value plus the values in placeholder order. A list value (the `in`
//! predicates) occupies a single placeholder and is only expanded when a
//! statement is rendered.

use core::fmt::{self, Display};
use regex::Regex;
use serde_json::Value;
use smallvec::SmallVec;
use std::sync::LazyLock;

/// Field path grammar: ASCII word segments separated by dots.
static FIELD_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_]+(\.[A-Za-z0-9_]+)*$").expect("valid regex"));

/// Returns true if `field` matches the field path grammar (`^\w+(\.\w+)*$`, ASCII only).
#[inline]
pub fn is_field(field: &str) -> bool {
    FIELD_PATH.is_match(field)
}

/// Returns true if `name` is a single identifier segment (no dots).
#[inline]
pub fn is_identifier(name: &str) -> bool {
    !name.is_empty() && name.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

/// Writes `"name"`, doubling any embedded quote.
pub fn write_ident(name: &str, buf: &mut String) {
    buf.push('"');
    for c in name.chars() {
        if c == '"' {
            buf.push('"');
        }
        buf.push(c);
    }
    buf.push('"');
}

/// Returns `"name"`.
#[inline]
pub fn quote_ident(name: &str) -> String {
    let mut buf = String::with_capacity(name.len() + 2);
    write_ident(name, &mut buf);
    buf
}

/// Rewrites `"ident"` quoting in `sql` to `quote` quoting.
///
/// Embedded `""` becomes a bare `"`, and `quote` inside an identifier is
/// doubled. Text outside identifiers is copied unchanged; compiled SQL never
/// inlines string literals, so every `"` belongs to an identifier.
pub fn requote(sql: &str, quote: char) -> String {
    let mut out = String::with_capacity(sql.len());
    let mut chars = sql.chars().peekable();
    let mut quoted = false;
    while let Some(c) = chars.next() {
        match c {
            '"' if quoted && chars.peek() == Some(&'"') => {
                chars.next();
                out.push('"');
            }
            '"' => {
                quoted = !quoted;
                out.push(quote);
            }
            c if quoted && c == quote => {
                out.push(quote);
                out.push(quote);
            }
            c => out.push(c),
        }
    }
    out
}

/// Qualifies `path` with `prefix` and quotes every dot-separated segment.
///
/// `qualify("users.", "username")` renders `"users"."username"`.
pub fn qualify(prefix: &str, path: &str) -> String {
    let mut buf = String::with_capacity(prefix.len() + path.len() + 6);
    let full = format!("{prefix}{path}");
    for (i, segment) in full.split('.').enumerate() {
        if i > 0 {
            buf.push('.');
        }
        write_ident(segment, &mut buf);
    }
    buf
}

/// SQL text with `?` placeholders and its ordered parameter values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fragment {
    pub sql: String,
    pub params: SmallVec<[Value; 4]>,
}

impl Fragment {
    // ==================== constructors ====================

    /// Creates an empty fragment ("no condition")
    #[inline]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Creates a fragment without parameters
    #[inline]
    pub fn raw(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: SmallVec::new(),
        }
    }

    /// Creates a fragment from SQL text and its parameters
    pub fn new(sql: impl Into<String>, params: impl IntoIterator<Item = Value>) -> Self {
        Self {
            sql: sql.into(),
            params: params.into_iter().collect(),
        }
    }

    // ==================== inspection ====================

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.sql.is_empty()
    }

    /// Counts `?` placeholders outside quoted identifiers.
    pub fn placeholder_count(&self) -> usize {
        let mut quoted = false;
        let mut count = 0;
        for c in self.sql.chars() {
            match c {
                '"' => quoted = !quoted,
                '?' if !quoted => count += 1,
                _ => {}
            }
        }
        count
    }

    // ==================== combinators ====================

    /// Joins non-empty fragments with ` AND `, concatenating params in order.
    ///
    /// A single non-empty fragment is returned unchanged; none yields an empty fragment.
    pub fn and<I>(fragments: I) -> Fragment
    where
        I: IntoIterator<Item = Fragment>,
    {
        let mut result = Fragment::empty();
        for fragment in fragments.into_iter().filter(|f| !f.is_empty()) {
            if !result.is_empty() {
                result.sql.push_str(" AND ");
            }
            result.sql.push_str(&fragment.sql);
            result.params.extend(fragment.params);
        }
        result
    }

    /// Combines non-empty fragments with OR.
    ///
    /// One operand is returned unwrapped; two or more render as `((a) OR (b) ...)`.
    pub fn or<I>(fragments: I) -> Fragment
    where
        I: IntoIterator<Item = Fragment>,
    {
        let mut operands: SmallVec<[Fragment; 4]> =
            fragments.into_iter().filter(|f| !f.is_empty()).collect();

        if operands.len() <= 1 {
            return operands.pop().unwrap_or_default();
        }

        let mut result = Fragment::raw("(");
        for (i, operand) in operands.into_iter().enumerate() {
            if i > 0 {
                result.sql.push_str(" OR ");
            }
            result.sql.push('(');
            result.sql.push_str(&operand.sql);
            result.sql.push(')');
            result.params.extend(operand.params);
        }
        result.sql.push(')');
        result
    }

    /// Wraps as `NOT ( self )`. Negating an empty fragment leaves it empty.
    pub fn negate(self) -> Fragment {
        if self.is_empty() {
            return self;
        }
        Fragment {
            sql: format!("NOT ( {} )", self.sql),
            params: self.params,
        }
    }

    /// Wrap in parentheses: (self)
    #[inline]
    pub fn parens(self) -> Fragment {
        if self.is_empty() {
            return self;
        }
        Fragment {
            sql: format!("({})", self.sql),
            params: self.params,
        }
    }
}

impl Display for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params: Vec<String> = self.params.iter().map(Value::to_string).collect();
        write!(f, r#"sql: "{}", params: [{}]"#, self.sql, params.join(", "))
    }
}
