use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::error::{QueryError, Result};
use crate::sql::{Fragment, is_field, qualify};

/// Comparison operators accepted in a field predicate.
///
/// The wire names are case-sensitive: `"like"`, `"not null"`, `">="`, ...
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Like,
    Null,
    NotNull,
    Between,
    In,
    NotIn,
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

/// Value shape an operator expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    None,
    Scalar,
    Pair,
    List,
}

impl Operator {
    pub const ALL: &'static [Operator] = &[
        Self::Like,
        Self::Null,
        Self::NotNull,
        Self::Between,
        Self::In,
        Self::NotIn,
        Self::Eq,
        Self::Ne,
        Self::Gt,
        Self::Ge,
        Self::Lt,
        Self::Le,
    ];

    /// Parses a wire operator name.
    pub fn parse(name: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|op| op.as_str() == name)
            .ok_or_else(|| QueryError::UnsupportedPredicate(name.to_owned()))
    }

    /// Wire name of the operator
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Like => "like",
            Self::Null => "null",
            Self::NotNull => "not null",
            Self::Between => "between",
            Self::In => "in",
            Self::NotIn => "not in",
            Self::Eq => "=",
            Self::Ne => "<>",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Lt => "<",
            Self::Le => "<=",
        }
    }

    /// SQL that follows the column
    const fn sql(self) -> &'static str {
        match self {
            Self::Like => "LIKE (?)",
            Self::Null => "IS NULL",
            Self::NotNull => "IS NOT NULL",
            Self::Between => "BETWEEN ? AND ?",
            Self::In => "IN (?)",
            Self::NotIn => "NOT IN (?)",
            Self::Eq => "= ?",
            Self::Ne => "<> ?",
            Self::Gt => "> ?",
            Self::Ge => ">= ?",
            Self::Lt => "< ?",
            Self::Le => "<= ?",
        }
    }

    const fn shape(self) -> Shape {
        match self {
            Self::Null | Self::NotNull => Shape::None,
            Self::Between => Shape::Pair,
            Self::In | Self::NotIn => Shape::List,
            Self::Like | Self::Eq | Self::Ne | Self::Gt | Self::Ge | Self::Lt | Self::Le => {
                Shape::Scalar
            }
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operator {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// A leaf condition: `name <predicate> value`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Field {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub predicate: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub value: Value,
}

impl Field {
    pub fn new(name: impl Into<String>, predicate: Operator, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            predicate: predicate.as_str().to_owned(),
            value: value.into(),
        }
    }

    /// Compiles the predicate against a column qualifier such as `"users."`.
    ///
    /// The field is validated first, then the operator, then the value shape.
    pub fn compile(&self, prefix: &str) -> Result<Fragment> {
        if !is_field(&self.name) {
            return Err(QueryError::FieldInvalid(self.name.clone()));
        }
        let operator = Operator::parse(&self.predicate)?;
        let column = qualify(prefix, &self.name);
        let sql = format!("{column} {}", operator.sql());

        match operator.shape() {
            Shape::None => Ok(Fragment::raw(sql)),
            Shape::Scalar => {
                if self.value.is_array() {
                    return Err(self.invalid(operator, "expected a single value, got a list"));
                }
                Ok(Fragment::new(sql, [self.value.clone()]))
            }
            Shape::Pair => match &self.value {
                Value::Array(pair) if pair.len() == 2 => {
                    if pair.iter().any(Value::is_array) {
                        return Err(self.invalid(operator, "bounds must be single values"));
                    }
                    Ok(Fragment::new(sql, pair.iter().cloned()))
                }
                _ => Err(self.invalid(operator, "expected a list of exactly two values")),
            },
            Shape::List => match &self.value {
                Value::Array(_) => Ok(Fragment::new(sql, [self.value.clone()])),
                _ => Err(self.invalid(operator, "expected a list of values")),
            },
        }
    }

    fn invalid(&self, operator: Operator, reason: &'static str) -> QueryError {
        QueryError::InvalidValue {
            field: self.name.clone(),
            predicate: operator.as_str(),
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn field(name: &str, predicate: &str, value: Value) -> Field {
        Field {
            name: name.into(),
            predicate: predicate.into(),
            value,
        }
    }

    #[test]
    fn test_equality_with_prefix() {
        let sql = field("username", "=", json!("alice")).compile("users.").unwrap();
        assert_eq!(sql.sql, r#""users"."username" = ?"#);
        assert_eq!(sql.params.as_slice(), &[json!("alice")]);
    }

    #[test]
    fn test_operator_table() {
        let cases = [
            ("like", json!("a%"), r#""name" LIKE (?)"#, 1),
            ("null", Value::Null, r#""name" IS NULL"#, 0),
            ("not null", Value::Null, r#""name" IS NOT NULL"#, 0),
            ("between", json!([1, 9]), r#""name" BETWEEN ? AND ?"#, 2),
            ("in", json!([1, 2, 3]), r#""name" IN (?)"#, 1),
            ("not in", json!(["x"]), r#""name" NOT IN (?)"#, 1),
            ("=", json!(1), r#""name" = ?"#, 1),
            ("<>", json!(1), r#""name" <> ?"#, 1),
            (">", json!(1), r#""name" > ?"#, 1),
            (">=", json!(1), r#""name" >= ?"#, 1),
            ("<", json!(1), r#""name" < ?"#, 1),
            ("<=", json!(1), r#""name" <= ?"#, 1),
        ];

        for (predicate, value, expected, params) in cases {
            let sql = field("name", predicate, value).compile("").unwrap();
            assert_eq!(sql.sql, expected, "predicate {predicate}");
            assert_eq!(sql.params.len(), params, "predicate {predicate}");
            assert_eq!(sql.placeholder_count(), params, "predicate {predicate}");
        }
    }

    #[test]
    fn test_in_binds_single_list_param() {
        let sql = field("id", "in", json!([1, 2, 3])).compile("").unwrap();
        assert_eq!(sql.params.as_slice(), &[json!([1, 2, 3])]);
    }

    #[test]
    fn test_operators_are_case_sensitive() {
        let err = field("name", "LIKE", json!("a")).compile("").unwrap_err();
        assert_eq!(err, QueryError::UnsupportedPredicate("LIKE".into()));

        let err = field("name", "~", json!("a")).compile("").unwrap_err();
        assert_eq!(err, QueryError::UnsupportedPredicate("~".into()));
    }

    #[test]
    fn test_invalid_field_is_rejected_before_operator() {
        let err = field("name) OR (1=1", "nope", json!(1)).compile("").unwrap_err();
        assert_eq!(err, QueryError::FieldInvalid("name) OR (1=1".into()));
    }

    #[test]
    fn test_between_requires_pair() {
        for value in [json!([1]), json!([1, 2, 3]), json!([]), json!(5), json!([[1], 2])] {
            let err = field("age", "between", value.clone()).compile("").unwrap_err();
            assert!(
                matches!(err, QueryError::InvalidValue { predicate: "between", .. }),
                "{value} should be rejected"
            );
        }
    }

    #[test]
    fn test_list_and_scalar_shapes() {
        assert!(matches!(
            field("id", "in", json!(1)).compile(""),
            Err(QueryError::InvalidValue { predicate: "in", .. })
        ));
        assert!(matches!(
            field("id", "=", json!([1, 2])).compile(""),
            Err(QueryError::InvalidValue { predicate: "=", .. })
        ));
        // An empty list is a valid (never matching) IN
        assert!(field("id", "in", json!([])).compile("").is_ok());
    }

    #[test]
    fn test_field_paths_are_qualified_per_segment() {
        let sql = field("posts_1.title", "=", json!("t")).compile("").unwrap();
        assert_eq!(sql.sql, r#""posts_1"."title" = ?"#);
    }

    #[test]
    fn test_deserialize_field() {
        let f: Field =
            serde_json::from_value(json!({"name": "age", "predicate": ">", "value": 18})).unwrap();
        assert_eq!(f, Field::new("age", Operator::Gt, 18));
    }
}
