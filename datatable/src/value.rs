use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A scalar stored in (or matched against) a table column.
///
/// Serialized untagged: `null`, booleans, numbers and strings map onto the
/// JSON primitives, dates are rendered as ISO-8601 strings. Deserializing a
/// JSON string always yields [`Value::Text`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

/// One row: column name to value.
pub type Record = BTreeMap<String, Value>;

/// A flat conjunctive equality filter: every entry must match exactly.
///
/// An empty template matches every record.
pub type Template = BTreeMap<String, Value>;

/// Build a [`Template`] (or a [`Record`], which has the same shape) from pairs.
///
/// ```ignore
/// let t = template([("orderNumber", 1), ("customerNumber", 5)]);
/// ```
pub fn template<K, V, I>(pairs: I) -> Template
where
    K: Into<String>,
    V: Into<Value>,
    I: IntoIterator<Item = (K, V)>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

/// In-memory evaluation of a template against a record.
///
/// A `Null` entry matches a missing field as well as an explicit null, which
/// mirrors `col IS NULL` in SQL.
pub fn matches(record: &Record, template: &Template) -> bool {
    template.iter().all(|(field, expected)| match record.get(field) {
        Some(actual) => actual == expected,
        None => expected.is_null(),
    })
}

/// Restrict a record to the requested fields. `None` or an empty list keeps
/// every column.
pub fn project(record: &Record, fields: Option<&[String]>) -> Record {
    match fields {
        Some(fields) if !fields.is_empty() => fields
            .iter()
            .map(|f| (f.clone(), record.get(f).cloned().unwrap_or(Value::Null)))
            .collect(),
        _ => record.clone(),
    }
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Name of the scalar kind, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Int(_) | Value::Float(_) => "number",
            Value::Text(_) => "string",
            Value::Date(_) | Value::DateTime(_) => "date",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Text(s) => write!(f, "{s}"),
            Value::Date(d) => write!(f, "{d}"),
            Value::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%dT%H:%M:%S%.f")),
        }
    }
}

macro_rules! impl_from_value {
    ($($ty:ty => $variant:ident $(as $cast:ty)?),+ $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v $(as $cast)?)
                }
            }
        )+
    };
}

impl_from_value!(
    bool => Bool,
    i64 => Int,
    i32 => Int as i64,
    i16 => Int as i64,
    u32 => Int as i64,
    u16 => Int as i64,
    f64 => Float,
    f32 => Float as f64,
    String => Text,
    NaiveDate => Date,
    NaiveDateTime => DateTime,
);

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

impl From<Value> for serde_json::Value {
    fn from(v: Value) -> Self {
        match v {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(b),
            Value::Int(i) => serde_json::Value::from(i),
            Value::Float(x) => serde_json::Number::from_f64(x)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            other => serde_json::Value::String(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_template_matches_everything() {
        let record = template([("a", 1)]);
        assert!(matches(&record, &Template::new()));
        assert!(matches(&Record::new(), &Template::new()));
    }

    #[test]
    fn test_template_conjunction() {
        let record = template([("status", Value::from("open")), ("customer", Value::from(5))]);
        assert!(matches(&record, &template([("status", "open")])));
        assert!(!matches(
            &record,
            &template([("status", Value::from("open")), ("customer", Value::from(6))])
        ));
    }

    #[test]
    fn test_null_matches_missing_field() {
        let record = template([("a", 1)]);
        assert!(matches(&record, &template([("b", Value::Null)])));
        assert!(!matches(&record, &template([("a", Value::Null)])));
    }

    #[test]
    fn test_project_exact_key_set() {
        let record = template([
            ("a", Value::from(1)),
            ("b", Value::from("x")),
            ("c", Value::from(true)),
        ]);
        let fields = vec!["a".to_string(), "b".to_string()];
        let projected = project(&record, Some(fields.as_slice()));
        assert_eq!(projected.keys().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(project(&record, Some(&[][..])), record);
    }

    #[test]
    fn test_json_shape() {
        let record = template([
            ("n", Value::from(3)),
            ("d", Value::from(NaiveDate::from_ymd_opt(2003, 1, 6).unwrap())),
            ("x", Value::Null),
        ]);
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json, serde_json::json!({"d": "2003-01-06", "n": 3, "x": null}));

        let parsed: Record = serde_json::from_str(r#"{"a": 1, "b": 2.5, "c": "s", "d": false}"#).unwrap();
        assert_eq!(parsed["a"], Value::Int(1));
        assert_eq!(parsed["b"], Value::Float(2.5));
        assert_eq!(parsed["c"], Value::Text("s".into()));
        assert_eq!(parsed["d"], Value::Bool(false));
    }
}
