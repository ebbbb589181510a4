//! Template translation: from a backend-agnostic [`Template`] to a SQL filter
//! clause with positional arguments, and from a field list to a projection.
//!
//! Values never appear in the generated text. Each equality term gets a
//! placeholder and its value is pushed onto the argument list in the same
//! order, so every adapter built on this module binds parameters instead of
//! interpolating them.

use crate::error::TableError;
use crate::query::Dialect;
use crate::value::{Template, Value};

/// A translated filter: `sql` is empty when the template was empty, which
/// the statement builder renders as "no WHERE restriction".
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WhereClause {
    pub sql: String,
    pub args: Vec<Value>,
}

impl WhereClause {
    pub fn is_empty(&self) -> bool {
        self.sql.is_empty()
    }
}

/// Hands out dialect placeholders, numbered continuously across a statement.
#[derive(Debug)]
pub struct Placeholders {
    dialect: Dialect,
    next: usize,
}

impl Placeholders {
    pub fn new(dialect: Dialect) -> Self {
        Self { dialect, next: 1 }
    }

    pub fn next_placeholder(&mut self) -> String {
        let p = self.dialect.placeholder(self.next);
        self.next += 1;
        p
    }
}

/// Translate a template into `col1 = ? AND col2 = ? ...`.
///
/// Terms follow the template's key order. A `Null` value becomes
/// `col IS NULL` and contributes no argument.
pub fn translate(
    template: &Template,
    dialect: Dialect,
    placeholders: &mut Placeholders,
) -> Result<WhereClause, TableError> {
    let mut terms = Vec::with_capacity(template.len());
    let mut args = Vec::with_capacity(template.len());
    for (field, value) in template {
        let col = dialect.quote_column(field)?;
        if value.is_null() {
            terms.push(format!("{col} IS NULL"));
        } else {
            terms.push(format!("{col} = {}", placeholders.next_placeholder()));
            args.push(value.clone());
        }
    }
    Ok(WhereClause {
        sql: terms.join(" AND "),
        args,
    })
}

/// Translate a field list into the column part of a `SELECT`.
///
/// `None` or an empty list selects every column. Repeated names are kept
/// once, in first-seen order.
pub fn projection(fields: Option<&[String]>, dialect: Dialect) -> Result<String, TableError> {
    let fields = match fields {
        Some(fields) if !fields.is_empty() => fields,
        _ => return Ok("*".to_string()),
    };
    let mut seen: Vec<&str> = Vec::with_capacity(fields.len());
    for field in fields {
        if !seen.contains(&field.as_str()) {
            seen.push(field);
        }
    }
    let quoted = seen
        .into_iter()
        .map(|f| dialect.quote_column(f))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(quoted.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::template;

    #[test]
    fn test_empty_template_has_no_clause() {
        let mut p = Placeholders::new(Dialect::MySql);
        let w = translate(&Template::new(), Dialect::MySql, &mut p).unwrap();
        assert!(w.is_empty());
        assert!(w.args.is_empty());
    }

    #[test]
    fn test_values_are_bound_not_interpolated() {
        let t = template([
            ("customerNumber", Value::from(5)),
            ("status", Value::from("x' OR '1'='1")),
        ]);
        let mut p = Placeholders::new(Dialect::MySql);
        let w = translate(&t, Dialect::MySql, &mut p).unwrap();
        assert_eq!(w.sql, "`customerNumber` = ? AND `status` = ?");
        assert_eq!(w.args, vec![Value::from(5), Value::from("x' OR '1'='1")]);
        assert!(!w.sql.contains("OR"));
    }

    #[test]
    fn test_null_becomes_is_null() {
        let t = template([("comments", Value::Null), ("status", Value::from("open"))]);
        let mut p = Placeholders::new(Dialect::Postgres);
        let w = translate(&t, Dialect::Postgres, &mut p).unwrap();
        assert_eq!(w.sql, "\"comments\" IS NULL AND \"status\" = $1");
        assert_eq!(w.args, vec![Value::from("open")]);
    }

    #[test]
    fn test_postgres_numbering_continues() {
        let mut p = Placeholders::new(Dialect::Postgres);
        assert_eq!(p.next_placeholder(), "$1");
        let w = translate(&template([("a", 1), ("b", 2)]), Dialect::Postgres, &mut p).unwrap();
        assert_eq!(w.sql, "\"a\" = $2 AND \"b\" = $3");
    }

    #[test]
    fn test_projection() {
        assert_eq!(projection(None, Dialect::Sqlite).unwrap(), "*");
        assert_eq!(projection(Some(&[][..]), Dialect::Sqlite).unwrap(), "*");
        let fields = vec!["a".to_string(), "b".to_string(), "a".to_string()];
        assert_eq!(
            projection(Some(fields.as_slice()), Dialect::Sqlite).unwrap(),
            "\"a\", \"b\""
        );
    }

    #[test]
    fn test_hostile_field_name_is_quoted() {
        let fields = vec!["a\" FROM secrets --".to_string()];
        assert_eq!(
            projection(Some(fields.as_slice()), Dialect::Sqlite).unwrap(),
            "\"a\"\" FROM secrets --\""
        );
    }
}
