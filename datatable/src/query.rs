//! A statement builder composing translated templates into full SQL.
//!
//! # Example
//!
//! ```ignore
//! let b = StatementBuilder::new("classicmodels.orders", Dialect::MySql)?;
//! let stmt = b.select(&template([("status", "Shipped")]), &FindOptions::default().limit(10))?;
//! // stmt.sql  == "SELECT * FROM `classicmodels`.`orders` WHERE `status` = ? LIMIT 10"
//! // stmt.args == [Value::Text("Shipped")]
//! ```

use crate::error::TableError;
use crate::table::FindOptions;
use crate::template::{self, Placeholders, WhereClause};
use crate::value::{Record, Template, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// SQLite-style `?` placeholders.
    Sqlite,
    /// MySQL-style `?` placeholders with backtick quoting.
    MySql,
    /// Postgres-style `$1, $2, ...` placeholders.
    Postgres,
}

impl Dialect {
    pub(crate) fn placeholder(self, index: usize) -> String {
        match self {
            Dialect::Postgres => format!("${index}"),
            Dialect::Sqlite | Dialect::MySql => "?".to_string(),
        }
    }

    fn quote_char(self) -> char {
        match self {
            Dialect::MySql => '`',
            Dialect::Sqlite | Dialect::Postgres => '"',
        }
    }

    /// `LIMIT` value standing for "no limit" where `OFFSET` needs a `LIMIT`.
    fn unbounded_limit(self) -> Option<&'static str> {
        match self {
            Dialect::Sqlite => Some("-1"),
            Dialect::MySql => Some("18446744073709551615"),
            Dialect::Postgres => None,
        }
    }

    /// Quote a single identifier, doubling any embedded quote character.
    pub fn quote_column(self, ident: &str) -> Result<String, TableError> {
        if ident.is_empty() || ident.contains('\0') {
            return Err(TableError::invalid_argument(format!(
                "Invalid column identifier: {ident:?}"
            )));
        }
        let q = self.quote_char();
        let escaped = ident.replace(q, &format!("{q}{q}"));
        Ok(format!("{q}{escaped}{q}"))
    }

    /// Quote a possibly qualified name (`schema.table`), part by part.
    pub fn quote_qualified(self, ident: &str) -> Result<String, TableError> {
        let parts = ident
            .split('.')
            .map(|part| self.quote_column(part))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| {
                TableError::invalid_argument(format!("Invalid table identifier: {ident:?}"))
            })?;
        Ok(parts.join("."))
    }
}

/// SQL text plus its positional arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub args: Vec<Value>,
}

/// Builds the four statement shapes of the relational adapter for one table.
#[derive(Debug, Clone)]
pub struct StatementBuilder {
    table: String,
    dialect: Dialect,
}

impl StatementBuilder {
    pub fn new(table: &str, dialect: Dialect) -> Result<Self, TableError> {
        Ok(Self {
            table: dialect.quote_qualified(table)?,
            dialect,
        })
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// `SELECT <projection> FROM t [WHERE ..] [ORDER BY ..] [LIMIT n] [OFFSET m]`.
    pub fn select(&self, filter: &Template, options: &FindOptions) -> Result<Statement, TableError> {
        let columns = template::projection(options.field_list(), self.dialect)?;
        let mut placeholders = Placeholders::new(self.dialect);
        let clause = template::translate(filter, self.dialect, &mut placeholders)?;

        let mut sql = format!("SELECT {columns} FROM {}", self.table);
        append_where(&mut sql, &clause);
        self.append_order(&mut sql, options)?;
        self.append_limit_offset(&mut sql, options);
        Ok(Statement {
            sql,
            args: clause.args,
        })
    }

    /// `INSERT INTO t (c1, c2, ..) VALUES (?, ?, ..)`.
    pub fn insert(&self, record: &Record) -> Result<Statement, TableError> {
        if record.is_empty() {
            return Err(TableError::invalid_argument("cannot insert an empty record"));
        }
        let mut placeholders = Placeholders::new(self.dialect);
        let mut columns = Vec::with_capacity(record.len());
        let mut slots = Vec::with_capacity(record.len());
        for field in record.keys() {
            columns.push(self.dialect.quote_column(field)?);
            slots.push(placeholders.next_placeholder());
        }
        Ok(Statement {
            sql: format!(
                "INSERT INTO {} ({}) VALUES ({})",
                self.table,
                columns.join(", "),
                slots.join(", ")
            ),
            args: record.values().cloned().collect(),
        })
    }

    /// `UPDATE t SET c1 = ?, .. [WHERE ..]` as a single statement, so the
    /// store applies it to every matched row or to none.
    pub fn update(&self, filter: &Template, new_values: &Record) -> Result<Statement, TableError> {
        if new_values.is_empty() {
            return Err(TableError::invalid_argument("update requires at least one new value"));
        }
        let mut placeholders = Placeholders::new(self.dialect);
        let mut assignments = Vec::with_capacity(new_values.len());
        let mut args: Vec<Value> = Vec::with_capacity(new_values.len() + filter.len());
        for (field, value) in new_values {
            let col = self.dialect.quote_column(field)?;
            assignments.push(format!("{col} = {}", placeholders.next_placeholder()));
            args.push(value.clone());
        }
        let clause = template::translate(filter, self.dialect, &mut placeholders)?;

        let mut sql = format!("UPDATE {} SET {}", self.table, assignments.join(", "));
        append_where(&mut sql, &clause);
        args.extend(clause.args);
        Ok(Statement { sql, args })
    }

    /// `DELETE FROM t [WHERE ..]`.
    pub fn delete(&self, filter: &Template) -> Result<Statement, TableError> {
        let mut placeholders = Placeholders::new(self.dialect);
        let clause = template::translate(filter, self.dialect, &mut placeholders)?;
        let mut sql = format!("DELETE FROM {}", self.table);
        append_where(&mut sql, &clause);
        Ok(Statement {
            sql,
            args: clause.args,
        })
    }

    fn append_order(&self, sql: &mut String, options: &FindOptions) -> Result<(), TableError> {
        if options.order_by.is_empty() {
            return Ok(());
        }
        let mut clauses = Vec::with_capacity(options.order_by.len());
        for order in &options.order_by {
            let col = self.dialect.quote_column(&order.column)?;
            if order.ascending {
                clauses.push(format!("{col} ASC"));
            } else {
                clauses.push(format!("{col} DESC"));
            }
        }
        sql.push_str(" ORDER BY ");
        sql.push_str(&clauses.join(", "));
        Ok(())
    }

    fn append_limit_offset(&self, sql: &mut String, options: &FindOptions) {
        match (options.limit, options.offset, self.dialect.unbounded_limit()) {
            (Some(limit), _, _) => sql.push_str(&format!(" LIMIT {limit}")),
            (None, Some(_), Some(unbounded)) => sql.push_str(&format!(" LIMIT {unbounded}")),
            _ => {}
        }
        if let Some(offset) = options.offset {
            sql.push_str(&format!(" OFFSET {offset}"));
        }
    }
}

fn append_where(sql: &mut String, clause: &WhereClause) {
    if !clause.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&clause.sql);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::OrderBy;
    use crate::value::template;

    #[test]
    fn test_simple_select() {
        let stmt = StatementBuilder::new("users", Dialect::Sqlite)
            .unwrap()
            .select(&Template::new(), &FindOptions::default())
            .unwrap();
        assert_eq!(stmt.sql, "SELECT * FROM \"users\"");
        assert!(stmt.args.is_empty());
    }

    #[test]
    fn test_complex_select() {
        let stmt = StatementBuilder::new("classicmodels.orders", Dialect::MySql)
            .unwrap()
            .select(
                &template([("status", "Shipped")]),
                &FindOptions::default()
                    .fields(["orderNumber", "status"])
                    .order_by(OrderBy::asc("orderNumber"))
                    .limit(10)
                    .offset(20),
            )
            .unwrap();
        assert_eq!(
            stmt.sql,
            "SELECT `orderNumber`, `status` FROM `classicmodels`.`orders` WHERE `status` = ? ORDER BY `orderNumber` ASC LIMIT 10 OFFSET 20"
        );
        assert_eq!(stmt.args, vec![Value::from("Shipped")]);
    }

    #[test]
    fn test_offset_without_limit() {
        let opts = FindOptions::default().offset(5);
        let sqlite = StatementBuilder::new("t", Dialect::Sqlite).unwrap();
        assert_eq!(
            sqlite.select(&Template::new(), &opts).unwrap().sql,
            "SELECT * FROM \"t\" LIMIT -1 OFFSET 5"
        );
        let pg = StatementBuilder::new("t", Dialect::Postgres).unwrap();
        assert_eq!(
            pg.select(&Template::new(), &opts).unwrap().sql,
            "SELECT * FROM \"t\" OFFSET 5"
        );
    }

    #[test]
    fn test_insert() {
        let stmt = StatementBuilder::new("orders", Dialect::Postgres)
            .unwrap()
            .insert(&template([
                ("orderNumber", Value::from(1)),
                ("status", Value::from("open")),
            ]))
            .unwrap();
        assert_eq!(
            stmt.sql,
            "INSERT INTO \"orders\" (\"orderNumber\", \"status\") VALUES ($1, $2)"
        );
        assert_eq!(stmt.args, vec![Value::from(1), Value::from("open")]);
    }

    #[test]
    fn test_update_numbers_set_then_where() {
        let stmt = StatementBuilder::new("orders", Dialect::Postgres)
            .unwrap()
            .update(
                &template([("orderNumber", 1)]),
                &template([("status", "shipped")]),
            )
            .unwrap();
        assert_eq!(
            stmt.sql,
            "UPDATE \"orders\" SET \"status\" = $1 WHERE \"orderNumber\" = $2"
        );
        assert_eq!(stmt.args, vec![Value::from("shipped"), Value::from(1)]);
    }

    #[test]
    fn test_delete_everything_with_empty_template() {
        let stmt = StatementBuilder::new("orders", Dialect::MySql)
            .unwrap()
            .delete(&Template::new())
            .unwrap();
        assert_eq!(stmt.sql, "DELETE FROM `orders`");
    }

    #[test]
    fn test_rejects_empty_shapes() {
        let b = StatementBuilder::new("orders", Dialect::MySql).unwrap();
        assert!(b.insert(&Record::new()).is_err());
        assert!(b.update(&Template::new(), &Record::new()).is_err());
        assert!(StatementBuilder::new("a..b", Dialect::MySql).is_err());
    }
}
