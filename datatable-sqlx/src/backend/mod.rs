//! Per-driver glue: connect options, parameter binding, row decoding and
//! schema introspection.
//!
//! [`Backend`] is implemented directly on the sqlx database markers
//! (`sqlx::Sqlite`, `sqlx::MySql`), so `SqlTable<Sqlite>` reads the same way
//! as `Pool<Sqlite>`.

#[cfg(feature = "mysql")]
mod mysql;
#[cfg(feature = "sqlite")]
mod sqlite;

use chrono::{NaiveDate, NaiveDateTime};
use datatable::{ConnectInfo, Dialect, Record, TableError, Value};
use futures_util::future::BoxFuture;
use sqlx::query::Query;
use sqlx::{Database, Encode, Type};

use crate::schema::TableSchema;

/// Connection options type of a backend's connection.
pub type ConnectOptionsOf<DB> = <<DB as Database>::Connection as sqlx::Connection>::Options;

/// A sqlx database that [`SqlTable`](crate::SqlTable) can run against.
///
/// Every method takes the connection of an open transaction; the connection
/// manager owns begin/commit/rollback.
pub trait Backend: Database {
    /// Quoting and placeholder style for generated statements.
    const DIALECT: Dialect;

    /// Whether entity names are addressed as `database.table` on this store.
    const QUALIFY_WITH_DATABASE: bool;

    fn connect_options(info: &ConnectInfo) -> Result<ConnectOptionsOf<Self>, TableError>;

    /// Run a row-returning statement and decode every row.
    fn fetch_all<'c>(
        conn: &'c mut Self::Connection,
        sql: &'c str,
        args: &'c [Value],
    ) -> BoxFuture<'c, Result<Vec<Record>, TableError>>;

    /// Run a statement and return the number of affected rows.
    fn execute<'c>(
        conn: &'c mut Self::Connection,
        sql: &'c str,
        args: &'c [Value],
    ) -> BoxFuture<'c, Result<u64, TableError>>;

    /// Read the columns and primary key of `entity` (`table` or `schema.table`).
    fn introspect<'c>(
        conn: &'c mut Self::Connection,
        entity: &'c str,
    ) -> BoxFuture<'c, Result<TableSchema, TableError>>;
}

/// Bind every value in order. `Null` is bound as a typed SQL NULL.
pub(crate) fn bind_values<'q, DB>(
    mut query: Query<'q, DB, <DB as Database>::Arguments<'q>>,
    args: &[Value],
) -> Query<'q, DB, <DB as Database>::Arguments<'q>>
where
    DB: Database,
    bool: Encode<'q, DB> + Type<DB>,
    i64: Encode<'q, DB> + Type<DB>,
    f64: Encode<'q, DB> + Type<DB>,
    String: Encode<'q, DB> + Type<DB>,
    Option<String>: Encode<'q, DB> + Type<DB>,
    NaiveDate: Encode<'q, DB> + Type<DB>,
    NaiveDateTime: Encode<'q, DB> + Type<DB>,
{
    for value in args {
        query = match value {
            Value::Null => query.bind(None::<String>),
            Value::Bool(b) => query.bind(*b),
            Value::Int(n) => query.bind(*n),
            Value::Float(f) => query.bind(*f),
            Value::Text(s) => query.bind(s.clone()),
            Value::Date(d) => query.bind(*d),
            Value::DateTime(dt) => query.bind(*dt),
        };
    }
    query
}

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// Interpret text stored in a `DATE`/`DATETIME`/`TIMESTAMP` column; anything
/// that does not parse stays text.
pub(crate) fn temporal_or_text(text: String, declared: &str) -> Value {
    match declared {
        "DATE" => NaiveDate::parse_from_str(&text, "%Y-%m-%d")
            .map(Value::Date)
            .unwrap_or(Value::Text(text)),
        "DATETIME" | "TIMESTAMP" => DATETIME_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(&text, fmt).ok())
            .map(Value::DateTime)
            .unwrap_or(Value::Text(text)),
        _ => Value::Text(text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temporal_or_text() {
        assert_eq!(
            temporal_or_text("2003-01-06".into(), "DATE"),
            Value::Date(NaiveDate::from_ymd_opt(2003, 1, 6).unwrap())
        );
        assert_eq!(
            temporal_or_text("2003-01-06 10:30:00".into(), "DATETIME"),
            Value::DateTime(
                NaiveDate::from_ymd_opt(2003, 1, 6)
                    .unwrap()
                    .and_hms_opt(10, 30, 0)
                    .unwrap()
            )
        );
        assert_eq!(
            temporal_or_text("soon".into(), "DATE"),
            Value::Text("soon".into())
        );
        assert_eq!(
            temporal_or_text("2003-01-06".into(), "TEXT"),
            Value::Text("2003-01-06".into())
        );
    }
}
