use std::str::FromStr;

use datatable::{ConnectInfo, Dialect, ErrorKind, Record, TableError, Value};
use futures_util::future::BoxFuture;
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqliteRow};
use sqlx::{Column, Row, Sqlite, TypeInfo, ValueRef};

use super::{bind_values, temporal_or_text, Backend};
use crate::error::SqlxErrorExt;
use crate::schema::{split_qualified, TableSchema};

impl Backend for Sqlite {
    const DIALECT: Dialect = Dialect::Sqlite;
    const QUALIFY_WITH_DATABASE: bool = false;

    /// `url` wins (`sqlite::memory:`, `sqlite://path.db`); otherwise `db` is a
    /// file path, created on first connect.
    fn connect_options(info: &ConnectInfo) -> Result<SqliteConnectOptions, TableError> {
        match &info.url {
            Some(url) => SqliteConnectOptions::from_str(url)
                .map_err(|e| TableError::with_source(ErrorKind::ConnectionFailed, e)),
            None => Ok(SqliteConnectOptions::new()
                .filename(&info.db)
                .create_if_missing(true)),
        }
    }

    fn fetch_all<'c>(
        conn: &'c mut SqliteConnection,
        sql: &'c str,
        args: &'c [Value],
    ) -> BoxFuture<'c, Result<Vec<Record>, TableError>> {
        Box::pin(async move {
            let rows = bind_values(sqlx::query::<Sqlite>(sql), args)
                .fetch_all(&mut *conn)
                .await
                .map_err(SqlxErrorExt::into_table_error)?;
            rows.iter()
                .map(|row| decode_row(row).map_err(SqlxErrorExt::into_table_error))
                .collect::<Result<Vec<_>, _>>()
        })
    }

    fn execute<'c>(
        conn: &'c mut SqliteConnection,
        sql: &'c str,
        args: &'c [Value],
    ) -> BoxFuture<'c, Result<u64, TableError>> {
        Box::pin(async move {
            let done = bind_values(sqlx::query::<Sqlite>(sql), args)
                .execute(&mut *conn)
                .await
                .map_err(SqlxErrorExt::into_table_error)?;
            Ok(done.rows_affected())
        })
    }

    fn introspect<'c>(
        conn: &'c mut SqliteConnection,
        entity: &'c str,
    ) -> BoxFuture<'c, Result<TableSchema, TableError>> {
        Box::pin(async move {
            let (schema, table) = split_qualified(entity);
            let rows = sqlx::query_as::<Sqlite, (String, i64)>(
                "SELECT name, pk FROM pragma_table_info(?1, ?2) ORDER BY cid",
            )
            .bind(table)
            .bind(schema.unwrap_or("main"))
            .fetch_all(&mut *conn)
            .await
            .map_err(SqlxErrorExt::into_table_error)?;

            let mut keyed: Vec<(i64, String)> = rows
                .iter()
                .filter(|(_, pk)| *pk > 0)
                .map(|(name, pk)| (*pk, name.clone()))
                .collect();
            keyed.sort();
            Ok(TableSchema::new(
                rows.into_iter().map(|(name, _)| name).collect(),
                keyed.into_iter().map(|(_, name)| name).collect(),
            ))
        })
    }
}

fn decode_row(row: &SqliteRow) -> Result<Record, sqlx::Error> {
    let mut record = Record::new();
    for (i, column) in row.columns().iter().enumerate() {
        let raw = row.try_get_raw(i)?;
        let value = if raw.is_null() {
            Value::Null
        } else {
            let storage = raw.type_info().name().to_string();
            decode_value(row, i, &storage, &column.type_info().name().to_ascii_uppercase())?
        };
        record.insert(column.name().to_string(), value);
    }
    Ok(record)
}

/// `storage` is the value's runtime storage class; `declared` is the column's
/// declared type, which refines integers into booleans and text into dates.
fn decode_value(
    row: &SqliteRow,
    i: usize,
    storage: &str,
    declared: &str,
) -> Result<Value, sqlx::Error> {
    Ok(match storage {
        "INTEGER" => {
            let n: i64 = row.try_get_unchecked(i)?;
            if declared == "BOOLEAN" {
                Value::Bool(n != 0)
            } else {
                Value::Int(n)
            }
        }
        "REAL" => Value::Float(row.try_get_unchecked(i)?),
        "BLOB" => {
            let bytes: Vec<u8> = row.try_get_unchecked(i)?;
            Value::Text(String::from_utf8_lossy(&bytes).into_owned())
        }
        _ => temporal_or_text(row.try_get_unchecked(i)?, declared),
    })
}
