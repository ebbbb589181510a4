use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use datatable::{ConnectInfo, Dialect, ErrorKind, Record, TableError, Value};
use futures_util::future::BoxFuture;
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection, MySqlRow};
use sqlx::{Column, MySql, Row, TypeInfo, ValueRef};

use super::{bind_values, Backend};
use crate::error::SqlxErrorExt;
use crate::schema::{split_qualified, TableSchema};

const COLUMNS_SQL: &str = "SELECT CAST(COLUMN_NAME AS CHAR) FROM information_schema.COLUMNS \
     WHERE TABLE_SCHEMA = COALESCE(?, DATABASE()) AND TABLE_NAME = ? \
     ORDER BY ORDINAL_POSITION";

const PRIMARY_KEY_SQL: &str = "SELECT CAST(COLUMN_NAME AS CHAR) FROM information_schema.KEY_COLUMN_USAGE \
     WHERE TABLE_SCHEMA = COALESCE(?, DATABASE()) AND TABLE_NAME = ? \
     AND CONSTRAINT_NAME = 'PRIMARY' ORDER BY ORDINAL_POSITION";

impl Backend for MySql {
    const DIALECT: Dialect = Dialect::MySql;
    const QUALIFY_WITH_DATABASE: bool = true;

    fn connect_options(info: &ConnectInfo) -> Result<MySqlConnectOptions, TableError> {
        match &info.url {
            Some(url) => MySqlConnectOptions::from_str(url)
                .map_err(|e| TableError::with_source(ErrorKind::ConnectionFailed, e)),
            None => Ok(MySqlConnectOptions::new()
                .host(&info.host)
                .port(info.port)
                .username(&info.user)
                .password(&info.password)
                .database(&info.db)
                .charset("utf8mb4")),
        }
    }

    fn fetch_all<'c>(
        conn: &'c mut MySqlConnection,
        sql: &'c str,
        args: &'c [Value],
    ) -> BoxFuture<'c, Result<Vec<Record>, TableError>> {
        Box::pin(async move {
            let rows = bind_values(sqlx::query::<MySql>(sql), args)
                .fetch_all(&mut *conn)
                .await
                .map_err(SqlxErrorExt::into_table_error)?;
            rows.iter()
                .map(|row| decode_row(row).map_err(SqlxErrorExt::into_table_error))
                .collect::<Result<Vec<_>, _>>()
        })
    }

    fn execute<'c>(
        conn: &'c mut MySqlConnection,
        sql: &'c str,
        args: &'c [Value],
    ) -> BoxFuture<'c, Result<u64, TableError>> {
        Box::pin(async move {
            let done = bind_values(sqlx::query::<MySql>(sql), args)
                .execute(&mut *conn)
                .await
                .map_err(SqlxErrorExt::into_table_error)?;
            Ok(done.rows_affected())
        })
    }

    /// `entity` may be `database.table`; otherwise the connection's current
    /// database is searched.
    fn introspect<'c>(
        conn: &'c mut MySqlConnection,
        entity: &'c str,
    ) -> BoxFuture<'c, Result<TableSchema, TableError>> {
        Box::pin(async move {
            let (schema, table) = split_qualified(entity);
            let columns = sqlx::query_scalar::<MySql, String>(COLUMNS_SQL)
                .bind(schema)
                .bind(table)
                .fetch_all(&mut *conn)
                .await
                .map_err(SqlxErrorExt::into_table_error)?;
            let key_columns = sqlx::query_scalar::<MySql, String>(PRIMARY_KEY_SQL)
                .bind(schema)
                .bind(table)
                .fetch_all(&mut *conn)
                .await
                .map_err(SqlxErrorExt::into_table_error)?;
            Ok(TableSchema::new(columns, key_columns))
        })
    }
}

fn decode_row(row: &MySqlRow) -> Result<Record, sqlx::Error> {
    let mut record = Record::new();
    for (i, column) in row.columns().iter().enumerate() {
        let value = if row.try_get_raw(i)?.is_null() {
            Value::Null
        } else {
            decode_value(row, i, &column.type_info().name().to_ascii_uppercase())?
        };
        record.insert(column.name().to_string(), value);
    }
    Ok(record)
}

/// Map a non-null MySQL value onto [`Value`] by its column type name.
fn decode_value(row: &MySqlRow, i: usize, type_name: &str) -> Result<Value, sqlx::Error> {
    Ok(match type_name {
        "BOOLEAN" => Value::Bool(row.try_get_unchecked(i)?),
        t if t.ends_with("UNSIGNED") => {
            let n: u64 = row.try_get_unchecked(i)?;
            i64::try_from(n)
                .map(Value::Int)
                .unwrap_or_else(|_| Value::Text(n.to_string()))
        }
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" | "YEAR" => {
            Value::Int(row.try_get_unchecked(i)?)
        }
        "FLOAT" | "DOUBLE" => Value::Float(row.try_get_unchecked(i)?),
        "DECIMAL" => {
            let text: String = row.try_get_unchecked(i)?;
            text.parse::<f64>()
                .map(Value::Float)
                .unwrap_or(Value::Text(text))
        }
        "DATE" => Value::Date(row.try_get_unchecked::<NaiveDate, _>(i)?),
        "DATETIME" | "TIMESTAMP" => Value::DateTime(row.try_get_unchecked::<NaiveDateTime, _>(i)?),
        "TIME" => match row.try_get_unchecked::<NaiveTime, _>(i) {
            Ok(time) => Value::Text(time.to_string()),
            Err(_) => lossy_text(row, i)?,
        },
        "TINYBLOB" | "BLOB" | "MEDIUMBLOB" | "LONGBLOB" | "BINARY" | "VARBINARY" | "BIT"
        | "GEOMETRY" => lossy_text(row, i)?,
        _ => match row.try_get_unchecked::<String, _>(i) {
            Ok(text) => Value::Text(text),
            Err(_) => lossy_text(row, i)?,
        },
    })
}

fn lossy_text(row: &MySqlRow, i: usize) -> Result<Value, sqlx::Error> {
    let bytes: Vec<u8> = row.try_get_unchecked(i)?;
    Ok(Value::Text(String::from_utf8_lossy(&bytes).into_owned()))
}
