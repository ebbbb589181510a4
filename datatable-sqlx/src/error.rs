use datatable::{ErrorKind, TableError};

/// Extension trait for converting `sqlx::Error` into `TableError`.
///
/// Due to Rust's orphan rules, we can't implement `From<sqlx::Error> for TableError`
/// in this crate. Use `.into_table_error()` (or `map_err(SqlxErrorExt::into_table_error)`).
pub trait SqlxErrorExt {
    fn into_table_error(self) -> TableError;
}

impl SqlxErrorExt for sqlx::Error {
    fn into_table_error(self) -> TableError {
        TableError::with_source(classify(&self), self)
    }
}

fn classify(err: &sqlx::Error) -> ErrorKind {
    match err {
        sqlx::Error::Database(db) if db.is_unique_violation() => ErrorKind::DuplicateKey,
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed
        | sqlx::Error::Configuration(_) => ErrorKind::ConnectionFailed,
        sqlx::Error::PoolTimedOut => ErrorKind::Timeout,
        sqlx::Error::RowNotFound => ErrorKind::NotFound,
        _ => ErrorKind::QueryFailed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        assert_eq!(
            sqlx::Error::RowNotFound.into_table_error().kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            sqlx::Error::PoolTimedOut.into_table_error().kind(),
            ErrorKind::Timeout
        );
        assert_eq!(
            sqlx::Error::PoolClosed.into_table_error().kind(),
            ErrorKind::ConnectionFailed
        );
        assert_eq!(
            sqlx::Error::Protocol("bad packet".into()).into_table_error().kind(),
            ErrorKind::QueryFailed
        );
    }

    #[test]
    fn test_source_is_kept() {
        let err = sqlx::Error::PoolTimedOut.into_table_error();
        assert!(std::error::Error::source(&err).is_some());
    }
}
