/// Classification of a [`TableError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed key arity, disallowed construction parameter, bad input shape.
    InvalidArgument,
    /// A lookup missed. Key lookups return `Ok(None)` instead of raising this.
    NotFound,
    /// An insert or update would violate a uniqueness constraint. Nothing was written.
    DuplicateKey,
    /// The backing store could not be reached or the connection broke.
    ConnectionFailed,
    /// The store rejected or failed a well-formed statement.
    QueryFailed,
    /// The operation or refinement is not supported by this adapter.
    NotImplemented,
    /// A store call exceeded its deadline.
    Timeout,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidArgument => "InvalidArgument",
            ErrorKind::NotFound => "NotFound",
            ErrorKind::DuplicateKey => "DuplicateKey",
            ErrorKind::ConnectionFailed => "ConnectionFailed",
            ErrorKind::QueryFailed => "QueryFailed",
            ErrorKind::NotImplemented => "NotImplemented",
            ErrorKind::Timeout => "Timeout",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error raised by every [`DataTable`](crate::DataTable) operation.
#[derive(Debug)]
pub struct TableError {
    kind: ErrorKind,
    message: String,
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl TableError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Construct an error of the given kind wrapping an underlying error.
    ///
    /// Used by backend crates (e.g. `datatable-sqlx`) to keep the driver
    /// error reachable through [`std::error::Error::source`].
    pub fn with_source(
        kind: ErrorKind,
        err: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidArgument, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn duplicate_key(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::DuplicateKey, message)
    }

    pub fn connection_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ConnectionFailed, message)
    }

    pub fn query_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::QueryFailed, message)
    }

    pub fn not_implemented(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotImplemented, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Timeout, message)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is(&self, kind: ErrorKind) -> bool {
        self.kind == kind
    }
}

impl std::fmt::Display for TableError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for TableError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|err| err.as_ref() as &(dyn std::error::Error + 'static))
    }
}

impl From<std::io::Error> for TableError {
    fn from(err: std::io::Error) -> Self {
        TableError::with_source(ErrorKind::QueryFailed, err)
    }
}

impl From<serde_json::Error> for TableError {
    fn from(err: serde_json::Error) -> Self {
        TableError::with_source(ErrorKind::QueryFailed, err)
    }
}

/// Convenience alias for results of table operations.
pub type TableResult<T> = Result<T, TableError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_display_includes_kind() {
        let err = TableError::duplicate_key("orders.orderNumber = 1");
        assert_eq!(err.to_string(), "DuplicateKey: orders.orderNumber = 1");
        assert!(err.is(ErrorKind::DuplicateKey));
    }

    #[test]
    fn test_source_is_preserved() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk gone");
        let err = TableError::with_source(ErrorKind::ConnectionFailed, io);
        assert_eq!(err.kind(), ErrorKind::ConnectionFailed);
        assert_eq!(err.message(), "disk gone");
        assert!(err.source().is_some());
        assert!(TableError::timeout("slow").source().is_none());
    }
}
