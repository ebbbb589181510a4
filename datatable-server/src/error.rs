use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use datatable::{ErrorKind, TableError};

/// A [`TableError`] on its way out as an HTTP response.
///
/// The body is `{ "error": "<kind>", "message": "<message>" }`.
#[derive(Debug)]
pub struct ApiError(pub TableError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self.0.kind() {
            ErrorKind::InvalidArgument => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::DuplicateKey => StatusCode::CONFLICT,
            ErrorKind::ConnectionFailed => StatusCode::SERVICE_UNAVAILABLE,
            ErrorKind::QueryFailed => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorKind::NotImplemented => StatusCode::NOT_IMPLEMENTED,
            ErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
        }
    }
}

impl From<TableError> for ApiError {
    fn from(err: TableError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(kind = %self.0.kind(), error = %self.0, "request failed");
        } else {
            tracing::debug!(kind = %self.0.kind(), error = %self.0, "request rejected");
        }
        let body = serde_json::json!({
            "error": self.0.kind().as_str(),
            "message": self.0.message(),
        });
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (TableError::invalid_argument("x"), StatusCode::BAD_REQUEST),
            (TableError::not_found("x"), StatusCode::NOT_FOUND),
            (TableError::duplicate_key("x"), StatusCode::CONFLICT),
            (TableError::connection_failed("x"), StatusCode::SERVICE_UNAVAILABLE),
            (TableError::query_failed("x"), StatusCode::INTERNAL_SERVER_ERROR),
            (TableError::not_implemented("x"), StatusCode::NOT_IMPLEMENTED),
            (TableError::timeout("x"), StatusCode::GATEWAY_TIMEOUT),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError(err).status(), status);
        }
    }
}
