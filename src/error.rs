use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::response::envelope;

pub type Result<T> = std::result::Result<T, ServiceError>;

/// Request-terminal failures. Nothing here is retried; each is reported
/// once through the standard response envelope.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("configuration error: {0}")]
    Config(String),

    /// Aggregated payload validation failures, never a single first error.
    #[error("invalid request payload")]
    Validation(Vec<String>),

    #[error("invalid query parameters: {0}")]
    InvalidQuery(String),

    #[error("{0}")]
    NotFound(String),

    /// Constraint violation surfaced from the database.
    #[error("integrity error: {0}")]
    Integrity(String),

    #[error("authentication required")]
    Unauthorized,

    /// Unsupported method on an API path. Deliberately mapped to 501, not
    /// 405; the contract predates this service.
    #[error("method not implemented for requested resource")]
    NotImplemented,

    #[error("database error: {0}")]
    Storage(String),

    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl ServiceError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::InvalidQuery(_) | Self::Integrity(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::NotImplemented => StatusCode::NOT_IMPLEMENTED,
            Self::Config(_) | Self::Storage(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            error!(error = %self, "request failed");
        }

        let (message, detail) = match self {
            Self::Validation(errors) => {
                return envelope(
                    StatusCode::BAD_REQUEST,
                    "Invalid request payload.",
                    json!({ "errors": errors }),
                );
            }
            Self::InvalidQuery(detail) => ("Invalid query parameters.".to_string(), detail),
            Self::NotFound(message) => {
                let detail = message.clone();
                (message, detail)
            }
            Self::Integrity(detail) => ("Integrity error.".to_string(), detail),
            Self::Unauthorized => (
                "Authentication required.".to_string(),
                "Provide a valid x-api-key header.".to_string(),
            ),
            Self::NotImplemented => {
                let message = "Method not implemented for requested resource.".to_string();
                (message.clone(), message)
            }
            Self::Config(detail) | Self::Storage(detail) => {
                ("Database error.".to_string(), detail)
            }
            Self::Internal(err) => ("Unexpected server error.".to_string(), err.to_string()),
        };

        envelope(status, &message, json!({ "detail": detail }))
    }
}

/// Classifies a driver error: constraint violations become integrity
/// failures (400), everything else is a storage failure (500).
impl From<tokio_postgres::Error> for ServiceError {
    fn from(err: tokio_postgres::Error) -> Self {
        use tokio_postgres::error::SqlState;

        let detail = err
            .as_db_error()
            .map(|db| db.message().to_string())
            .unwrap_or_else(|| err.to_string());

        const INTEGRITY: [SqlState; 4] = [
            SqlState::FOREIGN_KEY_VIOLATION,
            SqlState::UNIQUE_VIOLATION,
            SqlState::NOT_NULL_VIOLATION,
            SqlState::CHECK_VIOLATION,
        ];

        match err.code() {
            Some(code) if INTEGRITY.contains(code) => Self::Integrity(detail),
            _ => Self::Storage(detail),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(
            ServiceError::Validation(vec!["x".into()]).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServiceError::InvalidQuery("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServiceError::Integrity("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServiceError::NotFound("x".into()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ServiceError::NotImplemented.status(),
            StatusCode::NOT_IMPLEMENTED
        );
        assert_eq!(
            ServiceError::Storage("x".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
