//! Error types for the Mission Control server.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use database::{DatabaseError, ValidationError};
use snapshot::SnapshotError;
use thiserror::Error;

/// Errors a handler can return. Every variant renders as `{"error": msg}`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// No `DATABASE_URL` was configured.
    #[error("Entity store not configured")]
    StoreNotConfigured,

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_)
            | ApiError::Database(DatabaseError::NotFound { .. })
            | ApiError::Snapshot(SnapshotError::TaskNotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Database(DatabaseError::AlreadyExists { .. }) => StatusCode::CONFLICT,
            ApiError::StoreNotConfigured
            | ApiError::Database(_)
            | ApiError::Snapshot(_)
            | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();

        if status.is_server_error() {
            tracing::error!(error = %message, "Request failed");
        } else {
            tracing::debug!(status = status.as_u16(), error = %message, "Request rejected");
        }

        let body = serde_json::json!({
            "error": message
        });

        (status, Json(body)).into_response()
    }
}

/// Result type for handlers.
pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let missing = ApiError::from(DatabaseError::NotFound {
            entity: "Project",
            id: "katana".to_string(),
        });
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
        assert_eq!(missing.to_string(), "Project katana not found");

        let dup = ApiError::from(DatabaseError::AlreadyExists {
            entity: "Project",
            id: "katana".to_string(),
        });
        assert_eq!(dup.status(), StatusCode::CONFLICT);

        let invalid = ApiError::from(ValidationError::MissingFields(vec!["title", "assignee"]));
        assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);
        assert_eq!(invalid.to_string(), "Missing required fields: title, assignee");

        assert_eq!(
            ApiError::from(SnapshotError::TaskNotFound("task-009".to_string())).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::StoreNotConfigured.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
