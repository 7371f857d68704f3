//! API error types.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use podium_metadata::{MetadataError, ReconcileError};
use serde::Serialize;

/// API error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("metadata error: {0}")]
    Metadata(#[from] MetadataError),

    #[error("core error: {0}")]
    Core(#[from] podium_core::Error),
}

impl ApiError {
    /// Get the error code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::BadRequest(_) => "bad_request",
            Self::Unauthorized(_) => "unauthorized",
            Self::Forbidden(_) => "forbidden",
            Self::Conflict(_) => "conflict",
            Self::Internal(_) => "internal_error",
            Self::Metadata(e) => match e {
                MetadataError::NotFound(_) => "not_found",
                MetadataError::AlreadyExists(_) | MetadataError::Constraint(_) => "conflict",
                MetadataError::Reconcile(ReconcileError::UnresolvedReference { .. }) => {
                    "unresolved_reference"
                }
                MetadataError::Reconcile(ReconcileError::DuplicateIdentifier { .. }) => {
                    "duplicate_identifier"
                }
                _ => "internal_error",
            },
            Self::Core(_) => "core_error",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Metadata(e) => match e {
                MetadataError::NotFound(_) => StatusCode::NOT_FOUND,
                MetadataError::AlreadyExists(_) => StatusCode::CONFLICT,
                MetadataError::Constraint(_) => StatusCode::CONFLICT,
                MetadataError::Reconcile(ReconcileError::UnresolvedReference { .. }) => {
                    StatusCode::UNPROCESSABLE_ENTITY
                }
                MetadataError::Reconcile(ReconcileError::DuplicateIdentifier { .. }) => {
                    StatusCode::BAD_REQUEST
                }
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Core(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        // Server-side failures (including a vanished update target) are logged
        // in full and reported generically.
        let message = if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
            "internal server error".to_string()
        } else {
            self.to_string()
        };
        let body = ErrorResponse {
            code: self.code().to_string(),
            message,
        };
        (status, Json(body)).into_response()
    }
}

/// Result type for API handlers.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use podium_core::ResourceKind;

    #[test]
    fn reconcile_errors_map_to_statuses() {
        let unresolved = ApiError::from(MetadataError::from(ReconcileError::UnresolvedReference {
            kind: ResourceKind::Labels,
            related: ResourceKind::Taxonomies,
            client_id: "t9".to_string(),
        }));
        assert_eq!(unresolved.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(unresolved.code(), "unresolved_reference");

        let duplicate = ApiError::from(MetadataError::from(ReconcileError::DuplicateIdentifier {
            kind: ResourceKind::Sessions,
            client_id: "s1".to_string(),
        }));
        assert_eq!(duplicate.status_code(), StatusCode::BAD_REQUEST);

        let missing = ApiError::from(MetadataError::from(ReconcileError::MissingTarget {
            table: "sessions",
            id: 3,
        }));
        assert_eq!(missing.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(missing.code(), "internal_error");

        let constraint = ApiError::from(MetadataError::Constraint("fk".to_string()));
        assert_eq!(constraint.status_code(), StatusCode::CONFLICT);
    }
}
