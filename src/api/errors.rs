use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::auth::password::CredentialError;
use crate::domain::errors::RepositoryError;

/// API error type with HTTP status code and message
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    /// Creates a new API error
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// Creates a 400 Bad Request error
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    /// Creates a 404 Not Found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    /// Creates a 500 Internal Server Error
    pub fn internal_server_error(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.message
        }));

        (self.status, body).into_response()
    }
}

/// Maps each domain outcome to its response
///
/// Store failures are logged here and hidden from the client.
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Validation(message) => Self::bad_request(message),
            RepositoryError::UniquenessConflict(_) | RepositoryError::NoFields => {
                Self::bad_request(err.to_string())
            }
            RepositoryError::NotFound(_) => Self::not_found(err.to_string()),
            RepositoryError::Store(_) | RepositoryError::DataCorruption(_) => {
                tracing::error!(error = %err, "pharmacy store failure");
                Self::internal_server_error("Server error, please try again later")
            }
        }
    }
}

/// Malformed bodies are client errors; a missing content type keeps its 415
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        let status = match rejection.status() {
            StatusCode::UNSUPPORTED_MEDIA_TYPE => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            _ => StatusCode::BAD_REQUEST,
        };
        Self::new(status, rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::new(rejection.status(), rejection.body_text())
    }
}

impl From<CredentialError> for ApiError {
    fn from(err: CredentialError) -> Self {
        tracing::error!(error = %err, "credential hashing failed");
        Self::internal_server_error("Server error, please try again later")
    }
}
