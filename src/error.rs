use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::{repository::RepositoryError, response::ApiResponse, storage::StorageError};

/// AppError
///
/// Every failure a handler can produce. Each variant maps to one HTTP status and is
/// rendered as a `{ "success": false, "message": ... }` envelope, so no failure escapes
/// the handler boundary as a panic or a bare status code.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("User already exists")]
    DuplicateUser,

    // Deliberately identical for unknown email and wrong password.
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("{0}")]
    Unauthenticated(&'static str),

    #[error("Access denied. Admin only.")]
    Forbidden,

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    InvalidRequest(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Upstream service failure: {0}")]
    Upstream(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::InvalidCredentials | Self::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::DuplicateUser | Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The text sent to the client. Upstream details stay in the logs.
    pub fn public_message(&self) -> String {
        match self {
            Self::Upstream(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }

    pub fn college_not_found() -> Self {
        Self::NotFound("College not found".to_string())
    }
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => Self::college_not_found(),
            RepositoryError::Duplicate(field) => Self::Conflict(format!("Duplicate value for {field}")),
            RepositoryError::Database(e) => Self::Upstream(e.to_string()),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::Validation(err.to_string().trim_end().to_string())
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        Self::Upstream(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(status = status.as_u16(), error = %self, "request rejected");
        }

        (status, Json(ApiResponse::error(self.public_message()))).into_response()
    }
}
