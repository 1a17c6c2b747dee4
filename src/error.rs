use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Main error type for the application.
#[derive(Error, Debug)]
pub enum AppError {
    /// Signup passwords did not match.
    #[error("Passwords did not match")]
    PasswordMismatch,

    /// Username is already registered.
    #[error("Username '{0}' has already been taken")]
    UsernameTaken(String),

    /// Login failed. Unknown user and wrong password both map here.
    #[error("Username and password did not match")]
    InvalidCredentials,

    /// Invalid field data.
    #[error("Invalid data: {0}")]
    Validation(String),

    /// Resource missing, or not owned by the requesting user.
    #[error("Book not found: {0}")]
    NotFound(String),

    /// I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AppError::PasswordMismatch | AppError::UsernameTaken(_) | AppError::Validation(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        tracing::error!(error = %self, "Request error");

        (status, self.to_string()).into_response()
    }
}

/// Result type alias for the application.
pub type Result<T> = std::result::Result<T, AppError>;
