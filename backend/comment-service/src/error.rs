/// Error types for Comment Service
///
/// This module defines all error types that can occur in the comment-service.
/// Every failure is surfaced to the caller with a descriptive message; nothing
/// is retried internally.
use thiserror::Error;

/// Result type for comment-service operations
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    /// Entity identifier does not resolve
    #[error("Not found: {0}")]
    NotFound(String),

    /// Business rule rejected the request
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Underlying persistence failure
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// Invalid or missing configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl AppError {
    /// HTTP status the transport layer should report for this error
    pub fn status_code(&self) -> u16 {
        match self {
            AppError::NotFound(_) => 404,
            AppError::ValidationError(_) => 400,
            AppError::DatabaseError(_) | AppError::Config(_) => 500,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, AppError::NotFound(_))
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, AppError::ValidationError(_))
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => AppError::NotFound("no rows returned".to_string()),
            other => AppError::DatabaseError(other.to_string()),
        }
    }
}
