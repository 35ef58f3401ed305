//! Error types for Bookshelf server

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use validator::ValidationErrors;

/// Postgres SQLSTATE for unique constraint violations
const UNIQUE_VIOLATION: &str = "23505";
/// Referenced row missing, or still referenced on delete
const FOREIGN_KEY_VIOLATION: &str = "23503";
/// `lock_timeout` expired
const LOCK_NOT_AVAILABLE: &str = "55P03";
/// `statement_timeout` expired
const QUERY_CANCELED: &str = "57014";

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Business rule violation: {0}")]
    BusinessRule(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Transaction timed out after {0} ms")]
    Timeout(u64),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// Replace a database error carrying `sqlstate` with `mapped`, pass anything else through
    fn on_sqlstate(err: sqlx::Error, sqlstate: &str, mapped: AppError) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.code().as_deref() == Some(sqlstate) => mapped,
            _ => AppError::Database(err),
        }
    }

    /// Map a unique violation to `Conflict` with the given message
    pub fn on_unique_violation(err: sqlx::Error, message: impl Into<String>) -> Self {
        Self::on_sqlstate(err, UNIQUE_VIOLATION, AppError::Conflict(message.into()))
    }

    /// Map a foreign key violation to `mapped`
    pub fn on_foreign_key_violation(err: sqlx::Error, mapped: AppError) -> Self {
        Self::on_sqlstate(err, FOREIGN_KEY_VIOLATION, mapped)
    }

    /// Turn Postgres lock/statement timeouts into `Timeout`
    pub fn classify_timeout(self, timeout_ms: u64) -> Self {
        let timed_out = match &self {
            AppError::Database(sqlx::Error::Database(db)) => {
                matches!(db.code().as_deref(), Some(LOCK_NOT_AVAILABLE | QUERY_CANCELED))
            }
            AppError::Database(sqlx::Error::PoolTimedOut) => true,
            _ => false,
        };

        if timed_out {
            AppError::Timeout(timeout_ms)
        } else {
            self
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) | AppError::BadRequest(_) | AppError::BusinessRule(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Database(_) | AppError::Timeout(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Error response body
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match self {
            AppError::NotFound(msg)
            | AppError::Validation(msg)
            | AppError::BadRequest(msg)
            | AppError::BusinessRule(msg)
            | AppError::Conflict(msg) => msg,
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                "Database error".to_string()
            }
            AppError::Timeout(ms) => {
                tracing::error!("Transaction exceeded {} ms", ms);
                "Transaction timed out".to_string()
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                "Internal server error".to_string()
            }
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        let mut messages: Vec<String> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| match (&e.message, e.code.as_ref()) {
                    (Some(msg), _) => msg.to_string(),
                    (None, "blank") => format!("{} must not be empty", field),
                    (None, _) => format!("{} is invalid", field),
                })
            })
            .collect();
        messages.sort();
        AppError::Validation(messages.join("; "))
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
