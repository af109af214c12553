//! HTTP error responses.
//!
//! Every failure leaves the API as `{"error": <message>, "code": <CODE>}`.
//! Domain errors carry their own message; storage errors are classified by
//! SQLSTATE and anything unexpected is logged and replaced by a generic
//! message.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tessera_core::error::CoreError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Request shape rejected before reaching the domain.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

pub type AppResult<T> = Result<T, AppError>;

const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";
const SERIALIZATION_FAILURE: &str = "40001";
const DEADLOCK_DETECTED: &str = "40P01";

const HIDDEN_MESSAGE: &str = "An internal error occurred";

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    code: &'static str,
}

struct Reply {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl Reply {
    fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    fn hidden() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", HIDDEN_MESSAGE)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let reply = match &self {
            AppError::Core(err) => core_reply(err),
            AppError::Database(err) => database_reply(err),
            AppError::BadRequest(msg) => Reply::new(StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.as_str()),
        };
        let body = ErrorBody {
            error: reply.message,
            code: reply.code,
        };
        (reply.status, Json(body)).into_response()
    }
}

fn core_reply(err: &CoreError) -> Reply {
    match err {
        CoreError::NotFound { entity, id } => Reply::new(
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            format!("{entity} with id {id} not found"),
        ),
        CoreError::Validation(msg) => Reply::new(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.as_str()),
        CoreError::Conflict(msg) => Reply::new(StatusCode::CONFLICT, "CONFLICT", msg.as_str()),
        CoreError::Unauthorized(msg) => Reply::new(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.as_str()),
        CoreError::Forbidden(msg) => Reply::new(StatusCode::FORBIDDEN, "FORBIDDEN", msg.as_str()),
        CoreError::Integrity(msg) => {
            tracing::error!(error = %msg, "Stored data integrity fault");
            Reply::new(StatusCode::INTERNAL_SERVER_ERROR, "INTEGRITY_ERROR", msg.as_str())
        }
        CoreError::Internal(msg) => {
            tracing::error!(error = %msg, "Internal core error");
            Reply::hidden()
        }
    }
}

/// Map storage failures onto responses.
///
/// Duplicate keys on `uq_` constraints and dangling references are client
/// conflicts. Serialization failures and deadlocks mean a concurrent status
/// change won; the request is not retried server-side.
fn database_reply(err: &sqlx::Error) -> Reply {
    let db_err = match err {
        sqlx::Error::RowNotFound => {
            return Reply::new(StatusCode::NOT_FOUND, "NOT_FOUND", "Resource not found");
        }
        sqlx::Error::Database(db_err) => db_err,
        other => {
            tracing::error!(error = %other, "Database error");
            return Reply::hidden();
        }
    };

    let constraint = db_err.constraint().unwrap_or("unknown");
    match db_err.code().as_deref() {
        Some(UNIQUE_VIOLATION) if constraint.starts_with("uq_") => Reply::new(
            StatusCode::CONFLICT,
            "CONFLICT",
            format!("Duplicate value violates unique constraint: {constraint}"),
        ),
        Some(FOREIGN_KEY_VIOLATION) => Reply::new(
            StatusCode::CONFLICT,
            "CONFLICT",
            format!("Referenced row is missing or still in use: {constraint}"),
        ),
        Some(SERIALIZATION_FAILURE | DEADLOCK_DETECTED) => {
            tracing::warn!(error = %db_err, "Concurrent annotation update");
            Reply::new(
                StatusCode::CONFLICT,
                "CONCURRENT_UPDATE",
                "The annotations were modified concurrently; retry the request",
            )
        }
        _ => {
            tracing::error!(error = %db_err, "Database error");
            Reply::hidden()
        }
    }
}
