//! Unified error types for the items service.

use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Connection pool errors.
#[derive(Error, Debug)]
pub enum PoolError {
    /// No connection became available within the acquire timeout.
    #[error("connection pool exhausted after waiting {waited:?}")]
    Exhausted {
        /// How long the caller waited.
        waited: Duration,
    },

    /// Opening a new connection failed.
    #[error("failed to open database connection: {0}")]
    Connect(String),
}

/// Request-path database errors.
#[derive(Error, Debug)]
pub enum DbError {
    /// Pool-level failure.
    #[error("pool error: {0}")]
    Pool(#[from] PoolError),

    /// Statement execution failure.
    #[error("query error: {0}")]
    Query(#[from] tokio_postgres::Error),
}

/// Terminal error of the startup readiness gate.
#[derive(Error, Debug)]
pub enum StartupError {
    /// Every initialization attempt failed; the service must not serve.
    #[error("schema initialization failed after {attempts} attempts: {last_error}")]
    Fatal {
        /// Attempts made before giving up.
        attempts: u32,
        /// The last failure observed.
        last_error: String,
    },
}

/// Handler-level error mapped onto HTTP responses.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Bad or missing request fields; never retried.
    #[error("{0}")]
    Validation(String),

    /// Database failure, surfaced after the single transparent retry.
    #[error("database error: {0}")]
    Db(#[from] DbError),
}

/// Generic JSON error body. Driver details stay in the server logs.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::Db(e) => {
                error!("request failed: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
        };
        (status, Json(ErrorBody { error: message })).into_response()
    }
}

/// Convenient Result type alias.
pub type Result<T> = std::result::Result<T, ApiError>;
