//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::{ErrorKind, ShopError};
use thiserror::Error;

use crate::response::Envelope;

/// API-level error type that maps to HTTP responses.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or malformed caller identity.
    #[error("{0}")]
    Unauthorized(String),

    /// Malformed request that never reached the domain.
    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Shop(#[from] ShopError),
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "unauthorized"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "invalid_argument"),
            ApiError::Shop(err) => {
                let kind = err.kind();
                (status_for(kind), kind.as_str())
            }
        }
    }
}

fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::InvalidArgument => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::InsufficientStock => StatusCode::CONFLICT,
        ErrorKind::EmptyCart => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::TransactionFailed => StatusCode::SERVICE_UNAVAILABLE,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status.is_server_error() {
            tracing::error!(error = %self, code, "request failed");
        }
        metrics::counter!("api_errors_total", "code" => code).increment(1);

        let body = Envelope::failure(self.to_string(), code);
        (status, axum::Json(body)).into_response()
    }
}
