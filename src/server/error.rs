//! HTTP error responses
//!
//! Handlers return `Result<_, ApiError>`. Every error renders as the
//! standard failure envelope with a status code derived from its kind.
//! Storage and other internal failures are logged in full but only a
//! generic message reaches the caller.

use crate::error::SubmitError;
use crate::protocol::{Envelope, Failure};

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

/// Error returned by a handler
#[derive(Debug, Clone, PartialEq)]
pub struct ApiError {
    status: StatusCode,
    failure: Failure,
}

impl ApiError {
    /// Build an error with an explicit status and kind
    pub fn new(status: StatusCode, kind: &str, message: impl Into<String>) -> Self {
        Self {
            status,
            failure: Failure::new(kind, message),
        }
    }

    /// 401 with the given message
    pub fn unauthorized(message: &str) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "unauthenticated", message)
    }

    /// 400 for a malformed request
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "invalid_request", message)
    }

    /// 404 for a chat that does not exist or is not the caller's
    pub fn chat_not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, "chat_not_found", "Chat not found")
    }

    /// 500 hiding the underlying cause
    pub fn internal(err: anyhow::Error) -> Self {
        tracing::error!(error = ?err, "Internal server error");
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal_error",
            "Internal server error",
        )
    }

    /// HTTP status of this error
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Failure payload of this error
    pub fn failure(&self) -> &Failure {
        &self.failure
    }
}

/// Status code for a pipeline failure
pub fn status_for(err: &SubmitError) -> StatusCode {
    match err {
        SubmitError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        SubmitError::Unauthenticated => StatusCode::UNAUTHORIZED,
        SubmitError::ChatNotFound => StatusCode::NOT_FOUND,
        SubmitError::InsufficientCredits { .. } => StatusCode::PAYMENT_REQUIRED,
        SubmitError::Persistence { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        SubmitError::GenerationFailed { .. } => StatusCode::BAD_GATEWAY,
        SubmitError::ProviderTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
    }
}

impl From<SubmitError> for ApiError {
    fn from(err: SubmitError) -> Self {
        Self {
            status: status_for(&err),
            failure: Failure::from(&err),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::internal(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(Envelope::failed(self.failure))).into_response()
    }
}
