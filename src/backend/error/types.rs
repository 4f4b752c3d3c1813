/**
 * Backend Error Types
 *
 * Errors raised while processing HTTP requests against the coordination
 * layer. Each variant carries enough context to produce a useful HTTP
 * response.
 *
 * Transport errors surface here only from the HTTP handlers; inside the
 * realtime core they degrade (reconnect, skip, log) instead of failing
 * the request.
 */

use axum::http::StatusCode;
use thiserror::Error;

use crate::backend::realtime::TransportError;
use crate::shared::SharedError;

/// Backend-specific error types
#[derive(Debug, Error)]
pub enum BackendError {
    /// Handler error (e.g. missing fields, invalid request)
    #[error("Handler error: {message}")]
    HandlerError {
        /// HTTP status code for this error
        status: StatusCode,
        /// Human-readable error message
        message: String,
    },

    /// Pub/sub transport error
    #[error(transparent)]
    TransportError(#[from] TransportError),

    /// Shared error (from shared module)
    #[error(transparent)]
    SharedError(#[from] SharedError),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl BackendError {
    /// Create a new handler error with a status code
    pub fn handler(status: StatusCode, message: impl Into<String>) -> Self {
        Self::HandlerError {
            status,
            message: message.into(),
        }
    }

    /// Create a 400 handler error
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::handler(StatusCode::BAD_REQUEST, message)
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::HandlerError { status, .. } => *status,
            Self::TransportError(err) => match err {
                TransportError::InvalidChannel { .. } => StatusCode::BAD_REQUEST,
                TransportError::SubscribeFailed { .. }
                | TransportError::PublishFailed { .. } => StatusCode::SERVICE_UNAVAILABLE,
            },
            Self::SharedError(err) => match err {
                SharedError::SerializationError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
                SharedError::ValidationError { .. } => StatusCode::BAD_REQUEST,
                SharedError::EventError { .. } => StatusCode::BAD_REQUEST,
            },
            Self::SerializationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error message
    pub fn message(&self) -> String {
        match self {
            Self::HandlerError { message, .. } => message.clone(),
            Self::TransportError(err) => err.to_string(),
            Self::SharedError(err) => err.to_string(),
            Self::SerializationError(err) => err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::realtime::{Channel, TransportError};
    use uuid::Uuid;

    #[test]
    fn test_handler_error() {
        let error = BackendError::handler(StatusCode::BAD_REQUEST, "Invalid request");
        match error {
            BackendError::HandlerError { status, message } => {
                assert_eq!(status, StatusCode::BAD_REQUEST);
                assert_eq!(message, "Invalid request");
            }
            _ => panic!("Expected HandlerError"),
        }
    }

    #[test]
    fn test_status_code_mapping() {
        let handler_error = BackendError::handler(StatusCode::UNAUTHORIZED, "Unauthorized");
        assert_eq!(handler_error.status_code(), StatusCode::UNAUTHORIZED);

        let invalid: BackendError = TransportError::invalid_channel("orders:1").into();
        assert_eq!(invalid.status_code(), StatusCode::BAD_REQUEST);

        let unavailable: BackendError =
            TransportError::subscribe(Channel::Thread(Uuid::new_v4()), "down").into();
        assert_eq!(unavailable.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_from_shared_error() {
        let shared_error = SharedError::validation("channel", "unknown kind");
        let backend_error: BackendError = shared_error.into();
        assert_eq!(backend_error.status_code(), StatusCode::BAD_REQUEST);
        assert!(backend_error.message().contains("channel"));
    }
}
