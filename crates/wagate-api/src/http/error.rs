//! Application error type mapping to HTTP status codes and the envelope
//! format.

use axum::response::{IntoResponse, Response};

use wagate_types::error::SessionError;

use super::response::ApiResponse;

/// Application-level error that maps to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    /// Session/registry errors from the operation facade.
    Session(SessionError),
    /// Request validation error.
    Validation(String),
    /// Generic internal error.
    Internal(String),
}

impl From<SessionError> for AppError {
    fn from(e: SessionError) -> Self {
        AppError::Session(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (code, message) = match &self {
            AppError::Session(SessionError::NotFound) => {
                ("INSTANCE_NOT_FOUND", "Instance not found".to_string())
            }
            AppError::Session(SessionError::AlreadyExists(id)) => {
                ("INSTANCE_EXISTS", format!("Instance '{id}' already exists"))
            }
            AppError::Session(SessionError::NotConnected) => {
                ("NOT_CONNECTED", "Session is not connected".to_string())
            }
            AppError::Session(SessionError::SendFailed(reason)) => {
                ("SEND_FAILED", format!("Message send failed: {reason}"))
            }
            AppError::Validation(msg) => ("VALIDATION_ERROR", msg.clone()),
            AppError::Internal(msg) => ("INTERNAL_ERROR", msg.clone()),
        };

        ApiResponse::error(code, &message).into_response()
    }
}
