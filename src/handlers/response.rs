//! Uniform response envelope returned by every command.

use crate::errors::Error;
use serde::Serialize;

/// Result of a command as seen by a caller: payload plus an HTTP-style status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceResponse<T> {
    pub data: Option<T>,
    pub status_code: u16,
    pub success: bool,
    pub message: String,
    pub errors: Vec<String>,
}

impl<T> ServiceResponse<T> {
    /// Successful response carrying `data`.
    pub fn return_result_with(data: T, message: impl Into<String>, status_code: u16) -> Self {
        Self {
            data: Some(data),
            status_code,
            success: true,
            message: message.into(),
            errors: Vec::new(),
        }
    }

    pub fn ok(data: T) -> Self {
        Self::return_result_with(data, "OK", 200)
    }

    pub fn created(data: T) -> Self {
        Self::return_result_with(data, "Created", 201)
    }

    fn failure(status_code: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            data: None,
            status_code,
            success: false,
            errors: vec![message.clone()],
            message,
        }
    }

    pub fn return_400(message: impl Into<String>) -> Self {
        Self::failure(400, message)
    }

    pub fn return_403(message: impl Into<String>) -> Self {
        Self::failure(403, message)
    }

    pub fn return_404(message: impl Into<String>) -> Self {
        Self::failure(404, message)
    }

    pub fn return_409(message: impl Into<String>) -> Self {
        Self::failure(409, message)
    }

    pub fn return_500(message: impl Into<String>) -> Self {
        Self::failure(500, message)
    }

    /// Maps an error onto its status code. Internal errors keep their detail
    /// out of the message and only log it.
    #[must_use]
    pub fn from_error(error: &Error) -> Self {
        match error.status_code() {
            400 => Self::return_400(error.to_string()),
            403 => Self::return_403(error.to_string()),
            404 => Self::return_404(error.to_string()),
            409 => Self::return_409(error.to_string()),
            _ => Self::return_500("Internal error"),
        }
    }
}
