//! Status-carrying errors.
//!
//! Every failure the connection layer can produce is a [`StatusError`]: an
//! HTTP status the caller can answer with, a short message and, when it
//! helps diagnosis, the raw input that caused it.

use crate::http::response::StatusCode;
use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T, E = StatusError> = std::result::Result<T, E>;

/// An error that maps directly onto a protocol status code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{status}: {message}")]
pub struct StatusError {
    status: StatusCode,
    message: String,
    context: Option<String>,
}

impl StatusError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            context: None,
        }
    }

    /// Malformed request line, header or cookie, or a failed read.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BadRequest, message)
    }

    /// A blocking receive or send ran past one of its deadlines.
    pub fn request_timeout(message: impl Into<String>) -> Self {
        Self::new(StatusCode::RequestTimeout, message)
    }

    /// The header section (or a declared body) exceeds its ceiling.
    pub fn entity_too_large(message: impl Into<String>) -> Self {
        Self::new(StatusCode::PayloadTooLarge, message)
    }

    /// Poll failures and other fatal transport conditions.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::InternalServerError, message)
    }

    /// Attaches the offending input.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> u16 {
        self.status.as_u16()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }
}
