//! Error handling for the portal client

use std::fmt;
use thiserror::Error;

use crate::validation::FieldErrors;

/// Result type alias for portal client operations
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification of an [`Error`]
///
/// Callers that only need to decide how to react (block a form, show a
/// notice, send the user back to the login page) should match on this
/// rather than on the individual variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// HTTP 401, the session has been destroyed
    Unauthorized,
    /// HTTP 403, the session is intact but the action was denied
    Forbidden,
    /// HTTP 5xx
    ServerError,
    /// Backend-reported or client-side validation failure
    Validation,
    /// Timeout, connection failure, or no response at all
    Transport,
    /// A response body that could not be decoded
    Decode,
    /// Everything else (configuration, storage, URL building)
    Other,
}

/// Unified error type for the portal client
#[derive(Error, Debug)]
pub enum Error {
    /// The backend rejected the credentials (HTTP 401)
    #[error("{0}")]
    Unauthorized(String),

    /// The backend refused the action (HTTP 403)
    #[error("{0}")]
    Forbidden(String),

    /// The backend failed (HTTP 5xx)
    #[error("{message}")]
    Server { status: u16, message: String },

    /// The backend rejected the request content (other HTTP 4xx)
    #[error("{message}")]
    Validation { status: u16, message: String },

    /// Client-side form validation failed before anything was sent
    #[error("{0}")]
    InvalidInput(FieldErrors),

    /// The request did not complete within the configured timeout
    #[error("Request timed out: {0}")]
    Timeout(#[source] reqwest::Error),

    /// Network or HTTP transport errors
    #[error("Network error: {0}")]
    Transport(#[source] reqwest::Error),

    /// JSON serialization or deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing errors
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// Credential storage errors
    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    /// Invalid client configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// General errors
    #[error("{0}")]
    General(String),
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Error::Timeout(err)
        } else if err.is_decode() {
            Error::General(format!("Failed to decode response: {}", err))
        } else {
            Error::Transport(err)
        }
    }
}

impl From<FieldErrors> for Error {
    fn from(errors: FieldErrors) -> Self {
        Error::InvalidInput(errors)
    }
}

impl Error {
    /// Create a new unauthorized error
    pub fn unauthorized<T: fmt::Display>(msg: T) -> Self {
        Error::Unauthorized(msg.to_string())
    }

    /// Create a new forbidden error
    pub fn forbidden<T: fmt::Display>(msg: T) -> Self {
        Error::Forbidden(msg.to_string())
    }

    /// Create a new configuration error
    pub fn config<T: fmt::Display>(msg: T) -> Self {
        Error::Config(msg.to_string())
    }

    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Unauthorized(_) => ErrorKind::Unauthorized,
            Error::Forbidden(_) => ErrorKind::Forbidden,
            Error::Server { .. } => ErrorKind::ServerError,
            Error::Validation { .. } | Error::InvalidInput(_) => ErrorKind::Validation,
            Error::Timeout(_) | Error::Transport(_) => ErrorKind::Transport,
            Error::Json(_) => ErrorKind::Decode,
            Error::Url(_) | Error::Storage(_) | Error::Config(_) | Error::General(_) => {
                ErrorKind::Other
            }
        }
    }

    /// HTTP status of the failed response, if there was one
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Unauthorized(_) => Some(401),
            Error::Forbidden(_) => Some(403),
            Error::Server { status, .. } | Error::Validation { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the request gave up waiting for the backend
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout(_))
    }
}
