//! Unified error handling for timesync-core
//!
//! Payloads are plain strings so errors can be cloned into operation state,
//! transaction results and alerts.

use serde::Serialize;
use thiserror::Error;

/// Core error type for timesync-core
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("{0}")]
    Item(String),

    #[error("{0}")]
    Precondition(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("JSON error: {0}")]
    Json(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias for timesync-core
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification used to decide how a failure is surfaced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Retrieving entries, projects or tasks failed
    Fetch,
    /// A single create/delete inside a transaction failed
    Item,
    /// An action was rejected before it had any effect
    Precondition,
    Other,
}

impl Error {
    /// Create a network error
    pub fn network(msg: impl Into<String>) -> Self {
        Error::Network(msg.into())
    }

    /// Create an authentication error
    pub fn auth(msg: impl Into<String>) -> Self {
        Error::Auth(msg.into())
    }

    /// Create a per-item error
    pub fn item(msg: impl Into<String>) -> Self {
        Error::Item(msg.into())
    }

    /// Create a precondition error
    pub fn precondition(msg: impl Into<String>) -> Self {
        Error::Precondition(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Error::Validation(msg.into())
    }

    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Error::NotFound(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Network(_) | Error::Auth(_) => ErrorCategory::Fetch,
            Error::Item(_) => ErrorCategory::Item,
            Error::Precondition(_) => ErrorCategory::Precondition,
            _ => ErrorCategory::Other,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            Error::NotFound(err.to_string())
        } else {
            Error::Io(err.to_string())
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json(err.to_string())
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        Error::Storage(err.to_string())
    }
}

// Errors travel inside serialized snapshots as their display text
impl Serialize for Error {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}
