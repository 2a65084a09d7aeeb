//! Error types for Lyceum
//!
//! Every public operation returns [`Result<T>`]; nothing is thrown across
//! the boundary. Errors carry enough structure for the envelope layer to
//! pick an HTTP-like status and a stable kind code.
//!
//! | Kind | Variants | Status |
//! |------|----------|--------|
//! | Validation | `Validation`, `LimitExceeded` | 400 |
//! | Not Found | `NotFound` | 404 |
//! | Conflict | `Conflict` | 409 |
//! | Upstream | `Upstream` | 502 |
//! | Subscriber | `Subscriber` | 500 |
//! | System | `Store`, `Serialization`, `Config` | 503 / 500 |

use crate::json::{LimitError, PathError, PathParseError};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Result type alias for Lyceum operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for Lyceum
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
pub enum Error {
    /// Malformed input (patch request, notification, document), rejected
    /// before any mutation
    #[error("validation failed: {reason}")]
    Validation {
        /// Human-readable reason
        reason: String,
    },

    /// Target document does not exist
    #[error("{collection} document not found: {id}")]
    NotFound {
        /// Collection (or service) name
        collection: String,
        /// Missing document id
        id: String,
    },

    /// Unique constraint violation
    #[error("conflict: {reason}")]
    Conflict {
        /// Human-readable reason
        reason: String,
    },

    /// An owning service failed while resolving references
    #[error("upstream service '{service}' failed: {reason}")]
    Upstream {
        /// Owning service identity
        service: String,
        /// Failure reported by the owner
        reason: String,
    },

    /// A notification subscriber failed; logged, never surfaced by the broker
    #[error("subscriber '{subscriber}' failed: {reason}")]
    Subscriber {
        /// Subscriber name
        subscriber: String,
        /// Failure detail
        reason: String,
    },

    /// Document store unavailable or failing
    #[error("store error: {reason}")]
    Store {
        /// Failure detail
        reason: String,
    },

    /// Encoding or decoding failed
    #[error("serialization error: {reason}")]
    Serialization {
        /// Failure detail
        reason: String,
    },

    /// Configuration file unreadable or invalid
    #[error("config error: {reason}")]
    Config {
        /// Failure detail
        reason: String,
    },

    /// Document exceeds a size limit
    #[error("limit exceeded: {0}")]
    LimitExceeded(LimitError),
}

/// Coarse error classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Rejected input
    Validation,
    /// Missing target
    NotFound,
    /// Unique constraint violation
    Conflict,
    /// Owning service failure
    Upstream,
    /// Isolated subscriber failure
    Subscriber,
    /// Store failure
    Store,
    /// Encoding failure
    Serialization,
    /// Configuration failure
    Config,
}

impl ErrorKind {
    /// Stable code used in the envelope's `error.error` field
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Upstream => "upstream",
            ErrorKind::Subscriber => "subscriber",
            ErrorKind::Store => "store",
            ErrorKind::Serialization => "serialization",
            ErrorKind::Config => "config",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Error {
    /// Build a validation error
    pub fn validation(reason: impl Into<String>) -> Self {
        Error::Validation {
            reason: reason.into(),
        }
    }

    /// Build a not-found error
    pub fn not_found(collection: impl Into<String>, id: impl Into<String>) -> Self {
        Error::NotFound {
            collection: collection.into(),
            id: id.into(),
        }
    }

    /// Build a conflict error
    pub fn conflict(reason: impl Into<String>) -> Self {
        Error::Conflict {
            reason: reason.into(),
        }
    }

    /// Build an upstream error
    pub fn upstream(service: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Upstream {
            service: service.into(),
            reason: reason.into(),
        }
    }

    /// Build a store error
    pub fn store(reason: impl Into<String>) -> Self {
        Error::Store {
            reason: reason.into(),
        }
    }

    /// Build a serialization error
    pub fn serialization(reason: impl Into<String>) -> Self {
        Error::Serialization {
            reason: reason.into(),
        }
    }

    /// Build a config error
    pub fn config(reason: impl Into<String>) -> Self {
        Error::Config {
            reason: reason.into(),
        }
    }

    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Validation { .. } | Error::LimitExceeded(_) => ErrorKind::Validation,
            Error::NotFound { .. } => ErrorKind::NotFound,
            Error::Conflict { .. } => ErrorKind::Conflict,
            Error::Upstream { .. } => ErrorKind::Upstream,
            Error::Subscriber { .. } => ErrorKind::Subscriber,
            Error::Store { .. } => ErrorKind::Store,
            Error::Serialization { .. } => ErrorKind::Serialization,
            Error::Config { .. } => ErrorKind::Config,
        }
    }

    /// HTTP-like status code for the envelope
    pub fn status(&self) -> u16 {
        match self.kind() {
            ErrorKind::Validation => 400,
            ErrorKind::NotFound => 404,
            ErrorKind::Conflict => 409,
            ErrorKind::Upstream => 502,
            ErrorKind::Store => 503,
            ErrorKind::Subscriber | ErrorKind::Serialization | ErrorKind::Config => 500,
        }
    }
}

impl From<LimitError> for Error {
    fn from(e: LimitError) -> Self {
        Error::LimitExceeded(e)
    }
}

impl From<PathParseError> for Error {
    fn from(e: PathParseError) -> Self {
        Error::validation(format!("invalid field path: {}", e))
    }
}

impl From<PathError> for Error {
    fn from(e: PathError) -> Self {
        Error::validation(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::serialization(e.to_string())
    }
}
