//! Result envelope rendered at the controller boundary
//!
//! ```json
//! { "status": 200, "value": { ... } }
//! { "status": 404, "error": { "message": "classes document not found: c9", "error": "not_found" } }
//! ```
//!
//! `error.message` is shown to users verbatim; `error.error` holds the
//! stable kind code and diagnostic detail.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Status for successful reads and updates
pub const STATUS_OK: u16 = 200;

/// Status for successful creation
pub const STATUS_CREATED: u16 = 201;

/// Failure body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// User-visible message
    pub message: String,
    /// Kind code plus diagnostic detail
    pub error: String,
}

impl From<&Error> for ErrorBody {
    fn from(err: &Error) -> Self {
        ErrorBody {
            message: err.to_string(),
            error: format!("{}: {:?}", err.kind(), err),
        }
    }
}

/// Uniform operation result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Envelope<T> {
    /// Success
    Success {
        /// Status code
        status: u16,
        /// Result value
        value: T,
    },
    /// Failure
    Failure {
        /// Status code
        status: u16,
        /// Failure body
        error: ErrorBody,
    },
}

impl<T> Envelope<T> {
    /// Success with status 200
    pub fn ok(value: T) -> Self {
        Envelope::Success {
            status: STATUS_OK,
            value,
        }
    }

    /// Failure derived from an error
    pub fn failure(err: &Error) -> Self {
        Envelope::Failure {
            status: err.status(),
            error: ErrorBody::from(err),
        }
    }

    /// Convert a result, using `status` on success
    pub fn from_result(result: Result<T>, status: u16) -> Self {
        match result {
            Ok(value) => Envelope::Success { status, value },
            Err(err) => Envelope::failure(&err),
        }
    }

    /// Status code of either variant
    pub fn status(&self) -> u16 {
        match self {
            Envelope::Success { status, .. } | Envelope::Failure { status, .. } => *status,
        }
    }

    /// True for success
    pub fn is_ok(&self) -> bool {
        matches!(self, Envelope::Success { .. })
    }

    /// Borrow the success value
    pub fn value(&self) -> Option<&T> {
        match self {
            Envelope::Success { value, .. } => Some(value),
            Envelope::Failure { .. } => None,
        }
    }

    /// Borrow the failure body
    pub fn error(&self) -> Option<&ErrorBody> {
        match self {
            Envelope::Success { .. } => None,
            Envelope::Failure { error, .. } => Some(error),
        }
    }

    /// Consume into the success value
    pub fn into_value(self) -> Option<T> {
        match self {
            Envelope::Success { value, .. } => Some(value),
            Envelope::Failure { .. } => None,
        }
    }

    /// Map the success value
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Envelope<U> {
        match self {
            Envelope::Success { status, value } => Envelope::Success {
                status,
                value: f(value),
            },
            Envelope::Failure { status, error } => Envelope::Failure { status, error },
        }
    }
}
