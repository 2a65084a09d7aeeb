//! Core types for Lyceum
//!
//! This crate defines the foundational types used throughout the system:
//! - Document, DocId, Record: stored entities and their version metadata
//! - RequestContext, Namespace: tenant scoping
//! - FieldPath: dotted field paths and path-based access
//! - Projection, Filter: read shaping and equality matching
//! - PatchRequest: set/unset/add/remove deltas
//! - Notification: change events exchanged between services
//! - Reference, FieldSelector: reference shapes and embedded-field selectors
//! - Envelope: the `{status, value}` / `{status, error}` result form
//! - Error: error type hierarchy

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod contract;
pub mod document;
pub mod envelope;
pub mod error;
pub mod filter;
pub mod json;
pub mod notification;
pub mod patch;
pub mod projection;
pub mod reference;
pub mod types;

pub use contract::Timestamp;
pub use document::{DocId, Document, Record, ID_FIELD};
pub use envelope::{Envelope, ErrorBody, STATUS_CREATED, STATUS_OK};
pub use error::{Error, ErrorKind, Result};
pub use filter::Filter;
pub use json::{
    get_at_path, get_at_path_mut, remove_at_path, set_at_path, FieldPath, LimitError,
    PathError, PathParseError, PathSegment, MAX_DOCUMENT_SIZE, MAX_NESTING_DEPTH,
    MAX_PATH_LENGTH,
};
pub use notification::{Notification, NotificationKind};
pub use patch::PatchRequest;
pub use projection::Projection;
pub use reference::{FieldSelector, Reference, MANY_SUFFIX};
pub use types::{Namespace, RequestContext, DEFAULT_LOCALE, DEFAULT_TENANT};
