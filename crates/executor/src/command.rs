//! Command enum defining every service operation.
//!
//! A command names the target service and carries everything the
//! operation needs. Commands are plain data and round-trip through JSON,
//! so a transport can hand them to the [`Executor`](crate::Executor)
//! unchanged.

use lyceum_core::{Document, Filter, PatchRequest, Projection};
use lyceum_engine::QueryOptions;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A self-contained, serializable service operation.
///
/// | Command | Returns | Success status |
/// |---------|---------|----------------|
/// | `Post` | `Output::Record` | 201 |
/// | `Put`, `Patch`, `Delete` | `Output::Record` | 200 |
/// | `GetOne` | `Output::Document` | 200 |
/// | `GetAll`, `GetAllByIds` | `Output::Documents` | 200 |
/// | `GetAllCount` | `Output::Count` | 200 |
/// | `Notification` | `Output::Processed` | 200 |
/// | `Ping` | `Output::Pong` | 200 |
///
/// # Example
///
/// ```
/// use lyceum_executor::Command;
/// use serde_json::json;
///
/// let cmd: Command = serde_json::from_value(json!({
///     "Delete": {"service": "classes", "id": "c1"}
/// }))
/// .unwrap();
/// assert_eq!(cmd.service(), Some("classes"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub enum Command {
    /// Create a document; the id is generated when absent.
    Post {
        /// Target service
        service: String,
        /// New document
        document: Document,
    },

    /// Replace every field of an existing document.
    Put {
        /// Target service
        service: String,
        /// Document id
        id: String,
        /// Replacement fields
        document: Document,
    },

    /// Apply a set/unset/remove/add delta.
    Patch {
        /// Target service
        service: String,
        /// Document id
        id: String,
        /// The delta
        patch: PatchRequest,
    },

    /// Delete a document, returning its prior value.
    Delete {
        /// Target service
        service: String,
        /// Document id
        id: String,
        /// Fields of the prior value returned; all when absent
        #[serde(default, skip_serializing_if = "Option::is_none")]
        projection: Option<Projection>,
    },

    /// Read one document.
    GetOne {
        /// Target service
        service: String,
        /// Document id
        id: String,
        /// Fields returned; all when absent
        #[serde(default, skip_serializing_if = "Option::is_none")]
        projection: Option<Projection>,
        /// Fill reference fields from their owners
        #[serde(default)]
        populate: bool,
    },

    /// Read matching documents.
    GetAll {
        /// Target service
        service: String,
        /// Filter, projection and paging
        #[serde(default)]
        options: QueryOptions,
        /// Fill reference fields from their owners
        #[serde(default)]
        populate: bool,
    },

    /// Read documents by id; unknown ids are skipped.
    GetAllByIds {
        /// Target service
        service: String,
        /// Ids to read
        ids: Vec<String>,
        /// Fields returned; all when absent
        #[serde(default, skip_serializing_if = "Option::is_none")]
        projection: Option<Projection>,
        /// Fill reference fields from their owners
        #[serde(default)]
        populate: bool,
    },

    /// Count matching documents.
    GetAllCount {
        /// Target service
        service: String,
        /// Equality conditions
        #[serde(default)]
        filter: Filter,
    },

    /// Deliver a notification payload to a dependent service.
    Notification {
        /// Receiving service
        service: String,
        /// `{serviceName, added?, modified?, removed?}`
        payload: Value,
    },

    /// Liveness check.
    Ping,
}

impl Command {
    /// Target service, `None` for service-less commands
    pub fn service(&self) -> Option<&str> {
        match self {
            Command::Post { service, .. }
            | Command::Put { service, .. }
            | Command::Patch { service, .. }
            | Command::Delete { service, .. }
            | Command::GetOne { service, .. }
            | Command::GetAll { service, .. }
            | Command::GetAllByIds { service, .. }
            | Command::GetAllCount { service, .. }
            | Command::Notification { service, .. } => Some(service),
            Command::Ping => None,
        }
    }

    /// Variant name, used in logs
    pub fn name(&self) -> &'static str {
        match self {
            Command::Post { .. } => "Post",
            Command::Put { .. } => "Put",
            Command::Patch { .. } => "Patch",
            Command::Delete { .. } => "Delete",
            Command::GetOne { .. } => "GetOne",
            Command::GetAll { .. } => "GetAll",
            Command::GetAllByIds { .. } => "GetAllByIds",
            Command::GetAllCount { .. } => "GetAllCount",
            Command::Notification { .. } => "Notification",
            Command::Ping => "Ping",
        }
    }
}
