//! # Lyceum Executor
//!
//! The public API for Lyceum services: multi-tenant document collections
//! that embed each other's entities and keep those copies current.
//!
//! This is the only crate users need to import. It provides:
//! - [`Executor`] - dispatches [`Command`]s to services, renders [`Envelope`]s
//! - [`DocumentService`] - one entity service
//! - [`LyceumConfig`] - service wiring from `lyceum.toml`
//!
//! ## Quick Start
//!
//! ```text
//! use lyceum_executor::{Command, Executor, LyceumConfig, MemoryStore, RequestContext};
//!
//! let config = LyceumConfig::from_file("lyceum.toml".as_ref())?;
//! let executor = Executor::from_config(&config, Arc::new(MemoryStore::new()))?;
//!
//! let ctx = RequestContext::new("school-a");
//! let reply = executor.execute(&ctx, Command::Post {
//!     service: "classes".into(),
//!     document: Document::from_value(json!({"name": "Math", "school": "s1"}))?,
//! }).await;
//! // {"status": 201, "value": {"document": {"id": "..", "name": "Math", "school": {"id": "s1", "name": ".."}},
//! //                           "version": 1, "createdAt": "..", "updatedAt": ".."}}
//! ```
//!
//! ## Reference fields
//!
//! | Shape | Declared as | Owner removes the entity |
//! |-------|-------------|--------------------------|
//! | `"s1"` or `{id, ..}` | `school` | reduced to `{id}` |
//! | `["s1", ..]` or `[{id, ..}, ..]` | `schools[]` | element dropped |

#![warn(missing_docs)]

mod command;
mod executor;
mod output;
mod service;

#[cfg(test)]
mod tests;

// =============================================================================
// Public API - Everything users need is re-exported here
// =============================================================================

pub use command::Command;
pub use executor::Executor;
pub use output::Output;
pub use service::DocumentService;

pub use lyceum_core::{
    DocId, Document, Envelope, Error, ErrorBody, ErrorKind, Filter, Notification,
    NotificationKind, PatchRequest, Projection, Record, RequestContext, Result, STATUS_CREATED,
    STATUS_OK,
};
pub use lyceum_engine::{
    EntityService, LyceumConfig, MemoryQueue, NotificationChannel, NotificationHandler,
    QueryOptions, QueueConfig, ReferenceConfig, ServiceConfig, Subscriber, CONFIG_FILE_NAME,
};
pub use lyceum_storage::{DocumentStore, MemoryStore};
