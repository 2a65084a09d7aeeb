//! Document engine for Lyceum services
//!
//! This crate holds everything between the store and a service endpoint:
//! - Patch Engine: pure document patching plus the [`Collection`] facade
//! - Reference Resolver: filling embedded references from their owners
//! - Notification Broker: in-process fan-out and the queue channel
//! - Reference Sync Processor: keeping embedded copies current
//! - Configuration: service wiring from `lyceum.toml`
//!
//! Nothing here knows about transports. Callers hand in a
//! [`RequestContext`](lyceum_core::RequestContext) and get `Result`s back.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod collection;
pub mod config;
pub mod notifications;
pub mod patch;
pub mod queue;
pub mod references;
pub mod sync;

pub use collection::{Collection, QueryOptions};
pub use config::{LyceumConfig, QueueConfig, ReferenceConfig, ServiceConfig, CONFIG_FILE_NAME};
pub use notifications::{
    NotificationBroker, NotificationChannel, NotificationHandler, Subscriber, SubscriberRegistry,
};
pub use queue::{MemoryQueue, DEFAULT_MAX_REDELIVERIES};
pub use references::{EntityService, ReferenceDescriptor, ReferenceResolver};
pub use sync::{ReferenceSyncProcessor, SyncReport};
