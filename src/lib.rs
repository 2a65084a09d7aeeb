//! Lyceum - multi-tenant document services for school management
//!
//! Each entity service (schools, classes, teachers, ...) stores its own
//! documents and embeds denormalized copies of entities owned by other
//! services. Owners announce changes through notifications and dependents
//! rewrite their embedded copies in response.
//!
//! # Quick Start
//!
//! ```ignore
//! use lyceum::{Command, Executor, LyceumConfig, MemoryStore, RequestContext};
//!
//! let config = LyceumConfig::from_file("lyceum.toml".as_ref())?;
//! let executor = Executor::from_config(&config, Arc::new(MemoryStore::new()))?;
//! let reply = executor.execute(&RequestContext::new("school-a"), Command::Ping).await;
//! ```
//!
//! # Architecture
//!
//! All operations go through the [`Executor`], which routes each
//! [`Command`] to a [`DocumentService`] and renders an [`Envelope`].
//! Patching, reference resolution and notification fan-out live in
//! `lyceum-engine`; storage sits behind the [`DocumentStore`] trait.

// Re-export the public API from lyceum-executor
pub use lyceum_executor::*;
