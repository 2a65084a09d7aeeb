//! Storage layer for Lyceum
//!
//! This crate implements the document store handle used by every
//! collection:
//! - DocumentStore: async store trait (insert, replace, get, find, remove)
//! - MemoryStore: DashMap + FxHashMap sharded in-memory implementation
//! - codec: MessagePack record encoding
//!
//! Every call is scoped by a [`Namespace`](lyceum_core::Namespace), so
//! tenants never see each other's documents.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod codec;
pub mod memory;
pub mod store;

pub use memory::MemoryStore;
pub use store::DocumentStore;
