//! Document store handle
//!
//! The trait every collection writes through. Implementations own
//! durability and connection management; callers only see records.

use async_trait::async_trait;
use lyceum_core::{Filter, Namespace, Record, Result};

/// Async document store scoped by namespace
///
/// # Contract
///
/// - `insert` fails with `Conflict` when the id or any unique field value
///   is already taken in the namespace
/// - `replace` fails with `NotFound` when the id is absent and with
///   `Conflict` on a unique field clash with another record
/// - reads return records in insertion order
/// - returned records are copies; mutating them never touches the store
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Declare fields whose values must be unique within each namespace of
    /// `collection`
    fn ensure_unique(&self, collection: &str, fields: &[String]) -> Result<()>;

    /// Store a new record
    async fn insert(&self, ns: &Namespace, record: Record) -> Result<()>;

    /// Overwrite an existing record with the same id
    async fn replace(&self, ns: &Namespace, record: Record) -> Result<()>;

    /// Fetch one record by id
    async fn get(&self, ns: &Namespace, id: &str) -> Result<Option<Record>>;

    /// Records matching a filter
    async fn find(&self, ns: &Namespace, filter: &Filter) -> Result<Vec<Record>>;

    /// Records whose id is in `ids`; missing ids are skipped
    async fn find_by_ids(&self, ns: &Namespace, ids: &[String]) -> Result<Vec<Record>>;

    /// Number of records matching a filter
    async fn count(&self, ns: &Namespace, filter: &Filter) -> Result<usize>;

    /// Delete a record, returning its prior value
    async fn remove(&self, ns: &Namespace, id: &str) -> Result<Option<Record>>;
}
