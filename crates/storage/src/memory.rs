//! Sharded in-memory document store
//!
//! DashMap keyed by namespace, FxHashMap within.
//!
//! # Design
//!
//! - DashMap: one shard per tenant/collection, lock-free reads
//! - FxHashMap: O(1) id lookups inside a shard
//! - Per-namespace: tenants never contend and never see each other's data
//! - Records held as MessagePack bytes; every read decodes a fresh copy
//! - Insertion sequence numbers give reads a stable order
//!
//! Guards are never held across an `.await`; every trait method completes
//! synchronously inside its future.

use crate::codec;
use crate::store::DocumentStore;
use async_trait::async_trait;
use dashmap::DashMap;
use lyceum_core::{get_at_path, Error, FieldPath, Filter, Namespace, Record, Result};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::collections::HashSet;
use tracing::debug;

#[derive(Debug, Clone)]
struct Slot {
    seq: u64,
    bytes: Vec<u8>,
}

/// Records of one namespace
#[derive(Debug, Default)]
pub struct Shard {
    data: FxHashMap<String, Slot>,
    next_seq: u64,
}

impl Shard {
    /// Number of records in this shard
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if shard is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// (id, slot) pairs in insertion order
    fn ordered(&self) -> Vec<(&String, &Slot)> {
        let mut slots: Vec<_> = self.data.iter().collect();
        slots.sort_by_key(|(_, slot)| slot.seq);
        slots
    }

    fn check_unique(&self, paths: &[FieldPath], record: &Record, own_id: &str) -> Result<()> {
        for path in paths {
            let Some(value) = get_at_path(record.document.as_map(), path) else {
                continue;
            };
            if value.is_null() {
                continue;
            }
            for (id, slot) in &self.data {
                if id == own_id {
                    continue;
                }
                let other = codec::decode(&slot.bytes)?;
                if get_at_path(other.document.as_map(), path) == Some(value) {
                    return Err(Error::conflict(format!(
                        "duplicate value for unique field '{}'",
                        path
                    )));
                }
            }
        }
        Ok(())
    }
}

/// In-memory [`DocumentStore`]
///
/// # Example
///
/// ```
/// use lyceum_storage::{DocumentStore, MemoryStore};
///
/// let store = MemoryStore::new();
/// store.ensure_unique("users", &["email".to_string()]).unwrap();
/// assert_eq!(store.shard_count(), 0);
/// ```
#[derive(Debug, Default)]
pub struct MemoryStore {
    shards: DashMap<Namespace, Shard>,
    unique: RwLock<FxHashMap<String, Vec<FieldPath>>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of namespaces holding data
    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// Total records across all namespaces
    pub fn total_entries(&self) -> usize {
        self.shards.iter().map(|entry| entry.value().len()).sum()
    }

    /// Records in one namespace
    pub fn namespace_len(&self, ns: &Namespace) -> usize {
        self.shards.get(ns).map(|shard| shard.len()).unwrap_or(0)
    }

    fn unique_paths(&self, collection: &str) -> Vec<FieldPath> {
        self.unique.read().get(collection).cloned().unwrap_or_default()
    }

    fn decode_where<P>(&self, ns: &Namespace, mut keep: P) -> Result<Vec<Record>>
    where
        P: FnMut(&str, &Record) -> bool,
    {
        let Some(shard) = self.shards.get(ns) else {
            return Ok(Vec::new());
        };
        let mut out = Vec::new();
        for (id, slot) in shard.ordered() {
            let record = codec::decode(&slot.bytes)?;
            if keep(id, &record) {
                out.push(record);
            }
        }
        Ok(out)
    }
}

fn record_id(record: &Record) -> Result<String> {
    record
        .id()
        .map(str::to_string)
        .ok_or_else(|| Error::validation("record has no id"))
}

#[async_trait]
impl DocumentStore for MemoryStore {
    fn ensure_unique(&self, collection: &str, fields: &[String]) -> Result<()> {
        let mut paths = Vec::with_capacity(fields.len());
        for field in fields {
            let path: FieldPath = field.parse()?;
            if path.is_root() {
                return Err(Error::validation("unique field cannot be empty"));
            }
            paths.push(path);
        }
        let mut unique = self.unique.write();
        let entry = unique.entry(collection.to_string()).or_default();
        for path in paths {
            if !entry.contains(&path) {
                entry.push(path);
            }
        }
        Ok(())
    }

    async fn insert(&self, ns: &Namespace, record: Record) -> Result<()> {
        let id = record_id(&record)?;
        let paths = self.unique_paths(&ns.collection);
        let bytes = codec::encode(&record)?;

        let mut shard = self.shards.entry(ns.clone()).or_default();
        if shard.data.contains_key(&id) {
            return Err(Error::conflict(format!(
                "{} document '{}' already exists",
                ns.collection, id
            )));
        }
        shard.check_unique(&paths, &record, &id)?;
        let seq = shard.next_seq;
        shard.next_seq += 1;
        shard.data.insert(id.clone(), Slot { seq, bytes });
        debug!(namespace = %ns, id = %id, "inserted record");
        Ok(())
    }

    async fn replace(&self, ns: &Namespace, record: Record) -> Result<()> {
        let id = record_id(&record)?;
        let paths = self.unique_paths(&ns.collection);
        let bytes = codec::encode(&record)?;

        let Some(mut shard) = self.shards.get_mut(ns) else {
            return Err(Error::not_found(ns.collection.clone(), id));
        };
        if !shard.data.contains_key(&id) {
            return Err(Error::not_found(ns.collection.clone(), id));
        }
        shard.check_unique(&paths, &record, &id)?;
        if let Some(slot) = shard.data.get_mut(&id) {
            slot.bytes = bytes;
        }
        debug!(namespace = %ns, id = %id, version = record.version, "replaced record");
        Ok(())
    }

    async fn get(&self, ns: &Namespace, id: &str) -> Result<Option<Record>> {
        self.shards
            .get(ns)
            .and_then(|shard| shard.data.get(id).map(|slot| codec::decode(&slot.bytes)))
            .transpose()
    }

    async fn find(&self, ns: &Namespace, filter: &Filter) -> Result<Vec<Record>> {
        self.decode_where(ns, |_, record| filter.matches(&record.document))
    }

    async fn find_by_ids(&self, ns: &Namespace, ids: &[String]) -> Result<Vec<Record>> {
        let wanted: HashSet<&str> = ids.iter().map(String::as_str).collect();
        self.decode_where(ns, |id, _| wanted.contains(id))
    }

    async fn count(&self, ns: &Namespace, filter: &Filter) -> Result<usize> {
        if filter.is_empty() {
            return Ok(self.namespace_len(ns));
        }
        Ok(self.find(ns, filter).await?.len())
    }

    async fn remove(&self, ns: &Namespace, id: &str) -> Result<Option<Record>> {
        let removed = self
            .shards
            .get_mut(ns)
            .and_then(|mut shard| shard.data.remove(id));
        if removed.is_some() {
            debug!(namespace = %ns, id = %id, "removed record");
        }
        removed.map(|slot| codec::decode(&slot.bytes)).transpose()
    }
}
