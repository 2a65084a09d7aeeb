//! Record codec
//!
//! Records are held as MessagePack bytes (`rmp-serde`, named fields). A
//! read always decodes a fresh copy, so no caller can alias stored state.

use lyceum_core::{Error, Record, Result};

/// Encode a record for storage
pub fn encode(record: &Record) -> Result<Vec<u8>> {
    rmp_serde::to_vec_named(record).map_err(|e| Error::serialization(e.to_string()))
}

/// Decode a stored record
pub fn decode(bytes: &[u8]) -> Result<Record> {
    rmp_serde::from_slice(bytes).map_err(|e| Error::serialization(e.to_string()))
}
