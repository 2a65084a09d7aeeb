//! Output enum for command results.
//!
//! Outputs serialize as their bare payload so the envelope reads
//! `{status, value: <document>}` rather than a tagged wrapper. Mutations
//! answer with the whole record:
//! `{status, value: {document, version, createdAt, updatedAt}}`.

use lyceum_core::{Document, Record};
use serde::Serialize;

/// Successful command results.
///
/// Each [`Command`](crate::Command) variant maps to exactly one `Output`
/// variant; see the table on `Command`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Output {
    /// A stored record after a mutation
    Record(Record),

    /// A single document
    Document(Document),

    /// Documents in store order
    Documents(Vec<Document>),

    /// Count of matching documents
    Count(u64),

    /// Result of an inbound notification
    Processed {
        /// Whether any reference branch ran
        processed: bool,
    },

    /// Ping response
    Pong {
        /// Crate version string
        version: String,
    },
}

impl Output {
    /// The document, if this is a single-document or record output
    pub fn document(&self) -> Option<&Document> {
        match self {
            Output::Document(doc) => Some(doc),
            Output::Record(record) => Some(&record.document),
            _ => None,
        }
    }

    /// The record, if this is a mutation output
    pub fn record(&self) -> Option<&Record> {
        match self {
            Output::Record(record) => Some(record),
            _ => None,
        }
    }

    /// The documents, if this is a list output
    pub fn documents(&self) -> Option<&[Document]> {
        match self {
            Output::Documents(docs) => Some(docs),
            _ => None,
        }
    }
}
