//! Document, DocId and Record
//!
//! A [`Document`] is a JSON object with a required, immutable `id` string.
//! A [`Record`] is the stored form of a document: the document plus its
//! modification counter and timestamps.

use crate::contract::Timestamp;
use crate::error::{Error, Result};
use crate::json::validate_limits;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::ops::{Deref, DerefMut};
use uuid::Uuid;

/// Name of the identity field every document carries
pub const ID_FIELD: &str = "id";

/// Document identifier
///
/// Ids are opaque strings. Generated ids are UUID v4 in hyphenated form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocId(String);

impl DocId {
    /// Wrap an existing id
    pub fn new(id: impl Into<String>) -> Self {
        DocId(id.into())
    }

    /// Generate a fresh random id
    pub fn generate() -> Self {
        DocId(Uuid::new_v4().to_string())
    }

    /// Borrow the id string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume into the id string
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for DocId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocId {
    fn from(s: &str) -> Self {
        DocId(s.to_string())
    }
}

impl From<String> for DocId {
    fn from(s: String) -> Self {
        DocId(s)
    }
}

impl AsRef<str> for DocId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A stored JSON object
///
/// Dereferences to the underlying `serde_json::Map`, so field access reads
/// like map access.
///
/// ```
/// use lyceum_core::Document;
/// use serde_json::json;
///
/// let doc = Document::from_value(json!({"id": "s1", "name": "North"})).unwrap();
/// assert_eq!(doc.id(), Some("s1"));
/// assert_eq!(doc.get("name"), Some(&json!("North")));
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document(Map<String, Value>);

impl Document {
    /// Create an empty document
    pub fn new() -> Self {
        Document(Map::new())
    }

    /// Wrap a JSON object map
    pub fn from_map(map: Map<String, Value>) -> Self {
        Document(map)
    }

    /// Convert a JSON value into a document
    ///
    /// # Errors
    ///
    /// Returns `Error::Validation` if the value is not an object.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(Document(map)),
            other => Err(Error::validation(format!(
                "expected a JSON object, found {}",
                crate::json::type_name(&other)
            ))),
        }
    }

    /// Document holding only an id
    pub fn with_id(id: &DocId) -> Self {
        let mut map = Map::new();
        map.insert(ID_FIELD.to_string(), Value::String(id.to_string()));
        Document(map)
    }

    /// The document's id, if present and a string
    pub fn id(&self) -> Option<&str> {
        self.0.get(ID_FIELD).and_then(Value::as_str)
    }

    /// The document's id as a [`DocId`]
    pub fn doc_id(&self) -> Option<DocId> {
        self.id().map(DocId::from)
    }

    /// Assign the id field
    pub fn set_id(&mut self, id: &DocId) {
        self.0
            .insert(ID_FIELD.to_string(), Value::String(id.to_string()));
    }

    /// Check size and depth limits
    pub fn validate(&self) -> Result<()> {
        validate_limits(&self.0)?;
        Ok(())
    }

    /// Borrow the underlying map
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Mutably borrow the underlying map
    pub fn as_map_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.0
    }

    /// Consume into the underlying map
    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    /// Consume into a JSON value
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl Deref for Document {
    type Target = Map<String, Value>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Document {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl From<Map<String, Value>> for Document {
    fn from(map: Map<String, Value>) -> Self {
        Document(map)
    }
}

impl From<Document> for Value {
    fn from(doc: Document) -> Self {
        doc.into_value()
    }
}

impl TryFrom<Value> for Document {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        Document::from_value(value)
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Value::Object(self.0.clone()))
    }
}

/// Stored form of a document
///
/// - `version` starts at 1 on creation and increments on every mutation
/// - `created_at` is fixed at creation
/// - `updated_at` is refreshed on every mutation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    /// The document body, including its `id`
    pub document: Document,
    /// Modification counter
    pub version: u64,
    /// Creation time
    pub created_at: Timestamp,
    /// Last modification time
    pub updated_at: Timestamp,
}

impl Record {
    /// Wrap a freshly created document at version 1
    pub fn new(document: Document) -> Self {
        let now = Timestamp::now();
        Record {
            document,
            version: 1,
            created_at: now,
            updated_at: now,
        }
    }

    /// The record's id
    pub fn id(&self) -> Option<&str> {
        self.document.id()
    }

    /// Increment the version and refresh `updated_at`
    ///
    /// Call this after any modification to the document.
    pub fn touch(&mut self) {
        self.version += 1;
        let now = Timestamp::now();
        // Clock steps backwards must not make updated_at precede created_at.
        self.updated_at = if now.is_before(self.created_at) {
            self.created_at
        } else {
            now
        };
    }
}
