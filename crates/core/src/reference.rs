//! Reference shapes and field selectors
//!
//! A reference field holds one of four shapes: a bare id string, an
//! embedded `{id, ...}` object, or an array of either. [`Reference`] is the
//! sum type those shapes parse into; callers pattern-match on it instead
//! of inspecting JSON types at every site.

use crate::document::Document;
use crate::error::{Error, Result};
use crate::json::FieldPath;
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Suffix marking an array-of-objects selector (`"schools[]"`)
pub const MANY_SUFFIX: &str = "[]";

/// A parsed reference value
#[derive(Debug, Clone, PartialEq)]
pub enum Reference {
    /// Bare id
    Id(String),
    /// Embedded (possibly partial) copy of the referenced entity
    Entity(Document),
    /// Array of references
    List(Vec<Reference>),
}

impl Reference {
    /// Parse a JSON value
    ///
    /// Strings become `Id`, objects `Entity`, arrays `List`. Other values
    /// (numbers, booleans, null) are not references; inside arrays they are
    /// skipped.
    pub fn from_value(value: &Value) -> Option<Reference> {
        match value {
            Value::String(id) => Some(Reference::Id(id.clone())),
            Value::Object(map) => Some(Reference::Entity(Document::from_map(map.clone()))),
            Value::Array(items) => Some(Reference::List(
                items.iter().filter_map(Reference::from_value).collect(),
            )),
            _ => None,
        }
    }

    /// Render back to JSON
    pub fn into_value(self) -> Value {
        match self {
            Reference::Id(id) => Value::String(id),
            Reference::Entity(doc) => doc.into_value(),
            Reference::List(items) => {
                Value::Array(items.into_iter().map(Reference::into_value).collect())
            }
        }
    }

    /// Every id named by this reference, recursing into lists
    pub fn collect_ids(&self, out: &mut BTreeSet<String>) {
        match self {
            Reference::Id(id) => {
                out.insert(id.clone());
            }
            Reference::Entity(doc) => {
                if let Some(id) = doc.id() {
                    out.insert(id.to_string());
                }
            }
            Reference::List(items) => {
                for item in items {
                    item.collect_ids(out);
                }
            }
        }
    }

    /// Id of a single (non-list) reference
    pub fn id(&self) -> Option<&str> {
        match self {
            Reference::Id(id) => Some(id),
            Reference::Entity(doc) => doc.id(),
            Reference::List(_) => None,
        }
    }
}

/// Names the field holding an embedded reference
///
/// - `"school"`: a scalar embedded object
/// - `"schools[]"`: an array of embedded objects
/// - `""`: the document itself
///
/// ```
/// use lyceum_core::FieldSelector;
///
/// let one: FieldSelector = "school".parse().unwrap();
/// let many: FieldSelector = "schools[]".parse().unwrap();
/// assert!(!one.is_many());
/// assert!(many.is_many());
/// assert_eq!(many.path().to_string(), "schools");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldSelector {
    path: FieldPath,
    many: bool,
}

impl FieldSelector {
    /// Selector over a parsed path
    pub fn new(path: FieldPath, many: bool) -> Self {
        FieldSelector { path, many }
    }

    /// Selector for the document itself
    pub fn root() -> Self {
        FieldSelector {
            path: FieldPath::root(),
            many: false,
        }
    }

    /// The field path without the `[]` marker
    pub fn path(&self) -> &FieldPath {
        &self.path
    }

    /// True for array-of-objects selectors
    pub fn is_many(&self) -> bool {
        self.many
    }

    /// True when the selector names the document itself
    pub fn is_root(&self) -> bool {
        self.path.is_root()
    }
}

impl FromStr for FieldSelector {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (raw, many) = match s.strip_suffix(MANY_SUFFIX) {
            Some(raw) => (raw, true),
            None => (s, false),
        };
        let path: FieldPath = raw.parse()?;
        if many && path.is_root() {
            return Err(Error::validation("array selector needs a field name"));
        }
        path.validate()?;
        Ok(FieldSelector { path, many })
    }
}

impl fmt::Display for FieldSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path)?;
        if self.many {
            f.write_str(MANY_SUFFIX)?;
        }
        Ok(())
    }
}
