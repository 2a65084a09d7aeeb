//! Patch request type
//!
//! A [`PatchRequest`] is a delta applied to one document. The engine
//! applies its parts in the order set → unset → remove → add, so an array
//! element named by both `remove` and `add` ends up added.

use crate::document::{Document, ID_FIELD};
use crate::error::{Error, Result};
use crate::json::FieldPath;
use serde::{Deserialize, Serialize};

/// Delta against one document
///
/// Unknown top-level keys are rejected during deserialization.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PatchRequest {
    /// Fields replaced wholesale
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub set: Option<Document>,
    /// Fields removed entirely
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unset: Option<Vec<String>>,
    /// Values merged into arrays (set union, merge by id)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub add: Option<Document>,
    /// Values subtracted from arrays (set difference, nested subtract)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remove: Option<Document>,
}

impl PatchRequest {
    /// Empty request (builder start)
    pub fn new() -> Self {
        PatchRequest::default()
    }

    /// Attach a `set` part
    pub fn with_set(mut self, set: Document) -> Self {
        self.set = Some(set);
        self
    }

    /// Attach an `unset` part
    pub fn with_unset<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.unset = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    /// Attach an `add` part
    pub fn with_add(mut self, add: Document) -> Self {
        self.add = Some(add);
        self
    }

    /// Attach a `remove` part
    pub fn with_remove(mut self, remove: Document) -> Self {
        self.remove = Some(remove);
        self
    }

    /// True when no part carries anything
    pub fn is_empty(&self) -> bool {
        self.set.as_ref().map_or(true, |d| d.is_empty())
            && self.unset.as_ref().map_or(true, |u| u.is_empty())
            && self.add.as_ref().map_or(true, |d| d.is_empty())
            && self.remove.as_ref().map_or(true, |d| d.is_empty())
    }

    /// Reject malformed requests before any mutation
    ///
    /// - at least one part must be non-empty
    /// - `set.id` may only repeat the target id
    /// - `unset`, `add` and `remove` may not touch `id`
    /// - every `unset` entry must be a valid field path
    pub fn validate(&self, target_id: &str) -> Result<()> {
        if self.is_empty() {
            return Err(Error::validation("patch request is empty"));
        }
        if let Some(set) = &self.set {
            if let Some(id) = set.get(ID_FIELD) {
                if id.as_str() != Some(target_id) {
                    return Err(Error::validation("id is immutable"));
                }
            }
            set.validate()?;
        }
        if let Some(unset) = &self.unset {
            for field in unset {
                let path: FieldPath = field.parse()?;
                if path.is_root() || (path.first_key() == Some(ID_FIELD) && path.len() == 1) {
                    return Err(Error::validation(format!("cannot unset '{}'", field)));
                }
                path.validate()?;
            }
        }
        for (part, doc) in [("add", &self.add), ("remove", &self.remove)] {
            if let Some(doc) = doc {
                if doc.contains_key(ID_FIELD) {
                    return Err(Error::validation(format!("{} cannot target id", part)));
                }
                doc.validate()?;
            }
        }
        Ok(())
    }
}
