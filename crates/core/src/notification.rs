//! Change notifications
//!
//! Wire format:
//!
//! ```json
//! { "serviceName": "schools", "modified": [{ "id": "s1", "name": "North" }] }
//! ```
//!
//! `serviceName` is required; `added`, `modified` and `removed` are
//! optional arrays of documents that each carry an `id`. No other
//! top-level keys are accepted.

use crate::document::Document;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Which array of a notification an entity list belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    /// Entities created in the owning service
    Added,
    /// Entities changed in the owning service
    Modified,
    /// Entities deleted from the owning service
    Removed,
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            NotificationKind::Added => "added",
            NotificationKind::Modified => "modified",
            NotificationKind::Removed => "removed",
        })
    }
}

/// A change event describing entities of one owning service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Notification {
    /// Identity of the owning service
    pub service_name: String,
    /// Created entities
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub added: Option<Vec<Document>>,
    /// Changed entities
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified: Option<Vec<Document>>,
    /// Deleted entities
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub removed: Option<Vec<Document>>,
}

impl Notification {
    /// Notification with one populated array
    pub fn new(service_name: impl Into<String>, kind: NotificationKind, entities: Vec<Document>) -> Self {
        let mut notification = Notification {
            service_name: service_name.into(),
            added: None,
            modified: None,
            removed: None,
        };
        *notification.slot_mut(kind) = Some(entities);
        notification
    }

    /// Strictly parse and validate a wire payload
    ///
    /// # Errors
    ///
    /// Returns `Error::Validation` for unknown keys, a missing or empty
    /// `serviceName`, or entities without a string `id`.
    pub fn from_value(value: Value) -> Result<Self> {
        let notification: Notification = serde_json::from_value(value)
            .map_err(|e| Error::validation(format!("invalid notification: {}", e)))?;
        notification.validate()?;
        Ok(notification)
    }

    /// Check the payload invariants
    pub fn validate(&self) -> Result<()> {
        if self.service_name.trim().is_empty() {
            return Err(Error::validation("notification serviceName is required"));
        }
        for kind in [
            NotificationKind::Added,
            NotificationKind::Modified,
            NotificationKind::Removed,
        ] {
            for entity in self.entities(kind) {
                if entity.id().is_none() {
                    return Err(Error::validation(format!(
                        "every {} entity needs a string id",
                        kind
                    )));
                }
            }
        }
        Ok(())
    }

    /// Entities of one kind; empty when the array is absent
    pub fn entities(&self, kind: NotificationKind) -> &[Document] {
        match kind {
            NotificationKind::Added => self.added.as_deref(),
            NotificationKind::Modified => self.modified.as_deref(),
            NotificationKind::Removed => self.removed.as_deref(),
        }
        .unwrap_or(&[])
    }

    fn slot_mut(&mut self, kind: NotificationKind) -> &mut Option<Vec<Document>> {
        match kind {
            NotificationKind::Added => &mut self.added,
            NotificationKind::Modified => &mut self.modified,
            NotificationKind::Removed => &mut self.removed,
        }
    }

    /// Kinds whose arrays are present, in added → modified → removed order
    pub fn kinds(&self) -> Vec<NotificationKind> {
        let mut kinds = Vec::new();
        if self.added.is_some() {
            kinds.push(NotificationKind::Added);
        }
        if self.modified.is_some() {
            kinds.push(NotificationKind::Modified);
        }
        if self.removed.is_some() {
            kinds.push(NotificationKind::Removed);
        }
        kinds
    }

    /// Copy of this notification with every entity mapped through `f`
    pub fn map_entities<F>(&self, mut f: F) -> Notification
    where
        F: FnMut(&Document) -> Document,
    {
        let mut map = |list: &Option<Vec<Document>>| -> Option<Vec<Document>> {
            list.as_ref().map(|l| l.iter().map(&mut f).collect())
        };
        Notification {
            service_name: self.service_name.clone(),
            added: map(&self.added),
            modified: map(&self.modified),
            removed: map(&self.removed),
        }
    }
}
