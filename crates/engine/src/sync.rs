//! Reference Sync Processor
//!
//! Keeps denormalized copies in one collection current with the services
//! that own them. Notifications are routed by `serviceName`: a descriptor
//! reacts only to its own owner.
//!
//! - `modified` entities overwrite every embedded copy
//! - `removed` entities tombstone scalar copies to `{id}` and drop array
//!   elements
//! - `added` entities are ignored; dependents pick them up through
//!   `populate` when they next write
//!
//! Descriptors are processed in declaration order and entities in payload
//! order. The first store failure aborts the notification; writes made
//! before it stay applied.

use crate::collection::Collection;
use crate::notifications::NotificationHandler;
use crate::references::{ReferenceDescriptor, ReferenceResolver};
use async_trait::async_trait;
use lyceum_core::{
    DocId, Document, Notification, NotificationKind, Projection, RequestContext, Result,
};
use std::fmt;
use tracing::debug;

/// Documents touched while processing one notification
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Documents whose embedded copies were overwritten
    pub modified: usize,
    /// Documents whose embedded copies were tombstoned or dropped
    pub removed: usize,
}

impl SyncReport {
    /// Total documents written
    pub fn total(&self) -> usize {
        self.modified + self.removed
    }
}

/// Applies owner notifications to one dependent collection
#[derive(Clone)]
pub struct ReferenceSyncProcessor {
    collection: Collection,
    descriptors: Vec<ReferenceDescriptor>,
    resolver: ReferenceResolver,
}

impl fmt::Debug for ReferenceSyncProcessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReferenceSyncProcessor")
            .field("collection", &self.collection.name())
            .field("descriptors", &self.descriptors)
            .field("fill_references", &self.resolver.fill_references())
            .finish()
    }
}

impl ReferenceSyncProcessor {
    /// Processor for `collection` over its reference descriptors
    pub fn new(
        collection: Collection,
        descriptors: Vec<ReferenceDescriptor>,
        resolver: ReferenceResolver,
    ) -> Self {
        ReferenceSyncProcessor {
            collection,
            descriptors,
            resolver,
        }
    }

    /// Dependent collection name
    pub fn collection(&self) -> &str {
        self.collection.name()
    }

    /// Owner identities this processor listens to, in declaration order
    pub fn owners(&self) -> Vec<&str> {
        let mut owners: Vec<&str> = Vec::new();
        for descriptor in &self.descriptors {
            let owner = descriptor.owner_identity();
            if !owners.contains(&owner) {
                owners.push(owner);
            }
        }
        owners
    }

    /// Union of the projections of every descriptor owned by `owner`
    ///
    /// This is what a subscription to `owner` must carry so every
    /// descriptor sees the fields it embeds.
    pub fn projection_for(&self, owner: &str) -> Projection {
        let default = self.resolver.default_projection();
        self.descriptors
            .iter()
            .filter(|d| d.owner_identity() == owner)
            .map(|d| d.projection_or(default).clone())
            .reduce(|acc, p| acc.union(&p))
            .unwrap_or_else(|| default.clone())
    }

    /// Apply `notification` to every embedded copy it concerns
    ///
    /// Returns `None` when filling is disabled or no descriptor handled a
    /// `modified` or `removed` entity.
    pub async fn on_notification_references(
        &self,
        ctx: &RequestContext,
        notification: &Notification,
    ) -> Result<Option<SyncReport>> {
        if !self.resolver.fill_references() {
            debug!(collection = %self.collection.name(), "reference filling disabled, skipping notification");
            return Ok(None);
        }

        let mut report = SyncReport::default();
        let mut processed = false;
        for descriptor in &self.descriptors {
            if descriptor.owner_identity() != notification.service_name {
                continue;
            }

            let modified = notification.entities(NotificationKind::Modified);
            if !modified.is_empty() {
                processed = true;
                let projection = descriptor.projection_or(self.resolver.default_projection());
                for entity in modified {
                    let values = embedded_values(entity, projection);
                    report.modified += self
                        .collection
                        .update_many_references(ctx, descriptor.selector(), &values)
                        .await?;
                }
            }

            let removed = notification.entities(NotificationKind::Removed);
            if !removed.is_empty() {
                processed = true;
                for entity in removed {
                    report.removed += self
                        .collection
                        .delete_many_references(ctx, descriptor.selector(), entity)
                        .await?;
                }
            }
        }

        if !processed {
            return Ok(None);
        }
        debug!(
            collection = %self.collection.name(),
            service = %notification.service_name,
            modified = report.modified,
            removed = report.removed,
            "synchronized references"
        );
        Ok(Some(report))
    }
}

/// `entity` cut to `projection`, with its id kept whatever the projection says
fn embedded_values(entity: &Document, projection: &Projection) -> Document {
    let mut values = projection.apply(entity);
    if let Some(id) = entity.id() {
        values.set_id(&DocId::new(id));
    }
    values
}

#[async_trait]
impl NotificationHandler for ReferenceSyncProcessor {
    async fn handle(&self, ctx: &RequestContext, notification: &Notification) -> Result<()> {
        self.on_notification_references(ctx, notification)
            .await
            .map(|_| ())
    }
}
