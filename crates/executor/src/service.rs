//! One entity service: CRUD over a collection, reference filling on
//! write, change notifications, and the inbound `notification` endpoint.

use async_trait::async_trait;
use lyceum_core::{
    Document, Filter, Notification, NotificationKind, PatchRequest, Projection, Record,
    RequestContext, Result,
};
use lyceum_engine::{
    Collection, EntityService, NotificationBroker, QueryOptions, ReferenceDescriptor,
    ReferenceResolver, ReferenceSyncProcessor,
};
use serde_json::Value;
use std::fmt;
use tracing::debug;

/// A collection wired to its references and its broker
///
/// Writes fill reference fields before storing and raise a notification
/// after storing. Reads fill references only when asked.
pub struct DocumentService {
    collection: Collection,
    resolver: ReferenceResolver,
    descriptors: Vec<ReferenceDescriptor>,
    broker: NotificationBroker,
    sync: ReferenceSyncProcessor,
}

impl fmt::Debug for DocumentService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentService")
            .field("name", &self.collection.name())
            .field("descriptors", &self.descriptors)
            .field("broker", &self.broker)
            .finish()
    }
}

impl DocumentService {
    /// Service over `collection`, publishing through `broker`
    pub fn new(
        collection: Collection,
        resolver: ReferenceResolver,
        descriptors: Vec<ReferenceDescriptor>,
        broker: NotificationBroker,
    ) -> Self {
        let sync =
            ReferenceSyncProcessor::new(collection.clone(), descriptors.clone(), resolver.clone());
        Self {
            collection,
            resolver,
            descriptors,
            broker,
            sync,
        }
    }

    /// Service name; also the `serviceName` of its notifications
    pub fn name(&self) -> &str {
        self.collection.name()
    }

    /// Underlying collection
    pub fn collection(&self) -> &Collection {
        &self.collection
    }

    /// Broker this service raises notifications on
    pub fn broker(&self) -> &NotificationBroker {
        &self.broker
    }

    /// Processor applying owner notifications to this service's documents
    pub fn sync_processor(&self) -> &ReferenceSyncProcessor {
        &self.sync
    }

    /// Declared reference fields
    pub fn descriptors(&self) -> &[ReferenceDescriptor] {
        &self.descriptors
    }

    async fn fill(&self, ctx: &RequestContext, docs: &mut [Document]) -> Result<()> {
        self.resolver
            .populate_references(ctx, docs, &self.descriptors)
            .await?;
        Ok(())
    }

    async fn notify(&self, ctx: &RequestContext, kind: NotificationKind, doc: &Document) -> Result<()> {
        self.broker
            .raise_notification(ctx, kind, std::slice::from_ref(doc))
            .await?;
        Ok(())
    }

    /// Create a document; raises `added`
    ///
    /// Mutations return the stored record, so callers see the version and
    /// timestamps next to the document.
    pub async fn post(&self, ctx: &RequestContext, doc: Document) -> Result<Record> {
        let mut docs = [doc];
        self.fill(ctx, &mut docs).await?;
        let [doc] = docs;
        let record = self.collection.post(ctx, doc).await?;
        self.notify(ctx, NotificationKind::Added, &record.document)
            .await?;
        Ok(record)
    }

    /// Replace a document; raises `modified`
    pub async fn put(&self, ctx: &RequestContext, id: &str, doc: Document) -> Result<Record> {
        let mut docs = [doc];
        self.fill(ctx, &mut docs).await?;
        let [doc] = docs;
        let record = self.collection.put(ctx, id, doc).await?;
        self.notify(ctx, NotificationKind::Modified, &record.document)
            .await?;
        Ok(record)
    }

    /// Apply a delta; references in `set` and `add` are filled first.
    /// Raises `modified`.
    pub async fn patch(
        &self,
        ctx: &RequestContext,
        id: &str,
        request: &PatchRequest,
    ) -> Result<Record> {
        request.validate(id)?;
        let mut filled = request.clone();
        let has_set = filled.set.is_some();
        let has_add = filled.add.is_some();
        let mut parts: Vec<Document> = filled.set.take().into_iter().collect();
        parts.extend(filled.add.take());
        self.fill(ctx, &mut parts).await?;

        let mut parts = parts.into_iter();
        if has_set {
            filled.set = parts.next();
        }
        if has_add {
            filled.add = parts.next();
        }

        let record = self.collection.patch(ctx, id, &filled).await?;
        self.notify(ctx, NotificationKind::Modified, &record.document)
            .await?;
        Ok(record)
    }

    /// Delete a document, returning its last record cut to `projection`;
    /// raises `removed` with the full document
    pub async fn delete(
        &self,
        ctx: &RequestContext,
        id: &str,
        projection: &Projection,
    ) -> Result<Record> {
        let mut record = self.collection.delete(ctx, id).await?;
        self.notify(ctx, NotificationKind::Removed, &record.document)
            .await?;
        record.document = projection.apply(&record.document);
        Ok(record)
    }

    /// One document, optionally with references filled
    pub async fn get_one(
        &self,
        ctx: &RequestContext,
        id: &str,
        projection: &Projection,
        populate: bool,
    ) -> Result<Document> {
        let mut docs = [self.collection.get_one(ctx, id, projection).await?];
        if populate {
            self.fill(ctx, &mut docs).await?;
        }
        let [doc] = docs;
        Ok(doc)
    }

    /// Matching documents, optionally with references filled
    pub async fn get_all(
        &self,
        ctx: &RequestContext,
        options: &QueryOptions,
        populate: bool,
    ) -> Result<Vec<Document>> {
        let mut docs = self.collection.get_all(ctx, options).await?;
        if populate {
            self.fill(ctx, &mut docs).await?;
        }
        Ok(docs)
    }

    /// Documents by id, optionally with references filled
    pub async fn get_all_by_ids(
        &self,
        ctx: &RequestContext,
        ids: &[String],
        projection: &Projection,
        populate: bool,
    ) -> Result<Vec<Document>> {
        let mut docs = self.collection.get_all_by_ids(ctx, ids, projection).await?;
        if populate {
            self.fill(ctx, &mut docs).await?;
        }
        Ok(docs)
    }

    /// Number of matching documents
    pub async fn get_all_count(&self, ctx: &RequestContext, filter: &Filter) -> Result<usize> {
        self.collection.get_all_count(ctx, filter).await
    }

    /// Apply an inbound notification payload to embedded references
    ///
    /// The payload is parsed strictly; a malformed payload is a validation
    /// error and changes nothing. Returns whether any reference branch ran.
    pub async fn notification(&self, ctx: &RequestContext, payload: Value) -> Result<bool> {
        let notification = Notification::from_value(payload)?;
        let report = self
            .sync
            .on_notification_references(ctx, &notification)
            .await?;
        debug!(
            service = %self.name(),
            source = %notification.service_name,
            processed = report.is_some(),
            "handled notification"
        );
        Ok(report.is_some())
    }
}

#[async_trait]
impl EntityService for DocumentService {
    fn identity(&self) -> &str {
        self.name()
    }

    async fn get_all_by_ids(
        &self,
        ctx: &RequestContext,
        ids: &[String],
        projection: &Projection,
    ) -> Result<Vec<Document>> {
        self.collection.get_all_by_ids(ctx, ids, projection).await
    }
}
