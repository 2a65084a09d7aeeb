//! Collection: the Patch Engine's store facade
//!
//! One collection per service. Every write goes load → mutate → `touch()` →
//! replace, so stored records always carry a fresh version and
//! `updated_at`. Reads apply an optional projection on the way out.

use crate::patch;
use crate::references::EntityService;
use async_trait::async_trait;
use lyceum_core::{
    DocId, Document, Error, FieldPath, FieldSelector, Filter, PatchRequest, Projection, Record,
    RequestContext, Result, ID_FIELD,
};
use lyceum_storage::DocumentStore;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Options for [`Collection::get_all`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QueryOptions {
    /// Equality conditions
    pub filter: Filter,
    /// Fields returned
    pub projection: Projection,
    /// Matches skipped before the first returned document
    pub skip: usize,
    /// Maximum documents returned
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

impl QueryOptions {
    /// Options matching every document
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the filter
    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }

    /// Set the projection
    pub fn with_projection(mut self, projection: Projection) -> Self {
        self.projection = projection;
        self
    }

    /// Set skip and limit
    pub fn paged(mut self, skip: usize, limit: usize) -> Self {
        self.skip = skip;
        self.limit = Some(limit);
        self
    }
}

/// Documents of one service, scoped per tenant by the request context
#[derive(Clone)]
pub struct Collection {
    name: String,
    store: Arc<dyn DocumentStore>,
}

impl fmt::Debug for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collection").field("name", &self.name).finish()
    }
}

impl Collection {
    /// Collection `name` over a store handle
    pub fn new(name: impl Into<String>, store: Arc<dyn DocumentStore>) -> Self {
        Collection {
            name: name.into(),
            store,
        }
    }

    /// Collection name
    pub fn name(&self) -> &str {
        &self.name
    }

    async fn load(&self, ctx: &RequestContext, id: &str) -> Result<Record> {
        self.store
            .get(&ctx.namespace(&self.name), id)
            .await?
            .ok_or_else(|| Error::not_found(self.name.clone(), id))
    }

    async fn save(&self, ctx: &RequestContext, record: &mut Record) -> Result<()> {
        record.document.validate()?;
        record.touch();
        self.store
            .replace(&ctx.namespace(&self.name), record.clone())
            .await
    }

    /// Store a new document, generating its id when absent
    ///
    /// # Errors
    ///
    /// `Validation` for a non-string or empty id, `Conflict` when the id or
    /// a unique field value is taken.
    pub async fn post(&self, ctx: &RequestContext, mut doc: Document) -> Result<Record> {
        let generate = match doc.get(ID_FIELD) {
            None | Some(Value::Null) => true,
            Some(Value::String(id)) if !id.is_empty() => false,
            Some(_) => return Err(Error::validation("id must be a non-empty string")),
        };
        if generate {
            doc.set_id(&DocId::generate());
        }
        doc.validate()?;
        let record = Record::new(doc);
        self.store
            .insert(&ctx.namespace(&self.name), record.clone())
            .await?;
        debug!(collection = %self.name, id = ?record.id(), "posted document");
        Ok(record)
    }

    /// Replace every non-id field of an existing document
    pub async fn put(&self, ctx: &RequestContext, id: &str, mut doc: Document) -> Result<Record> {
        if let Some(given) = doc.get(ID_FIELD) {
            if given.as_str() != Some(id) {
                return Err(Error::validation("id is immutable"));
            }
        }
        let mut record = self.load(ctx, id).await?;
        doc.set_id(&DocId::new(id));
        record.document = doc;
        self.save(ctx, &mut record).await?;
        debug!(collection = %self.name, id = %id, version = record.version, "put document");
        Ok(record)
    }

    /// Apply a set/unset/remove/add delta to one document
    pub async fn patch(
        &self,
        ctx: &RequestContext,
        id: &str,
        request: &PatchRequest,
    ) -> Result<Record> {
        request.validate(id)?;
        let mut record = self.load(ctx, id).await?;
        patch::apply_patch(&mut record.document, request)?;
        self.save(ctx, &mut record).await?;
        debug!(collection = %self.name, id = %id, version = record.version, "patched document");
        Ok(record)
    }

    /// Remove a document, returning its prior value
    pub async fn delete(&self, ctx: &RequestContext, id: &str) -> Result<Record> {
        let record = self
            .store
            .remove(&ctx.namespace(&self.name), id)
            .await?
            .ok_or_else(|| Error::not_found(self.name.clone(), id))?;
        debug!(collection = %self.name, id = %id, "deleted document");
        Ok(record)
    }

    /// Full stored record, unprojected
    pub async fn get_record(&self, ctx: &RequestContext, id: &str) -> Result<Record> {
        self.load(ctx, id).await
    }

    /// One document through a projection
    pub async fn get_one(
        &self,
        ctx: &RequestContext,
        id: &str,
        projection: &Projection,
    ) -> Result<Document> {
        let record = self.load(ctx, id).await?;
        Ok(projection.apply(&record.document))
    }

    /// Matching documents in insertion order
    pub async fn get_all(&self, ctx: &RequestContext, options: &QueryOptions) -> Result<Vec<Document>> {
        let records = self
            .store
            .find(&ctx.namespace(&self.name), &options.filter)
            .await?;
        let limit = options.limit.unwrap_or(usize::MAX);
        Ok(records
            .iter()
            .skip(options.skip)
            .take(limit)
            .map(|r| options.projection.apply(&r.document))
            .collect())
    }

    /// Documents with the given ids; unknown ids are skipped
    pub async fn get_all_by_ids(
        &self,
        ctx: &RequestContext,
        ids: &[String],
        projection: &Projection,
    ) -> Result<Vec<Document>> {
        let records = self
            .store
            .find_by_ids(&ctx.namespace(&self.name), ids)
            .await?;
        Ok(records
            .iter()
            .map(|r| projection.apply(&r.document))
            .collect())
    }

    /// Number of matching documents
    pub async fn get_all_count(&self, ctx: &RequestContext, filter: &Filter) -> Result<usize> {
        self.store.count(&ctx.namespace(&self.name), filter).await
    }

    /// Overwrite the embedded copy of `values.id` in every document holding
    /// one under `selector`
    ///
    /// Returns the number of documents modified. The first store failure
    /// aborts; earlier documents stay updated.
    pub async fn update_many_references(
        &self,
        ctx: &RequestContext,
        selector: &FieldSelector,
        values: &Document,
    ) -> Result<usize> {
        let id = values
            .id()
            .ok_or_else(|| Error::validation("reference values need an id"))?;
        let ns = ctx.namespace(&self.name);
        let mut modified = 0;
        for mut record in self.store.find(&ns, &reference_filter(selector, id)).await? {
            if patch::update_reference(&mut record.document, selector, values) {
                self.save(ctx, &mut record).await?;
                modified += 1;
            }
        }
        debug!(
            collection = %self.name,
            field = %selector,
            id = %id,
            count = modified,
            "updated embedded references"
        );
        Ok(modified)
    }

    /// Drop the embedded copy of `values.id` from every document holding one
    /// under `selector`: scalar fields keep `{id}`, array fields lose the
    /// element
    pub async fn delete_many_references(
        &self,
        ctx: &RequestContext,
        selector: &FieldSelector,
        values: &Document,
    ) -> Result<usize> {
        let id = values
            .id()
            .ok_or_else(|| Error::validation("reference values need an id"))?;
        let ns = ctx.namespace(&self.name);
        let mut modified = 0;
        for mut record in self.store.find(&ns, &reference_filter(selector, id)).await? {
            if patch::delete_reference(&mut record.document, selector, id) {
                self.save(ctx, &mut record).await?;
                modified += 1;
            }
        }
        debug!(
            collection = %self.name,
            field = %selector,
            id = %id,
            count = modified,
            "deleted embedded references"
        );
        Ok(modified)
    }
}

/// `<field>.id == id`, or `id == id` for the root selector
fn reference_filter(selector: &FieldSelector, id: &str) -> Filter {
    let path = if selector.is_root() {
        FieldPath::root().key(ID_FIELD)
    } else {
        selector.path().clone().key(ID_FIELD)
    };
    Filter::new().and_eq(path, id)
}

#[async_trait]
impl EntityService for Collection {
    fn identity(&self) -> &str {
        &self.name
    }

    async fn get_all_by_ids(
        &self,
        ctx: &RequestContext,
        ids: &[String],
        projection: &Projection,
    ) -> Result<Vec<Document>> {
        Collection::get_all_by_ids(self, ctx, ids, projection).await
    }
}
