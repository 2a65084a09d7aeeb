//! Reference Resolver
//!
//! Expands reference fields (bare id, embedded object, or arrays of
//! either) into denormalized copies fetched from the owning service.
//!
//! # Batching
//!
//! `populate_references` issues at most one owner fetch per descriptor,
//! covering the deduplicated ids of every document in the batch. Nothing is
//! fetched when filling is disabled, the batch is empty, or a descriptor
//! collects no ids.
//!
//! # Partial resolution
//!
//! Ids the owner does not return are a normal condition, logged at `warn`:
//!
//! | Shape | Resolved | Not resolved |
//! |-------|----------|--------------|
//! | `"id"` | becomes the entity | left as is |
//! | `{id, ..}` | entity fields merged in, `id` kept | left as is |
//! | `["id", ..]` element | becomes the entity | dropped |
//! | `[{id, ..}, ..]` element | merged | left as is |
//!
//! Array elements that are not references (numbers, booleans, null) are
//! dropped when an array is rebuilt.

use async_trait::async_trait;
use lyceum_core::{
    get_at_path, get_at_path_mut, Document, FieldSelector, Projection, Reference, RequestContext,
    Result, ID_FIELD,
};
use rustc_hash::FxHashMap;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// A service that owns entities other services embed
#[async_trait]
pub trait EntityService: Send + Sync {
    /// Name notifications from this service carry in `serviceName`
    fn identity(&self) -> &str;

    /// Fetch entities by id through a projection; unknown ids are skipped
    async fn get_all_by_ids(
        &self,
        ctx: &RequestContext,
        ids: &[String],
        projection: &Projection,
    ) -> Result<Vec<Document>>;
}

/// Declares that a field holds references owned by another service
#[derive(Clone)]
pub struct ReferenceDescriptor {
    selector: FieldSelector,
    owner: Arc<dyn EntityService>,
    projection: Option<Projection>,
}

impl fmt::Debug for ReferenceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReferenceDescriptor")
            .field("field", &self.selector.to_string())
            .field("owner", &self.owner.identity())
            .field("projection", &self.projection)
            .finish()
    }
}

impl ReferenceDescriptor {
    /// Descriptor for `field` (`"school"`, `"schools[]"`, or `""`)
    pub fn new(field: &str, owner: Arc<dyn EntityService>) -> Result<Self> {
        Ok(ReferenceDescriptor {
            selector: field.parse()?,
            owner,
            projection: None,
        })
    }

    /// Override the default projection
    pub fn with_projection(mut self, projection: Projection) -> Self {
        self.projection = Some(projection);
        self
    }

    /// Selected field
    pub fn selector(&self) -> &FieldSelector {
        &self.selector
    }

    /// Owning service
    pub fn owner(&self) -> &Arc<dyn EntityService> {
        &self.owner
    }

    /// Owning service identity
    pub fn owner_identity(&self) -> &str {
        self.owner.identity()
    }

    /// Declared projection, if any
    pub fn projection(&self) -> Option<&Projection> {
        self.projection.as_ref()
    }

    /// Declared projection, or `default` when none is declared
    pub fn projection_or<'a>(&'a self, default: &'a Projection) -> &'a Projection {
        self.projection.as_ref().unwrap_or(default)
    }
}

/// Resolves reference descriptors against owning services
#[derive(Debug, Clone)]
pub struct ReferenceResolver {
    fill_references: bool,
    default_projection: Projection,
}

impl Default for ReferenceResolver {
    fn default() -> Self {
        ReferenceResolver::new(true, Projection::fields(["id", "name"]))
    }
}

impl ReferenceResolver {
    /// Resolver with a master switch and the projection used for
    /// descriptors that declare none
    pub fn new(fill_references: bool, default_projection: Projection) -> Self {
        ReferenceResolver {
            fill_references,
            default_projection,
        }
    }

    /// Whether reference filling is enabled
    pub fn fill_references(&self) -> bool {
        self.fill_references
    }

    /// Projection used when a descriptor declares none
    pub fn default_projection(&self) -> &Projection {
        &self.default_projection
    }

    /// Ids named by one document's reference field
    pub fn collect_ids(doc: &Document, selector: &FieldSelector) -> BTreeSet<String> {
        let mut ids = BTreeSet::new();
        if selector.is_root() {
            if let Some(id) = doc.id() {
                ids.insert(id.to_string());
            }
            return ids;
        }
        if let Some(reference) =
            get_at_path(doc.as_map(), selector.path()).and_then(Reference::from_value)
        {
            reference.collect_ids(&mut ids);
        }
        ids
    }

    /// Substitute resolved entities into one document's reference field
    ///
    /// Returns the number of references left unresolved.
    pub fn populate(
        doc: &mut Document,
        selector: &FieldSelector,
        entities: &FxHashMap<String, Document>,
    ) -> usize {
        let mut unresolved = 0;
        if selector.is_root() {
            match doc.id().and_then(|id| entities.get(id)) {
                Some(entity) => merge_entity(doc, entity),
                None => unresolved += 1,
            }
            return unresolved;
        }
        let Some(value) = get_at_path_mut(doc.as_map_mut(), selector.path()) else {
            return 0;
        };
        let Some(reference) = Reference::from_value(value) else {
            return 0;
        };
        if let Some(resolved) = resolve(reference, entities, false, &mut unresolved) {
            *value = resolved.into_value();
        }
        unresolved
    }

    /// Fill every descriptor's references across a batch of documents
    ///
    /// Returns `Ok(false)` when nothing was fetched. The first owner
    /// failure aborts the call and is returned unchanged; documents
    /// populated by earlier descriptors stay populated.
    pub async fn populate_references(
        &self,
        ctx: &RequestContext,
        docs: &mut [Document],
        descriptors: &[ReferenceDescriptor],
    ) -> Result<bool> {
        if !self.fill_references {
            debug!("reference filling disabled");
            return Ok(false);
        }
        if docs.is_empty() {
            return Ok(false);
        }

        let mut fetched = false;
        for descriptor in descriptors {
            let selector = descriptor.selector();
            let ids: BTreeSet<String> = docs
                .iter()
                .flat_map(|doc| Self::collect_ids(doc, selector))
                .collect();
            if ids.is_empty() {
                debug!(field = %selector, "no references to resolve");
                continue;
            }

            let ids: Vec<String> = ids.into_iter().collect();
            let projection = descriptor.projection_or(&self.default_projection);
            let entities = descriptor
                .owner()
                .get_all_by_ids(ctx, &ids, projection)
                .await?;
            fetched = true;

            let by_id: FxHashMap<String, Document> = entities
                .into_iter()
                .filter_map(|entity| entity.id().map(str::to_string).map(|id| (id, entity)))
                .collect();
            let mut unresolved = 0;
            for doc in docs.iter_mut() {
                unresolved += Self::populate(doc, selector, &by_id);
            }
            if unresolved > 0 {
                warn!(
                    owner = %descriptor.owner_identity(),
                    field = %selector,
                    requested = ids.len(),
                    found = by_id.len(),
                    unresolved,
                    "not all references were resolved"
                );
            }
            debug!(
                owner = %descriptor.owner_identity(),
                field = %selector,
                count = by_id.len(),
                "populated references"
            );
        }
        Ok(fetched)
    }
}

fn resolve(
    reference: Reference,
    entities: &FxHashMap<String, Document>,
    in_list: bool,
    unresolved: &mut usize,
) -> Option<Reference> {
    match reference {
        Reference::Id(id) => match entities.get(&id) {
            Some(entity) => Some(Reference::Entity(entity.clone())),
            None => {
                *unresolved += 1;
                (!in_list).then_some(Reference::Id(id))
            }
        },
        Reference::Entity(mut embedded) => {
            match embedded.id().and_then(|id| entities.get(id)) {
                Some(entity) => merge_entity(&mut embedded, entity),
                None => *unresolved += 1,
            }
            Some(Reference::Entity(embedded))
        }
        Reference::List(items) => Some(Reference::List(
            items
                .into_iter()
                .filter_map(|item| resolve(item, entities, true, unresolved))
                .collect(),
        )),
    }
}

/// Overwrite `target`'s fields with the entity's, keeping `target.id`
fn merge_entity(target: &mut Document, entity: &Document) {
    for (key, value) in entity.iter() {
        if key == ID_FIELD {
            continue;
        }
        target.insert(key.clone(), value.clone());
    }
}
