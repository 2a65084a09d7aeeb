//! The Executor - single entry point to Lyceum's services.
//!
//! The Executor routes each command to the named service and renders the
//! outcome as an [`Envelope`]. It also owns the composition root:
//! [`Executor::from_config`] builds every service, its reference
//! descriptors, and the subscriptions that keep embedded copies current.

use std::sync::Arc;

use lyceum_core::{Envelope, Error, Projection, RequestContext, Result, STATUS_CREATED, STATUS_OK};
use lyceum_engine::{
    Collection, EntityService, LyceumConfig, MemoryQueue, NotificationBroker, ReferenceDescriptor,
    ReferenceResolver, Subscriber, SubscriberRegistry,
};
use lyceum_storage::DocumentStore;
use rustc_hash::FxHashMap;
use tracing::{debug, info};

use crate::{Command, DocumentService, Output};

/// The command executor over a fixed set of services.
///
/// # Thread Safety
///
/// Executor is `Send + Sync`; services hold no per-request state.
///
/// # Example
///
/// ```
/// use lyceum_executor::{Command, Executor, LyceumConfig, MemoryStore, RequestContext, ServiceConfig};
/// use std::sync::Arc;
///
/// # tokio_test_block(async {
/// let config = LyceumConfig::default().with_service(ServiceConfig::new("schools"));
/// let executor = Executor::from_config(&config, Arc::new(MemoryStore::new())).unwrap();
/// let reply = executor.execute(&RequestContext::default(), Command::Ping).await;
/// assert_eq!(reply.status(), 200);
/// # });
/// # fn tokio_test_block<F: std::future::Future>(f: F) -> F::Output {
/// #     tokio::runtime::Runtime::new().unwrap().block_on(f)
/// # }
/// ```
#[derive(Debug, Default)]
pub struct Executor {
    services: FxHashMap<String, Arc<DocumentService>>,
    queue: Option<Arc<MemoryQueue>>,
}

impl Executor {
    /// Executor with no services.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a service under its name, replacing any previous one.
    pub fn register(&mut self, service: Arc<DocumentService>) {
        info!(service = %service.name(), "registered service");
        self.services.insert(service.name().to_string(), service);
    }

    /// Build every configured service over `store`.
    ///
    /// Unique fields are declared on the store, reference owners are
    /// resolved by name, and each dependent service's sync processor is
    /// subscribed to every owner it embeds from.
    ///
    /// # Errors
    ///
    /// `Validation` when the config is inconsistent.
    pub fn from_config(config: &LyceumConfig, store: Arc<dyn DocumentStore>) -> Result<Self> {
        config.validate()?;
        let default_projection = config.default_projection();
        let resolver = ReferenceResolver::new(config.fill_references, default_projection.clone());
        let queue = config.queue.enabled.then(|| {
            Arc::new(MemoryQueue::new(
                config.queue.max_redeliveries,
                default_projection.clone(),
            ))
        });

        let mut collections: FxHashMap<&str, Arc<Collection>> = FxHashMap::default();
        for service in &config.services {
            store.ensure_unique(&service.name, &service.unique_fields)?;
            collections.insert(
                service.name.as_str(),
                Arc::new(Collection::new(service.name.clone(), store.clone())),
            );
        }

        let mut executor = Executor {
            services: FxHashMap::default(),
            queue: queue.clone(),
        };
        for service in &config.services {
            let mut descriptors = Vec::with_capacity(service.references.len());
            for reference in &service.references {
                let owner: Arc<dyn EntityService> = collections
                    .get(reference.owner.as_str())
                    .cloned()
                    .ok_or_else(|| Error::not_found("services", reference.owner.clone()))?;
                let mut descriptor = ReferenceDescriptor::new(&reference.field, owner)?;
                if let Some(projection) = reference.projection() {
                    descriptor = descriptor.with_projection(projection);
                }
                descriptors.push(descriptor);
            }

            let mut broker = NotificationBroker::new(
                service.name.clone(),
                Arc::new(SubscriberRegistry::new()),
                default_projection.clone(),
            );
            if let Some(queue) = &queue {
                broker = broker.with_channel(queue.clone());
            }
            let collection = collections
                .get(service.name.as_str())
                .map(|c| c.as_ref().clone())
                .ok_or_else(|| Error::not_found("services", service.name.clone()))?;
            executor.register(Arc::new(DocumentService::new(
                collection,
                resolver.clone(),
                descriptors,
                broker,
            )));
        }

        for dependent in executor.services.values() {
            let sync = dependent.sync_processor();
            for owner in sync.owners() {
                let Some(owner_service) = executor.services.get(owner) else {
                    continue;
                };
                owner_service.broker().subscribe(
                    Subscriber::new(
                        format!("{}-references", dependent.name()),
                        Arc::new(sync.clone()),
                    )
                    .with_projection(sync.projection_for(owner)),
                );
            }
        }
        Ok(executor)
    }

    /// Service registered under `name`.
    pub fn service(&self, name: &str) -> Option<&Arc<DocumentService>> {
        self.services.get(name)
    }

    /// Registered service names, sorted.
    pub fn service_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.services.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// The notification queue, when enabled in config.
    pub fn queue(&self) -> Option<&Arc<MemoryQueue>> {
        self.queue.as_ref()
    }

    fn resolve(&self, name: &str) -> Result<&Arc<DocumentService>> {
        self.services
            .get(name)
            .ok_or_else(|| Error::not_found("services", name))
    }

    /// Execute a single command.
    ///
    /// Never fails: errors are rendered into the envelope.
    pub async fn execute(&self, ctx: &RequestContext, cmd: Command) -> Envelope<Output> {
        debug!(command = cmd.name(), service = ?cmd.service(), tenant = %ctx.tenant, "executing");
        let status = match cmd {
            Command::Post { .. } => STATUS_CREATED,
            _ => STATUS_OK,
        };
        Envelope::from_result(self.dispatch(ctx, cmd).await, status)
    }

    /// Execute commands in order, one envelope per command.
    pub async fn execute_many(&self, ctx: &RequestContext, cmds: Vec<Command>) -> Vec<Envelope<Output>> {
        let mut results = Vec::with_capacity(cmds.len());
        for cmd in cmds {
            results.push(self.execute(ctx, cmd).await);
        }
        results
    }

    async fn dispatch(&self, ctx: &RequestContext, cmd: Command) -> Result<Output> {
        match cmd {
            Command::Ping => Ok(Output::Pong {
                version: env!("CARGO_PKG_VERSION").to_string(),
            }),
            Command::Post { service, document } => self
                .resolve(&service)?
                .post(ctx, document)
                .await
                .map(Output::Record),
            Command::Put {
                service,
                id,
                document,
            } => self
                .resolve(&service)?
                .put(ctx, &id, document)
                .await
                .map(Output::Record),
            Command::Patch { service, id, patch } => self
                .resolve(&service)?
                .patch(ctx, &id, &patch)
                .await
                .map(Output::Record),
            Command::Delete {
                service,
                id,
                projection,
            } => {
                let projection = projection.unwrap_or_else(Projection::all);
                self.resolve(&service)?
                    .delete(ctx, &id, &projection)
                    .await
                    .map(Output::Record)
            }
            Command::GetOne {
                service,
                id,
                projection,
                populate,
            } => {
                let projection = projection.unwrap_or_else(Projection::all);
                self.resolve(&service)?
                    .get_one(ctx, &id, &projection, populate)
                    .await
                    .map(Output::Document)
            }
            Command::GetAll {
                service,
                options,
                populate,
            } => self
                .resolve(&service)?
                .get_all(ctx, &options, populate)
                .await
                .map(Output::Documents),
            Command::GetAllByIds {
                service,
                ids,
                projection,
                populate,
            } => {
                let projection = projection.unwrap_or_else(Projection::all);
                self.resolve(&service)?
                    .get_all_by_ids(ctx, &ids, &projection, populate)
                    .await
                    .map(Output::Documents)
            }
            Command::GetAllCount { service, filter } => self
                .resolve(&service)?
                .get_all_count(ctx, &filter)
                .await
                .map(|n| Output::Count(n as u64)),
            Command::Notification { service, payload } => self
                .resolve(&service)?
                .notification(ctx, payload)
                .await
                .map(|processed| Output::Processed { processed }),
        }
    }
}
