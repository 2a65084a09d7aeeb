//! Notification Broker
//!
//! Fan-out of change events from one owning service:
//!
//! - in-process subscribers registered in a [`SubscriberRegistry`], invoked
//!   sequentially, each with its own projection of the entities
//! - an optional [`NotificationChannel`] for out-of-process consumers
//!
//! A subscriber that fails or panics is logged and skipped. Neither a
//! subscriber nor the channel can fail `raise_notification`.

use async_trait::async_trait;
use futures_util::FutureExt;
use lyceum_core::{
    Document, Error, Notification, NotificationKind, Projection, RequestContext, Result,
};
use parking_lot::RwLock;
use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Receives notifications
#[async_trait]
pub trait NotificationHandler: Send + Sync {
    /// Handle one delivery
    async fn handle(&self, ctx: &RequestContext, notification: &Notification) -> Result<()>;
}

/// A named handler plus the projection its payloads are cut to
#[derive(Clone)]
pub struct Subscriber {
    name: String,
    handler: Arc<dyn NotificationHandler>,
    projection: Option<Projection>,
}

impl fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscriber")
            .field("name", &self.name)
            .field("projection", &self.projection)
            .finish()
    }
}

impl Subscriber {
    /// Subscriber using the broker's default projection
    pub fn new(name: impl Into<String>, handler: Arc<dyn NotificationHandler>) -> Self {
        Subscriber {
            name: name.into(),
            handler,
            projection: None,
        }
    }

    /// Cut payloads to `projection`
    pub fn with_projection(mut self, projection: Projection) -> Self {
        self.projection = Some(projection);
        self
    }

    /// Subscriber name, used in logs
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared projection
    pub fn projection(&self) -> Option<&Projection> {
        self.projection.as_ref()
    }

    /// `notification` with every entity cut to this subscriber's projection
    pub fn project(&self, notification: &Notification, default: &Projection) -> Notification {
        let projection = self.projection.as_ref().unwrap_or(default);
        notification.map_entities(|entity| projection.apply(entity))
    }

    /// Invoke the handler, isolating errors and panics
    ///
    /// Returns whether the delivery succeeded.
    pub async fn deliver(&self, ctx: &RequestContext, notification: &Notification) -> bool {
        let outcome = AssertUnwindSafe(self.handler.handle(ctx, notification))
            .catch_unwind()
            .await;
        match outcome {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                let err = Error::Subscriber {
                    subscriber: self.name.clone(),
                    reason: e.to_string(),
                };
                warn!(service = %notification.service_name, error = %err, "subscriber failed");
                false
            }
            Err(panic) => {
                error!(
                    service = %notification.service_name,
                    subscriber = %self.name,
                    "subscriber panicked: {}",
                    panic_message(&*panic)
                );
                false
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("(non-string panic)")
}

/// In-process subscriber list with process lifetime
///
/// Owned by the composition root and injected into brokers. There is no
/// unsubscribe.
#[derive(Debug, Default)]
pub struct SubscriberRegistry {
    subscribers: RwLock<Vec<Arc<Subscriber>>>,
}

impl SubscriberRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber
    pub fn subscribe(&self, subscriber: Subscriber) {
        self.subscribers.write().push(Arc::new(subscriber));
    }

    /// Current subscribers in registration order
    pub fn snapshot(&self) -> Vec<Arc<Subscriber>> {
        self.subscribers.read().clone()
    }

    /// Number of subscribers
    pub fn len(&self) -> usize {
        self.subscribers.read().len()
    }

    /// True when nobody is subscribed
    pub fn is_empty(&self) -> bool {
        self.subscribers.read().is_empty()
    }
}

/// Asynchronous delivery channel for out-of-process consumers
///
/// The channel owns buffering and redelivery; the broker only publishes
/// and registers.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    /// Enqueue one notification
    async fn publish(&self, ctx: &RequestContext, notification: &Notification) -> Result<()>;

    /// Register a consumer; it receives one notification per delivery
    async fn register(&self, consumer: Subscriber) -> Result<()>;
}

/// Publishes one owning service's change events
#[derive(Clone)]
pub struct NotificationBroker {
    service: String,
    registry: Arc<SubscriberRegistry>,
    channel: Option<Arc<dyn NotificationChannel>>,
    default_projection: Projection,
}

impl fmt::Debug for NotificationBroker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationBroker")
            .field("service", &self.service)
            .field("subscribers", &self.registry.len())
            .field("channel", &self.channel.is_some())
            .finish()
    }
}

impl NotificationBroker {
    /// Broker for `service` over an injected registry
    pub fn new(
        service: impl Into<String>,
        registry: Arc<SubscriberRegistry>,
        default_projection: Projection,
    ) -> Self {
        NotificationBroker {
            service: service.into(),
            registry,
            channel: None,
            default_projection,
        }
    }

    /// Also publish to an asynchronous channel
    pub fn with_channel(mut self, channel: Arc<dyn NotificationChannel>) -> Self {
        self.channel = Some(channel);
        self
    }

    /// Owning service identity
    pub fn service(&self) -> &str {
        &self.service
    }

    /// Registry of in-process subscribers
    pub fn registry(&self) -> &Arc<SubscriberRegistry> {
        &self.registry
    }

    /// Register an in-process subscriber for the life of the process
    pub fn subscribe(&self, subscriber: Subscriber) {
        debug!(service = %self.service, subscriber = %subscriber.name(), "subscribed");
        self.registry.subscribe(subscriber);
    }

    /// Register a consumer on the asynchronous channel
    ///
    /// # Errors
    ///
    /// `Config` when no channel is configured; otherwise whatever the
    /// channel reports.
    pub async fn consume(&self, consumer: Subscriber) -> Result<()> {
        let Some(channel) = &self.channel else {
            return Err(Error::config(format!(
                "service '{}' has no notification channel",
                self.service
            )));
        };
        channel.register(consumer).await
    }

    /// Deliver `entities` to every subscriber, then publish to the channel
    ///
    /// Each subscriber receives a payload cut to its own projection.
    /// Always succeeds; returns the number of successful in-process
    /// deliveries.
    pub async fn raise_notification(
        &self,
        ctx: &RequestContext,
        kind: NotificationKind,
        entities: &[Document],
    ) -> Result<usize> {
        let notification = Notification::new(self.service.clone(), kind, entities.to_vec());
        let subscribers = self.registry.snapshot();

        let mut delivered = 0;
        for subscriber in &subscribers {
            let payload = subscriber.project(&notification, &self.default_projection);
            if subscriber.deliver(ctx, &payload).await {
                delivered += 1;
            }
        }
        debug!(
            service = %self.service,
            kind = %kind,
            entities = entities.len(),
            subscribers = subscribers.len(),
            delivered,
            "raised notification"
        );

        if let Some(channel) = &self.channel {
            if let Err(e) = channel.publish(ctx, &notification).await {
                error!(service = %self.service, kind = %kind, error = %e, "failed to publish notification");
            }
        }
        Ok(delivered)
    }
}
