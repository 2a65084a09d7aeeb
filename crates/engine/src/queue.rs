//! In-memory notification queue
//!
//! A [`NotificationChannel`] that buffers published notifications on a
//! tokio mpsc channel until [`MemoryQueue::drain`] delivers them. Every
//! registered consumer receives every message, cut to its projection. A
//! failing consumer is retried up to `max_redeliveries` times, then the
//! delivery is dropped and logged.

use crate::notifications::{NotificationChannel, Subscriber};
use async_trait::async_trait;
use lyceum_core::{Error, Notification, Projection, RequestContext, Result};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error};

/// Redelivery attempts after the first failed delivery
pub const DEFAULT_MAX_REDELIVERIES: u32 = 3;

#[derive(Debug)]
struct Message {
    ctx: RequestContext,
    notification: Notification,
}

/// Buffered channel with at-least-once delivery to registered consumers
#[derive(Debug)]
pub struct MemoryQueue {
    sender: mpsc::UnboundedSender<Message>,
    receiver: Mutex<mpsc::UnboundedReceiver<Message>>,
    consumers: RwLock<Vec<Subscriber>>,
    pending: AtomicUsize,
    max_redeliveries: u32,
    default_projection: Projection,
}

impl Default for MemoryQueue {
    fn default() -> Self {
        MemoryQueue::new(DEFAULT_MAX_REDELIVERIES, Projection::fields(["id", "name"]))
    }
}

impl MemoryQueue {
    /// Queue retrying failed deliveries `max_redeliveries` times
    pub fn new(max_redeliveries: u32, default_projection: Projection) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        MemoryQueue {
            sender,
            receiver: Mutex::new(receiver),
            consumers: RwLock::new(Vec::new()),
            pending: AtomicUsize::new(0),
            max_redeliveries,
            default_projection,
        }
    }

    /// Messages published and not yet drained
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    /// Number of registered consumers
    pub fn consumer_count(&self) -> usize {
        self.consumers.read().len()
    }

    /// Deliver every buffered message to every consumer
    ///
    /// Messages published while draining are delivered in the same call.
    /// Returns the number of successful deliveries.
    pub async fn drain(&self) -> usize {
        let mut receiver = self.receiver.lock().await;
        let mut delivered = 0;
        while let Ok(message) = receiver.try_recv() {
            self.pending.fetch_sub(1, Ordering::AcqRel);
            let consumers = self.consumers.read().clone();
            for consumer in &consumers {
                if self.deliver_with_retry(consumer, &message).await {
                    delivered += 1;
                }
            }
        }
        delivered
    }

    async fn deliver_with_retry(&self, consumer: &Subscriber, message: &Message) -> bool {
        let payload = consumer.project(&message.notification, &self.default_projection);
        let mut attempt = 0;
        loop {
            if consumer.deliver(&message.ctx, &payload).await {
                return true;
            }
            if attempt >= self.max_redeliveries {
                error!(
                    consumer = %consumer.name(),
                    service = %payload.service_name,
                    attempts = attempt + 1,
                    "dropping notification after failed redeliveries"
                );
                return false;
            }
            attempt += 1;
            debug!(consumer = %consumer.name(), attempt, "redelivering notification");
        }
    }
}

#[async_trait]
impl NotificationChannel for MemoryQueue {
    async fn publish(&self, ctx: &RequestContext, notification: &Notification) -> Result<()> {
        // Counted before the send: a concurrent drain may receive the
        // message at once, and its decrement must never underflow.
        self.pending.fetch_add(1, Ordering::AcqRel);
        let message = Message {
            ctx: ctx.clone(),
            notification: notification.clone(),
        };
        if self.sender.send(message).is_err() {
            self.pending.fetch_sub(1, Ordering::AcqRel);
            return Err(Error::store("notification queue is closed"));
        }
        Ok(())
    }

    async fn register(&self, consumer: Subscriber) -> Result<()> {
        debug!(consumer = %consumer.name(), "registered queue consumer");
        self.consumers.write().push(consumer);
        Ok(())
    }
}
