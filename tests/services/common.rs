//! Common test utilities for service tests

#![allow(dead_code)]

use async_trait::async_trait;
use lyceum::{
    Command, Document, EntityService, Executor, LyceumConfig, MemoryStore, Notification,
    NotificationHandler, Output, Projection, RequestContext, Result, ServiceConfig,
};
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::{Arc, Once};

static INIT_TRACING: Once = Once::new();

/// Route engine logs to the test harness
pub fn init_tracing() {
    INIT_TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_max_level(tracing::Level::DEBUG)
            .try_init();
    });
}

/// schools and teachers own entities; classes embeds both
pub fn school_config() -> LyceumConfig {
    LyceumConfig::default()
        .with_service(ServiceConfig::new("schools").with_unique("code"))
        .with_service(ServiceConfig::new("teachers"))
        .with_service(
            ServiceConfig::new("classes")
                .with_reference("school", "schools")
                .with_reference("teachers[]", "teachers"),
        )
}

pub fn create_executor() -> Executor {
    create_executor_with(school_config())
}

pub fn create_executor_with(config: LyceumConfig) -> Executor {
    init_tracing();
    Executor::from_config(&config, Arc::new(MemoryStore::new())).unwrap()
}

pub fn ctx() -> RequestContext {
    RequestContext::new("school-a")
}

pub fn doc(v: Value) -> Document {
    Document::from_value(v).unwrap()
}

/// Post `v` to `service`, returning the stored document
pub async fn post(executor: &Executor, service: &str, v: Value) -> Value {
    let reply = executor
        .execute(
            &ctx(),
            Command::Post {
                service: service.into(),
                document: doc(v),
            },
        )
        .await;
    assert_eq!(reply.status(), 201, "{:?}", reply);
    stored(reply.into_value())
}

/// Read one document without populating
pub async fn get(executor: &Executor, service: &str, id: &str) -> Value {
    let reply = executor
        .execute(
            &ctx(),
            Command::GetOne {
                service: service.into(),
                id: id.into(),
                projection: None,
                populate: false,
            },
        )
        .await;
    assert_eq!(reply.status(), 200, "{:?}", reply);
    stored(reply.into_value())
}

/// Stored version of a document
pub async fn version(executor: &Executor, service: &str, id: &str) -> u64 {
    executor
        .service(service)
        .unwrap()
        .collection()
        .get_record(&ctx(), id)
        .await
        .unwrap()
        .version
}

fn stored(output: Option<Output>) -> Value {
    output
        .and_then(|o| o.document().cloned())
        .unwrap()
        .into_value()
}

/// Records every notification it receives
#[derive(Default)]
pub struct Recorder {
    pub seen: Mutex<Vec<Notification>>,
}

#[async_trait]
impl NotificationHandler for Recorder {
    async fn handle(&self, _ctx: &RequestContext, notification: &Notification) -> Result<()> {
        self.seen.lock().push(notification.clone());
        Ok(())
    }
}

/// Always fails
pub struct Failing;

#[async_trait]
impl NotificationHandler for Failing {
    async fn handle(&self, _ctx: &RequestContext, _n: &Notification) -> Result<()> {
        Err(lyceum::Error::store("subscriber store is down"))
    }
}

/// Always panics
pub struct Panicking;

#[async_trait]
impl NotificationHandler for Panicking {
    async fn handle(&self, _ctx: &RequestContext, _n: &Notification) -> Result<()> {
        panic!("subscriber callback threw");
    }
}

/// Owner that serves fixed entities and counts fetches
pub struct CountingOwner {
    pub identity: String,
    pub entities: Vec<Document>,
    pub calls: Mutex<Vec<Vec<String>>>,
}

impl CountingOwner {
    pub fn new(identity: &str, entities: Vec<Value>) -> Arc<Self> {
        Arc::new(CountingOwner {
            identity: identity.to_string(),
            entities: entities.into_iter().map(doc).collect(),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl EntityService for CountingOwner {
    fn identity(&self) -> &str {
        &self.identity
    }

    async fn get_all_by_ids(
        &self,
        _ctx: &RequestContext,
        ids: &[String],
        projection: &Projection,
    ) -> Result<Vec<Document>> {
        self.calls.lock().push(ids.to_vec());
        Ok(self
            .entities
            .iter()
            .filter(|e| e.id().map_or(false, |id| ids.iter().any(|i| i == id)))
            .map(|e| projection.apply(e))
            .collect())
    }
}
