//! Common test utilities for patch tests

#![allow(dead_code)]

use lyceum::{
    Command, Document, Envelope, Executor, LyceumConfig, MemoryStore, Output, PatchRequest,
    RequestContext, ServiceConfig,
};
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

/// Executor with a single `users` service
pub fn create_executor() -> Executor {
    init_tracing();
    let config = LyceumConfig::default().with_service(ServiceConfig::new("users"));
    Executor::from_config(&config, Arc::new(MemoryStore::new())).unwrap()
}

pub fn ctx() -> RequestContext {
    RequestContext::new("school-a")
}

pub fn doc(v: Value) -> Document {
    Document::from_value(v).unwrap()
}

/// Store `v` in `users`
pub async fn seed(executor: &Executor, v: Value) {
    let reply = executor
        .execute(
            &ctx(),
            Command::Post {
                service: "users".into(),
                document: doc(v),
            },
        )
        .await;
    assert_eq!(reply.status(), 201, "{:?}", reply);
}

/// Send a patch, returning the raw envelope
pub async fn patch(executor: &Executor, id: &str, request: Value) -> Envelope<Output> {
    let patch: PatchRequest = serde_json::from_value(request).unwrap();
    executor
        .execute(
            &ctx(),
            Command::Patch {
                service: "users".into(),
                id: id.into(),
                patch,
            },
        )
        .await
}

/// Send a patch that must succeed, returning the stored document
pub async fn patched(executor: &Executor, id: &str, request: Value) -> Value {
    let reply = patch(executor, id, request).await;
    assert_eq!(reply.status(), 200, "{:?}", reply);
    reply
        .into_value()
        .and_then(|o| o.document().cloned())
        .unwrap()
        .into_value()
}

/// Stored version of a user
pub async fn version(executor: &Executor, id: &str) -> u64 {
    executor
        .service("users")
        .unwrap()
        .collection()
        .get_record(&ctx(), id)
        .await
        .unwrap()
        .version
}
