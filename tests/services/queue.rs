//! Out-of-process delivery through the in-memory queue.

use crate::common::*;
use lyceum::{NotificationChannel, NotificationKind, Projection, Subscriber};
use serde_json::json;
use std::sync::Arc;

fn queued_executor(max_redeliveries: u32) -> lyceum::Executor {
    let mut config = school_config();
    config.queue.enabled = true;
    config.queue.max_redeliveries = max_redeliveries;
    create_executor_with(config)
}

#[tokio::test]
async fn consumers_receive_after_drain() {
    let executor = queued_executor(3);
    let consumer = Arc::new(Recorder::default());
    executor
        .service("schools")
        .unwrap()
        .broker()
        .consume(
            Subscriber::new("search-index", consumer.clone())
                .with_projection(Projection::fields(["name", "city"])),
        )
        .await
        .unwrap();

    post(&executor, "schools", json!({"id": "s1", "name": "North", "city": "Oslo", "code": "N"})).await;
    post(&executor, "teachers", json!({"id": "t1", "name": "Berg"})).await;
    assert!(consumer.seen.lock().is_empty());

    let queue = executor.queue().unwrap();
    assert_eq!(queue.pending(), 2);
    assert_eq!(queue.drain().await, 2);

    let seen = consumer.seen.lock();
    assert_eq!(seen.len(), 2);
    assert_eq!(
        seen[0].entities(NotificationKind::Added)[0].clone().into_value(),
        json!({"id": "s1", "name": "North", "city": "Oslo"})
    );
    assert_eq!(seen[1].service_name, "teachers");
}

#[tokio::test]
async fn failing_consumer_is_dropped_after_redeliveries() {
    let executor = queued_executor(2);
    let queue = executor.queue().unwrap().clone();
    let healthy = Arc::new(Recorder::default());
    queue
        .register(Subscriber::new("failing", Arc::new(Failing)))
        .await
        .unwrap();
    queue
        .register(Subscriber::new("panicking", Arc::new(Panicking)))
        .await
        .unwrap();
    queue
        .register(Subscriber::new("healthy", healthy.clone()))
        .await
        .unwrap();
    assert_eq!(queue.consumer_count(), 3);

    post(&executor, "schools", json!({"id": "s1", "name": "North"})).await;
    assert_eq!(queue.drain().await, 1);
    assert_eq!(healthy.seen.lock().len(), 1);
    assert_eq!(queue.pending(), 0);
}

#[tokio::test]
async fn consume_without_queue_is_a_config_error() {
    let executor = create_executor();
    let err = executor
        .service("schools")
        .unwrap()
        .broker()
        .consume(Subscriber::new("x", Arc::new(Recorder::default())))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), lyceum::ErrorKind::Config);
}
