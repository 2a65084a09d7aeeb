//! Notification fan-out from service writes.

use crate::common::*;
use lyceum::{Command, NotificationKind, Projection, Subscriber};
use serde_json::json;
use std::sync::Arc;

#[tokio::test]
async fn writes_raise_added_modified_removed() {
    let executor = create_executor();
    let recorder = Arc::new(Recorder::default());
    executor
        .service("schools")
        .unwrap()
        .broker()
        .subscribe(Subscriber::new("audit", recorder.clone()));

    post(&executor, "schools", json!({"id": "s1", "name": "North", "city": "Oslo"})).await;
    let reply = executor
        .execute(
            &ctx(),
            Command::Put {
                service: "schools".into(),
                id: "s1".into(),
                document: doc(json!({"name": "North High"})),
            },
        )
        .await;
    assert_eq!(reply.status(), 200);
    let reply = executor
        .execute(
            &ctx(),
            Command::Delete {
                service: "schools".into(),
                id: "s1".into(),
                projection: None,
            },
        )
        .await;
    assert_eq!(reply.status(), 200);

    let seen = recorder.seen.lock();
    let kinds: Vec<Vec<NotificationKind>> = seen.iter().map(|n| n.kinds()).collect();
    assert_eq!(
        kinds,
        vec![
            vec![NotificationKind::Added],
            vec![NotificationKind::Modified],
            vec![NotificationKind::Removed],
        ]
    );
    assert!(seen.iter().all(|n| n.service_name == "schools"));
    // default subscriber projection is id + name
    assert_eq!(
        serde_json::to_value(&seen[0]).unwrap(),
        json!({"serviceName": "schools", "added": [{"id": "s1", "name": "North"}]})
    );
}

#[tokio::test]
async fn failing_subscribers_do_not_fail_the_write_or_block_others() {
    let executor = create_executor();
    let broker = executor.service("schools").unwrap().broker();
    let recorder = Arc::new(Recorder::default());
    broker.subscribe(Subscriber::new("failing", Arc::new(Failing)));
    broker.subscribe(Subscriber::new("panicking", Arc::new(Panicking)));
    broker.subscribe(
        Subscriber::new("cities", recorder.clone()).with_projection(Projection::fields(["city"])),
    );

    post(&executor, "schools", json!({"id": "s1", "name": "North", "city": "Oslo"})).await;

    let seen = recorder.seen.lock();
    assert_eq!(seen.len(), 1);
    assert_eq!(
        seen[0].entities(NotificationKind::Added)[0].clone().into_value(),
        json!({"id": "s1", "city": "Oslo"})
    );
}

#[tokio::test]
async fn failed_writes_raise_nothing() {
    let executor = create_executor();
    let recorder = Arc::new(Recorder::default());
    executor
        .service("schools")
        .unwrap()
        .broker()
        .subscribe(Subscriber::new("audit", recorder.clone()));

    post(&executor, "schools", json!({"id": "s1", "code": "N"})).await;
    let duplicate = executor
        .execute(
            &ctx(),
            Command::Post {
                service: "schools".into(),
                document: doc(json!({"id": "s2", "code": "N"})),
            },
        )
        .await;
    assert_eq!(duplicate.status(), 409);
    assert_eq!(recorder.seen.lock().len(), 1);
}
