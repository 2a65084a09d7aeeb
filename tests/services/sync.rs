//! Embedded copies follow their owners.

use crate::common::*;
use lyceum::{Command, Output, PatchRequest};
use serde_json::{json, Value};

async fn seed_school_and_classes(executor: &lyceum::Executor) {
    post(executor, "schools", json!({"id": "s1", "name": "North"})).await;
    post(executor, "teachers", json!({"id": "t1", "name": "Berg"})).await;
    post(executor, "teachers", json!({"id": "t2", "name": "Dahl"})).await;
    post(
        executor,
        "classes",
        json!({"id": "c1", "school": "s1", "teachers": ["t1", "t2"]}),
    )
    .await;
    post(executor, "classes", json!({"id": "c2", "school": "s1"})).await;
}

async fn notify(executor: &lyceum::Executor, payload: Value) -> lyceum::Envelope<Output> {
    executor
        .execute(
            &ctx(),
            Command::Notification {
                service: "classes".into(),
                payload,
            },
        )
        .await
}

#[tokio::test]
async fn owner_rename_rewrites_every_embedded_copy() {
    let executor = create_executor();
    seed_school_and_classes(&executor).await;

    executor
        .service("schools")
        .unwrap()
        .patch(
            &ctx(),
            "s1",
            &PatchRequest::new().with_set(doc(json!({"name": "North High"}))),
        )
        .await
        .unwrap();

    for id in ["c1", "c2"] {
        assert_eq!(
            get(&executor, "classes", id).await["school"],
            json!({"id": "s1", "name": "North High"})
        );
    }
}

#[tokio::test]
async fn owner_delete_tombstones_scalar_and_drops_array_element() {
    let executor = create_executor();
    seed_school_and_classes(&executor).await;

    for (service, id) in [("schools", "s1"), ("teachers", "t1")] {
        let reply = executor
            .execute(
                &ctx(),
                Command::Delete {
                    service: service.into(),
                    id: id.into(),
                    projection: None,
                },
            )
            .await;
        assert_eq!(reply.status(), 200);
    }

    let c1 = get(&executor, "classes", "c1").await;
    assert_eq!(c1["school"], json!({"id": "s1"}));
    assert_eq!(c1["teachers"], json!([{"id": "t2", "name": "Dahl"}]));
    assert_eq!(get(&executor, "classes", "c2").await["school"], json!({"id": "s1"}));
}

#[tokio::test]
async fn notification_from_unrelated_service_writes_nothing() {
    let executor = create_executor();
    seed_school_and_classes(&executor).await;
    let before = version(&executor, "classes", "c1").await;

    let reply = notify(
        &executor,
        json!({"serviceName": "parents", "modified": [{"id": "s1", "name": "Hijack"}]}),
    )
    .await;
    assert_eq!(reply.status(), 200);
    assert_eq!(
        reply.into_value(),
        Some(Output::Processed { processed: false })
    );
    assert_eq!(version(&executor, "classes", "c1").await, before);
}

#[tokio::test]
async fn added_notification_is_documented_no_op() {
    let executor = create_executor();
    seed_school_and_classes(&executor).await;
    let before = get(&executor, "classes", "c1").await;

    let reply = notify(
        &executor,
        json!({"serviceName": "schools", "added": [{"id": "s1", "name": "Brand new"}]}),
    )
    .await;
    assert_eq!(
        reply.into_value(),
        Some(Output::Processed { processed: false })
    );
    assert_eq!(get(&executor, "classes", "c1").await, before);
}

#[tokio::test]
async fn inbound_modified_notification_is_processed() {
    let executor = create_executor();
    seed_school_and_classes(&executor).await;

    let reply = notify(
        &executor,
        json!({"serviceName": "teachers", "modified": [{"id": "t2", "name": "Dahl-Lie", "salary": 9}]}),
    )
    .await;
    assert_eq!(
        reply.into_value(),
        Some(Output::Processed { processed: true })
    );
    assert_eq!(
        get(&executor, "classes", "c1").await["teachers"],
        json!([{"id": "t1", "name": "Berg"}, {"id": "t2", "name": "Dahl-Lie"}])
    );
}

#[tokio::test]
async fn malformed_notification_is_rejected_before_any_write() {
    let executor = create_executor();
    seed_school_and_classes(&executor).await;
    let before = version(&executor, "classes", "c1").await;

    for payload in [
        json!({"modified": [{"id": "s1"}]}),
        json!({"serviceName": "schools", "modified": [{"name": "no id"}]}),
        json!({"serviceName": "schools", "renamed": []}),
    ] {
        let reply = notify(&executor, payload).await;
        assert_eq!(reply.status(), 400, "{:?}", reply);
    }
    assert_eq!(version(&executor, "classes", "c1").await, before);
}

#[tokio::test]
async fn disabled_filling_leaves_copies_alone() {
    let mut config = school_config();
    config.fill_references = false;
    let executor = create_executor_with(config);
    post(&executor, "schools", json!({"id": "s1", "name": "North"})).await;
    let class = post(
        &executor,
        "classes",
        json!({"id": "c1", "school": {"id": "s1", "name": "North"}}),
    )
    .await;

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
    assert_eq!(get(&executor, "classes", "c1").await, class);
}

#[tokio::test]
async fn tenants_do_not_see_each_others_sync() {
    let executor = create_executor();
    seed_school_and_classes(&executor).await;

    let other = lyceum::RequestContext::new("school-b");
    executor
        .service("schools")
        .unwrap()
        .post(&other, doc(json!({"id": "s1", "name": "Elsewhere"})))
        .await
        .unwrap();
    executor
        .service("schools")
        .unwrap()
        .delete(&other, "s1", &lyceum::Projection::all())
        .await
        .unwrap();

    assert_eq!(
        get(&executor, "classes", "c1").await["school"],
        json!({"id": "s1", "name": "North"})
    );
}
