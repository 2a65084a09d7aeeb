//! Dispatch, status codes and batch execution.

use super::{create_test_executor, ctx};
use crate::{Command, Document, Output, PatchRequest, Projection, QueryOptions};
use serde_json::{json, Value};

fn doc(v: Value) -> Document {
    Document::from_value(v).unwrap()
}

fn post(service: &str, v: Value) -> Command {
    Command::Post {
        service: service.into(),
        document: doc(v),
    }
}

#[tokio::test]
async fn test_ping() {
    let executor = create_test_executor();
    let reply = executor.execute(&ctx(), Command::Ping).await;
    assert_eq!(reply.status(), 200);
    match reply.into_value() {
        Some(Output::Pong { version }) => assert!(!version.is_empty()),
        other => panic!("Expected Pong output, got {:?}", other),
    }
}

#[tokio::test]
async fn test_mutations_report_version_and_timestamps() {
    let executor = create_test_executor();
    let created = executor
        .execute(&ctx(), post("schools", json!({"id": "s1", "name": "A"})))
        .await;
    let wire = serde_json::to_value(&created).unwrap();
    assert_eq!(wire["status"], json!(201));
    assert_eq!(wire["value"]["document"], json!({"id": "s1", "name": "A"}));
    assert_eq!(wire["value"]["version"], json!(1));
    assert_eq!(wire["value"]["createdAt"], wire["value"]["updatedAt"]);

    let patched = executor
        .execute(
            &ctx(),
            Command::Patch {
                service: "schools".into(),
                id: "s1".into(),
                patch: PatchRequest::new().with_set(doc(json!({"name": "B"}))),
            },
        )
        .await;
    let record = patched.value().and_then(Output::record).unwrap();
    assert_eq!(record.version, 2);
    assert_eq!(record.document.get("name"), Some(&json!("B")));
    assert!(!record.updated_at.is_before(record.created_at));
    assert_eq!(
        serde_json::to_value(&patched).unwrap()["value"]["createdAt"],
        wire["value"]["createdAt"]
    );
}

#[tokio::test]
async fn test_delete_returns_projected_prior_value() {
    let executor = create_test_executor();
    executor
        .execute(&ctx(), post("schools", json!({"id": "s1", "name": "A", "city": "Oslo"})))
        .await;
    let reply = executor
        .execute(
            &ctx(),
            Command::Delete {
                service: "schools".into(),
                id: "s1".into(),
                projection: Some(Projection::fields(["name"])),
            },
        )
        .await;
    assert_eq!(reply.status(), 200);
    let record = reply.value().and_then(Output::record).unwrap();
    assert_eq!(record.document.clone().into_value(), json!({"id": "s1", "name": "A"}));
    assert_eq!(record.version, 1);

    let gone = executor
        .execute(
            &ctx(),
            Command::GetOne {
                service: "schools".into(),
                id: "s1".into(),
                projection: None,
                populate: false,
            },
        )
        .await;
    assert_eq!(gone.status(), 404);
}

#[tokio::test]
async fn test_post_is_created_and_get_is_ok() {
    let executor = create_test_executor();
    let created = executor
        .execute(&ctx(), post("schools", json!({"id": "s1", "name": "North"})))
        .await;
    assert_eq!(created.status(), 201);

    let read = executor
        .execute(
            &ctx(),
            Command::GetOne {
                service: "schools".into(),
                id: "s1".into(),
                projection: None,
                populate: false,
            },
        )
        .await;
    assert_eq!(read.status(), 200);
    assert_eq!(
        read.value().and_then(Output::document).unwrap().get("name"),
        Some(&json!("North"))
    );
}

#[tokio::test]
async fn test_unknown_service_is_not_found() {
    let executor = create_test_executor();
    let reply = executor
        .execute(
            &ctx(),
            Command::Delete {
                service: "parents".into(),
                id: "p1".into(),
                projection: None,
            },
        )
        .await;
    assert_eq!(reply.status(), 404);
    assert!(reply.error().unwrap().message.contains("parents"));
}

#[tokio::test]
async fn test_errors_map_to_statuses() {
    let executor = create_test_executor();
    executor
        .execute(&ctx(), post("schools", json!({"id": "s1", "code": "N1"})))
        .await;

    let duplicate = executor
        .execute(&ctx(), post("schools", json!({"id": "s2", "code": "N1"})))
        .await;
    assert_eq!(duplicate.status(), 409);

    let invalid = executor
        .execute(
            &ctx(),
            Command::Notification {
                service: "classes".into(),
                payload: json!({"serviceName": "schools", "extra": 1}),
            },
        )
        .await;
    assert_eq!(invalid.status(), 400);

    let missing = executor
        .execute(
            &ctx(),
            Command::Put {
                service: "schools".into(),
                id: "nope".into(),
                document: doc(json!({})),
            },
        )
        .await;
    assert_eq!(missing.status(), 404);
}

#[tokio::test]
async fn test_execute_many_preserves_order() {
    let executor = create_test_executor();
    let results = executor
        .execute_many(
            &ctx(),
            vec![
                post("schools", json!({"id": "s1"})),
                post("schools", json!({"id": "s2"})),
                Command::GetAllCount {
                    service: "schools".into(),
                    filter: Default::default(),
                },
                Command::GetAll {
                    service: "schools".into(),
                    options: QueryOptions::new().paged(1, 10),
                    populate: false,
                },
            ],
        )
        .await;
    assert_eq!(results.len(), 4);
    assert!(results.iter().all(|r| r.is_ok()));
    assert_eq!(results[2].value(), Some(&Output::Count(2)));
    let page = results[3].value().and_then(Output::documents).unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].id(), Some("s2"));
}

#[tokio::test]
async fn test_tenants_are_isolated() {
    let executor = create_test_executor();
    executor
        .execute(&ctx(), post("schools", json!({"id": "s1"})))
        .await;
    let other = crate::RequestContext::new("school-b");
    let reply = executor
        .execute(
            &other,
            Command::GetAllCount {
                service: "schools".into(),
                filter: Default::default(),
            },
        )
        .await;
    assert_eq!(reply.value(), Some(&Output::Count(0)));
}
