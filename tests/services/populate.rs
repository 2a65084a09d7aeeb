//! Reference filling: batching, skip-on-empty, and partial resolution.

use crate::common::*;
use lyceum::{Command, Output, Projection};
use lyceum_engine::{ReferenceDescriptor, ReferenceResolver};
use serde_json::json;

fn schools_owner() -> std::sync::Arc<CountingOwner> {
    CountingOwner::new(
        "schools",
        vec![
            json!({"id": "s1", "name": "North", "city": "Oslo"}),
            json!({"id": "s2", "name": "South", "city": "Bergen"}),
        ],
    )
}

#[tokio::test]
async fn empty_reference_fields_cause_no_owner_calls() {
    let owner = schools_owner();
    let descriptors = vec![
        ReferenceDescriptor::new("school", owner.clone()).unwrap(),
        ReferenceDescriptor::new("schools[]", owner.clone()).unwrap(),
    ];
    let mut docs = vec![
        doc(json!({"id": "c1"})),
        doc(json!({"id": "c2", "schools": []})),
        doc(json!({"id": "c3", "school": null})),
    ];
    let before = docs.clone();

    let fetched = ReferenceResolver::default()
        .populate_references(&ctx(), &mut docs, &descriptors)
        .await
        .unwrap();
    assert!(!fetched);
    assert_eq!(owner.call_count(), 0);
    assert_eq!(docs, before);
}

#[tokio::test]
async fn one_fetch_per_descriptor_across_the_batch() {
    let owner = schools_owner();
    let descriptors = vec![ReferenceDescriptor::new("school", owner.clone()).unwrap()];
    let mut docs = vec![
        doc(json!({"id": "c1", "school": "s2"})),
        doc(json!({"id": "c2", "school": {"id": "s1"}})),
        doc(json!({"id": "c3", "school": "s2"})),
    ];

    ReferenceResolver::default()
        .populate_references(&ctx(), &mut docs, &descriptors)
        .await
        .unwrap();
    assert_eq!(*owner.calls.lock(), vec![vec!["s1".to_string(), "s2".to_string()]]);
    assert_eq!(docs[0]["school"], json!({"id": "s2", "name": "South"}));
    assert_eq!(docs[1]["school"], json!({"id": "s1", "name": "North"}));
    assert_eq!(docs[2]["school"], json!({"id": "s2", "name": "South"}));
}

#[tokio::test]
async fn descriptor_projection_overrides_default() {
    let owner = schools_owner();
    let descriptors = vec![ReferenceDescriptor::new("school", owner.clone())
        .unwrap()
        .with_projection(Projection::fields(["city"]))];
    let mut docs = vec![doc(json!({"id": "c1", "school": "s1"}))];
    ReferenceResolver::default()
        .populate_references(&ctx(), &mut docs, &descriptors)
        .await
        .unwrap();
    assert_eq!(docs[0]["school"], json!({"id": "s1", "city": "Oslo"}));
}

#[tokio::test]
async fn disabled_filling_never_fetches() {
    let owner = schools_owner();
    let descriptors = vec![ReferenceDescriptor::new("school", owner.clone()).unwrap()];
    let mut docs = vec![doc(json!({"id": "c1", "school": "s1"}))];
    let fetched = ReferenceResolver::new(false, Projection::fields(["id", "name"]))
        .populate_references(&ctx(), &mut docs, &descriptors)
        .await
        .unwrap();
    assert!(!fetched);
    assert_eq!(owner.call_count(), 0);
    assert_eq!(docs[0]["school"], json!("s1"));
}

#[tokio::test]
async fn post_fills_scalar_and_array_references() {
    let executor = create_executor();
    post(&executor, "schools", json!({"id": "s1", "name": "North", "code": "N"})).await;
    post(&executor, "teachers", json!({"id": "t1", "name": "Ms. Berg", "salary": 1})).await;

    let class = post(
        &executor,
        "classes",
        json!({"id": "c1", "name": "Math", "school": "s1", "teachers": ["t1", "t9"]}),
    )
    .await;
    assert_eq!(
        class,
        json!({
            "id": "c1",
            "name": "Math",
            "school": {"id": "s1", "name": "North"},
            "teachers": [{"id": "t1", "name": "Ms. Berg"}]
        })
    );
    // what was returned is what was stored
    assert_eq!(get(&executor, "classes", "c1").await, class);
}

#[tokio::test]
async fn unresolved_scalar_reference_is_left_as_is() {
    let executor = create_executor();
    let class = post(&executor, "classes", json!({"id": "c1", "school": "s404"})).await;
    assert_eq!(class["school"], json!("s404"));
}

#[tokio::test]
async fn read_can_populate_on_demand() {
    let executor = create_executor();
    post(&executor, "schools", json!({"id": "s1", "name": "North"})).await;
    // stored straight through the collection, so nothing was filled
    executor
        .service("classes")
        .unwrap()
        .collection()
        .post(&ctx(), doc(json!({"id": "c1", "school": "s1"})))
        .await
        .unwrap();
    assert_eq!(get(&executor, "classes", "c1").await["school"], json!("s1"));

    let reply = executor
        .execute(
            &ctx(),
            Command::GetAllByIds {
                service: "classes".into(),
                ids: vec!["c1".into(), "missing".into()],
                projection: None,
                populate: true,
            },
        )
        .await;
    let docs = reply.value().and_then(Output::documents).unwrap();
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0]["school"], json!({"id": "s1", "name": "North"}));
}

#[tokio::test]
async fn patch_fills_references_in_set_and_add() {
    let executor = create_executor();
    post(&executor, "schools", json!({"id": "s1", "name": "North"})).await;
    post(&executor, "teachers", json!({"id": "t1", "name": "Berg"})).await;
    post(&executor, "teachers", json!({"id": "t2", "name": "Dahl"})).await;
    post(&executor, "classes", json!({"id": "c1", "teachers": ["t1"]})).await;

    let reply = executor
        .execute(
            &ctx(),
            Command::Patch {
                service: "classes".into(),
                id: "c1".into(),
                patch: serde_json::from_value(json!({
                    "set": {"school": "s1"},
                    "add": {"teachers": ["t2"]}
                }))
                .unwrap(),
            },
        )
        .await;
    assert_eq!(reply.status(), 200, "{:?}", reply);
    let class = get(&executor, "classes", "c1").await;
    assert_eq!(class["school"], json!({"id": "s1", "name": "North"}));
    assert_eq!(
        class["teachers"],
        json!([{"id": "t1", "name": "Berg"}, {"id": "t2", "name": "Dahl"}])
    );
}
