//! Patch properties observed through the stored document.

use crate::common::*;
use serde_json::json;

#[tokio::test]
async fn set_twice_is_idempotent_apart_from_version() {
    let executor = create_executor();
    seed(&executor, json!({"id": "u1", "name": "Ann"})).await;
    let request = json!({"set": {"name": "Anna", "profile.level": 3}});

    let first = patched(&executor, "u1", request.clone()).await;
    let second = patched(&executor, "u1", request).await;
    assert_eq!(first, second);
    assert_eq!(first, json!({"id": "u1", "name": "Anna", "profile": {"level": 3}}));
    assert_eq!(version(&executor, "u1").await, 3);
}

#[tokio::test]
async fn add_scalars_is_set_union() {
    let executor = create_executor();
    seed(&executor, json!({"id": "u1", "schools": ["s1", "s2"]})).await;
    let out = patched(&executor, "u1", json!({"add": {"schools": ["s1", "s3"]}})).await;
    assert_eq!(out["schools"], json!(["s1", "s2", "s3"]));
}

#[tokio::test]
async fn add_merges_objects_by_id() {
    let executor = create_executor();
    seed(
        &executor,
        json!({"id": "u1", "schools": [{"id": "s1", "roles": ["role1"]}]}),
    )
    .await;
    let out = patched(
        &executor,
        "u1",
        json!({"add": {"schools": [{"id": "s1", "roles": ["role2", "role3"]}]}}),
    )
    .await;
    assert_eq!(
        out["schools"],
        json!([{"id": "s1", "roles": ["role1", "role2", "role3"]}])
    );
}

#[tokio::test]
async fn remove_without_id_matches_on_given_fields() {
    let executor = create_executor();
    seed(
        &executor,
        json!({"id": "u1", "schools": [
            {"id": "s1", "name": "s1"},
            {"id": "s2", "name": "s2"},
            {"id": "s3", "name": "s3"}
        ]}),
    )
    .await;
    let out = patched(&executor, "u1", json!({"remove": {"schools": [{"name": "s3"}]}})).await;
    assert_eq!(
        out["schools"],
        json!([{"id": "s1", "name": "s1"}, {"id": "s2", "name": "s2"}])
    );
}

#[tokio::test]
async fn remove_with_nested_fields_subtracts_inside_element() {
    let executor = create_executor();
    seed(
        &executor,
        json!({"id": "u1", "schools": [
            {"id": "schoolid3", "roles": ["role3"]},
            {
                "id": "schoolid4",
                "roles": ["role1", "role3", "role4"],
                "building": [{"id": "b1", "tags": ["t1", "t2", "t3"]}]
            }
        ]}),
    )
    .await;
    let out = patched(
        &executor,
        "u1",
        json!({"remove": {"schools": [{
            "id": "schoolid4",
            "roles": ["role3", "role4"],
            "building": [{"id": "b1", "tags": ["t1", "t2"]}]
        }]}}),
    )
    .await;
    assert_eq!(
        out["schools"],
        json!([
            {"id": "schoolid3", "roles": ["role3"]},
            {"id": "schoolid4", "roles": ["role1"], "building": [{"id": "b1", "tags": ["t3"]}]}
        ])
    );
}

#[tokio::test]
async fn all_four_parts_apply_in_order() {
    let executor = create_executor();
    seed(
        &executor,
        json!({"id": "u1", "name": "Ann", "nick": "A", "roles": ["r1", "r2"]}),
    )
    .await;
    let out = patched(
        &executor,
        "u1",
        json!({
            "set": {"name": "Anna"},
            "unset": ["nick"],
            "remove": {"roles": ["r1", "r2"]},
            "add": {"roles": ["r2", "r3"]}
        }),
    )
    .await;
    assert_eq!(out, json!({"id": "u1", "name": "Anna", "roles": ["r2", "r3"]}));
}
