//! Malformed patches are rejected before anything is written.

use crate::common::*;
use serde_json::json;

#[tokio::test]
async fn empty_patch_is_rejected() {
    let executor = create_executor();
    seed(&executor, json!({"id": "u1"})).await;
    let reply = patch(&executor, "u1", json!({})).await;
    assert_eq!(reply.status(), 400);
    assert_eq!(version(&executor, "u1").await, 1);
}

#[tokio::test]
async fn touching_id_is_rejected() {
    let executor = create_executor();
    seed(&executor, json!({"id": "u1"})).await;

    let reply = patch(&executor, "u1", json!({"set": {"id": "u2"}})).await;
    assert_eq!(reply.status(), 400);
    let reply = patch(&executor, "u1", json!({"unset": ["id"]})).await;
    assert_eq!(reply.status(), 400);
    assert_eq!(version(&executor, "u1").await, 1);

    // the target's own id is tolerated
    let out = patched(&executor, "u1", json!({"set": {"id": "u1", "name": "x"}})).await;
    assert_eq!(out, json!({"id": "u1", "name": "x"}));
}

#[tokio::test]
async fn unknown_patch_key_fails_to_parse() {
    let parsed: Result<lyceum::PatchRequest, _> =
        serde_json::from_value(json!({"replace": {"name": "x"}}));
    assert!(parsed.is_err());
}

#[tokio::test]
async fn patching_missing_document_is_not_found() {
    let executor = create_executor();
    let reply = patch(&executor, "ghost", json!({"set": {"name": "x"}})).await;
    assert_eq!(reply.status(), 404);
    assert!(reply.error().unwrap().message.contains("ghost"));
}
