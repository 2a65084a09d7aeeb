//! Services built from a `lyceum.toml` on disk.

use crate::common::*;
use lyceum::{Executor, LyceumConfig, MemoryStore, CONFIG_FILE_NAME};
use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;

const WIRING: &str = r#"
reference_fields = ["id", "name", "city"]

[[services]]
name = "schools"
unique_fields = ["code"]

[[services]]
name = "students"
[[services.references]]
field = "schools[]"
owner = "schools"
projection = ["name"]
[[services.references]]
field = "homeroom"
owner = "schools"
"#;

#[tokio::test]
async fn config_file_drives_references_and_projections() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(CONFIG_FILE_NAME);
    std::fs::write(&path, WIRING).unwrap();

    let config = LyceumConfig::from_file(&path).unwrap();
    let executor = Executor::from_config(&config, Arc::new(MemoryStore::new())).unwrap();
    assert_eq!(executor.service_names(), vec!["schools", "students"]);

    post(&executor, "schools", json!({"id": "s1", "name": "North", "city": "Oslo", "code": "N"})).await;
    let student = post(
        &executor,
        "students",
        json!({"id": "st1", "schools": ["s1"], "homeroom": "s1"}),
    )
    .await;
    assert_eq!(student["schools"], json!([{"id": "s1", "name": "North"}]));
    assert_eq!(student["homeroom"], json!({"id": "s1", "name": "North", "city": "Oslo"}));

    executor
        .service("schools")
        .unwrap()
        .put(&ctx(), "s1", doc(json!({"name": "North", "city": "Tromsø", "code": "N"})))
        .await
        .unwrap();
    let student = get(&executor, "students", "st1").await;
    assert_eq!(student["schools"], json!([{"id": "s1", "name": "North"}]));
    assert_eq!(student["homeroom"]["city"], json!("Tromsø"));
}

#[test]
fn default_file_builds_an_empty_executor() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(CONFIG_FILE_NAME);
    LyceumConfig::write_default_if_missing(&path).unwrap();
    let config = LyceumConfig::from_file(&path).unwrap();
    let executor = Executor::from_config(&config, Arc::new(MemoryStore::new())).unwrap();
    assert!(executor.service_names().is_empty());
}

#[test]
fn unknown_owner_in_file_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(CONFIG_FILE_NAME);
    std::fs::write(
        &path,
        "[[services]]\nname = \"students\"\n[[services.references]]\nfield = \"school\"\nowner = \"schools\"\n",
    )
    .unwrap();
    let err = LyceumConfig::from_file(&path).unwrap_err();
    assert_eq!(err.status(), 400);
}
