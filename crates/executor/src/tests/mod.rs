//! Test modules for the executor crate.

pub mod execute_many;

use crate::{Executor, LyceumConfig, MemoryStore, RequestContext, ServiceConfig};
use std::sync::Arc;

/// schools, and classes embedding `school` and `teachers[]`
pub(crate) fn school_config() -> LyceumConfig {
    LyceumConfig::default()
        .with_service(ServiceConfig::new("schools").with_unique("code"))
        .with_service(ServiceConfig::new("teachers"))
        .with_service(
            ServiceConfig::new("classes")
                .with_reference("school", "schools")
                .with_reference("teachers[]", "teachers"),
        )
}

pub(crate) fn create_test_executor() -> Executor {
    Executor::from_config(&school_config(), Arc::new(MemoryStore::new())).unwrap()
}

pub(crate) fn ctx() -> RequestContext {
    RequestContext::new("school-a")
}
