//! Patch Engine Tests
//!
//! Structural patches driven through the executor: set/unset/remove/add
//! semantics, request validation, and versioning of the stored record.

mod common;

mod properties;
mod validation;
