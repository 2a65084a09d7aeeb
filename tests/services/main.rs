//! Service Tests
//!
//! Cross-service behaviour through the public API:
//! - reference filling on write and on read
//! - notification fan-out and its isolation guarantees
//! - synchronization of embedded copies when owners change
//! - the queue channel and config-driven wiring

mod common;

mod config_wiring;
mod fan_out;
mod populate;
mod queue;
mod sync;
