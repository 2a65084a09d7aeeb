//! Contract types shared by every layer
//!
//! - `timestamp`: millisecond timestamps carried by stored records

pub mod timestamp;

pub use timestamp::Timestamp;
