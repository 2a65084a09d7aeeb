//! Record clock
//!
//! Every stored record carries two of these: the creation time, fixed at
//! `post`, and the last-modified time, refreshed by every mutation. Times
//! are UTC with millisecond precision and travel as RFC 3339 strings, so a
//! value survives a store round trip unchanged.
//!
//! ```
//! use lyceum_core::Timestamp;
//!
//! let opened: Timestamp = "2024-05-01T08:00:00.123Z".parse().unwrap();
//! assert!(opened.is_before(Timestamp::now()));
//! assert_eq!(opened.to_string(), "2024-05-01T08:00:00.123Z");
//! ```

use crate::error::{Error, Result};
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A UTC instant truncated to milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// The current instant
    pub fn now() -> Self {
        Timestamp(Utc::now().trunc_subsecs(3))
    }

    /// Milliseconds since the Unix epoch
    pub fn as_millis(&self) -> i64 {
        self.0.timestamp_millis()
    }

    /// Instant `millis` milliseconds after the Unix epoch
    pub fn from_millis(millis: i64) -> Option<Self> {
        DateTime::<Utc>::from_timestamp_millis(millis).map(Timestamp)
    }

    /// True when `self` is strictly earlier than `other`
    pub fn is_before(&self, other: Timestamp) -> bool {
        self.0 < other.0
    }

    /// Underlying chrono value
    pub fn as_datetime(&self) -> DateTime<Utc> {
        self.0
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Timestamp(DateTime::<Utc>::UNIX_EPOCH)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.to_rfc3339_opts(SecondsFormat::Millis, true))
    }
}

impl FromStr for Timestamp {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        DateTime::parse_from_rfc3339(s)
            .map(|t| Timestamp(t.with_timezone(&Utc).trunc_subsecs(3)))
            .map_err(|e| Error::serialization(format!("invalid timestamp '{}': {}", s, e)))
    }
}

impl From<Timestamp> for String {
    fn from(ts: Timestamp) -> Self {
        ts.to_string()
    }
}

impl TryFrom<String> for Timestamp {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(t: DateTime<Utc>) -> Self {
        Timestamp(t.trunc_subsecs(3))
    }
}
