//! Equality filters over documents
//!
//! A [`Filter`] is a conjunction of `path == value` conditions. Paths that
//! cross arrays match if any element matches, and a condition against an
//! array field matches if the array contains the value. This is the
//! matching used for `get_all` and for locating embedded references
//! (`school.id == "s1"` or `schools.id == "s1"`).

use crate::document::Document;
use crate::error::{Error, Result};
use crate::json::{FieldPath, PathSegment};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Conjunction of equality conditions
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct Filter {
    conditions: Vec<(FieldPath, Value)>,
}

impl Filter {
    /// Filter matching every document
    pub fn new() -> Self {
        Filter::default()
    }

    /// Add an equality condition (builder)
    pub fn and_eq(mut self, path: FieldPath, value: impl Into<Value>) -> Self {
        self.conditions.push((path, value.into()));
        self
    }

    /// Single-condition filter from a dotted path string
    pub fn by_field(path: &str, value: impl Into<Value>) -> Result<Self> {
        Ok(Filter::new().and_eq(path.parse()?, value))
    }

    /// Parse the `{path: value}` object form
    pub fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Object(map) => Filter::try_from(map.clone()),
            Value::Null => Ok(Filter::new()),
            _ => Err(Error::validation("filter must be an object")),
        }
    }

    /// True when there are no conditions
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Evaluate against a document
    pub fn matches(&self, doc: &Document) -> bool {
        self.conditions.iter().all(|(path, expected)| {
            let mut found = Vec::new();
            collect_from_map(doc.as_map(), path.segments(), &mut found);
            found.iter().any(|v| {
                *v == expected || matches!(v, Value::Array(items) if items.contains(expected))
            })
        })
    }
}

fn collect_from_map<'a>(map: &'a Map<String, Value>, segments: &[PathSegment], out: &mut Vec<&'a Value>) {
    let Some((PathSegment::Key(key), rest)) = segments.split_first() else {
        return;
    };
    if let Some(value) = map.get(key) {
        collect(value, rest, out);
    }
}

fn collect<'a>(value: &'a Value, segments: &[PathSegment], out: &mut Vec<&'a Value>) {
    let Some(segment) = segments.first() else {
        out.push(value);
        return;
    };
    match (segment, value) {
        (PathSegment::Key(_), Value::Object(obj)) => collect_from_map(obj, segments, out),
        (PathSegment::Key(_), Value::Array(arr)) => {
            for elem in arr {
                collect(elem, segments, out);
            }
        }
        (PathSegment::Index(idx), Value::Array(arr)) => {
            if let Some(elem) = arr.get(*idx) {
                collect(elem, &segments[1..], out);
            }
        }
        _ => {}
    }
}

impl TryFrom<Map<String, Value>> for Filter {
    type Error = Error;

    fn try_from(map: Map<String, Value>) -> Result<Self> {
        let mut filter = Filter::new();
        for (path, value) in map {
            let parsed: FieldPath = path.parse()?;
            if parsed.is_root() {
                return Err(Error::validation("filter path cannot be empty"));
            }
            filter.conditions.push((parsed, value));
        }
        Ok(filter)
    }
}

impl From<Filter> for Map<String, Value> {
    fn from(filter: Filter) -> Self {
        filter
            .conditions
            .into_iter()
            .map(|(path, value)| (path.to_string(), value))
            .collect()
    }
}
