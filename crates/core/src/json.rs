//! Field paths and bounded JSON access
//!
//! Services address document fields with dotted paths such as
//! `school.name` or `rooms[0].tags`. Everything that reads or writes a
//! field by name (patching, projections, reference selectors, unique
//! indexes) goes through the helpers here.
//!
//! Stored documents are bounded: at most [`MAX_DOCUMENT_SIZE`] bytes of
//! serialized JSON, [`MAX_NESTING_DEPTH`] levels of nesting, and paths of
//! at most [`MAX_PATH_LENGTH`] segments.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Largest serialized document accepted by a store, in bytes
pub const MAX_DOCUMENT_SIZE: usize = 16 * 1024 * 1024;

/// Deepest object/array nesting accepted in a document
///
/// The patch engine recurses through nested values, so this bounds its
/// stack usage.
pub const MAX_NESTING_DEPTH: usize = 100;

/// Longest field path accepted, in segments
pub const MAX_PATH_LENGTH: usize = 256;

/// A document or path outside the accepted bounds
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LimitError {
    /// Serialized document is too large
    #[error("document is {size} bytes, limit is {max}")]
    DocumentTooLarge {
        /// Serialized size
        size: usize,
        /// Limit
        max: usize,
    },

    /// Document is nested too deeply
    #[error("document nests {depth} levels, limit is {max}")]
    NestingTooDeep {
        /// Observed depth
        depth: usize,
        /// Limit
        max: usize,
    },

    /// Field path has too many segments
    #[error("field path has {length} segments, limit is {max}")]
    PathTooLong {
        /// Observed segment count
        length: usize,
        /// Limit
        max: usize,
    },
}

/// Levels of object/array nesting below `value`; scalars are 0
pub fn nesting_depth(value: &Value) -> usize {
    let children: Box<dyn Iterator<Item = &Value>> = match value {
        Value::Array(items) => Box::new(items.iter()),
        Value::Object(fields) => Box::new(fields.values()),
        _ => return 0,
    };
    1 + children.map(nesting_depth).max().unwrap_or(0)
}

/// Check a document body against the depth and size bounds
pub fn validate_limits(map: &Map<String, Value>) -> Result<(), LimitError> {
    let depth = 1 + map.values().map(nesting_depth).max().unwrap_or(0);
    if depth > MAX_NESTING_DEPTH {
        return Err(LimitError::NestingTooDeep {
            depth,
            max: MAX_NESTING_DEPTH,
        });
    }
    // Depth first: serialization must never walk a pathological tree.
    let size = serde_json::to_vec(map).map_or(0, |bytes| bytes.len());
    if size > MAX_DOCUMENT_SIZE {
        return Err(LimitError::DocumentTooLarge {
            size,
            max: MAX_DOCUMENT_SIZE,
        });
    }
    Ok(())
}

/// JSON type name of `value`, for error messages
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// A field path that could not be parsed; positions are byte offsets
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PathParseError {
    /// A `.` with no field name after it, or a leading separator
    #[error("missing field name at offset {0}")]
    EmptyKey(usize),
    /// A `[` with no matching `]`
    #[error("'[' at offset {0} is never closed")]
    UnclosedBracket(usize),
    /// Bracket contents are not a non-negative integer
    #[error("bad array index at offset {0}: '{1}'")]
    InvalidIndex(usize, String),
}

/// One step of a [`FieldPath`]
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PathSegment {
    /// Named object field
    Key(String),
    /// Array position
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Key(name) => write!(f, ".{name}"),
            PathSegment::Index(pos) => write!(f, "[{pos}]"),
        }
    }
}

/// A path into a document
///
/// Field names are separated by `.` and array positions are written
/// `[n]`. The empty string parses to the root path, which addresses the
/// whole document.
///
/// ```
/// use lyceum_core::json::FieldPath;
///
/// let path: FieldPath = "school.name".parse().unwrap();
/// assert_eq!(path.len(), 2);
/// assert_eq!(path.to_string(), "school.name");
/// assert!(FieldPath::root().is_root());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct FieldPath {
    segments: Vec<PathSegment>,
}

impl FieldPath {
    /// The root path
    pub fn root() -> Self {
        Self::default()
    }

    /// Path made of `segments`
    pub fn from_segments(segments: Vec<PathSegment>) -> Self {
        FieldPath { segments }
    }

    /// Segments in order
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Segment count
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Same as [`FieldPath::is_root`]
    pub fn is_empty(&self) -> bool {
        self.is_root()
    }

    /// True when the path addresses the whole document
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// `self` extended with field `name`
    pub fn key(mut self, name: impl Into<String>) -> Self {
        self.segments.push(PathSegment::Key(name.into()));
        self
    }

    /// `self` extended with array position `pos`
    pub fn index(mut self, pos: usize) -> Self {
        self.segments.push(PathSegment::Index(pos));
        self
    }

    /// Path without its last segment; `None` for root
    pub fn parent(&self) -> Option<FieldPath> {
        let (_, parent) = self.segments.split_last()?;
        Some(FieldPath::from_segments(parent.to_vec()))
    }

    /// Final segment, if any
    pub fn last_segment(&self) -> Option<&PathSegment> {
        self.segments.last()
    }

    /// Leading field name, when the path starts with one
    pub fn first_key(&self) -> Option<&str> {
        match self.segments.first()? {
            PathSegment::Key(name) => Some(name),
            PathSegment::Index(_) => None,
        }
    }

    /// True if `self` is `other` or lies above it
    pub fn is_ancestor_of(&self, other: &FieldPath) -> bool {
        other.segments.starts_with(&self.segments)
    }

    /// Reject paths longer than [`MAX_PATH_LENGTH`]
    pub fn validate(&self) -> Result<(), LimitError> {
        match self.segments.len() {
            length if length > MAX_PATH_LENGTH => Err(LimitError::PathTooLong {
                length,
                max: MAX_PATH_LENGTH,
            }),
            _ => Ok(()),
        }
    }
}

impl FromStr for FieldPath {
    type Err = PathParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut path = FieldPath::root();
        let mut rest = s;
        let mut offset = 0;
        // A field name is expected at the start and after every '.'.
        let mut want_key = !s.is_empty();

        while !rest.is_empty() {
            if want_key {
                let end = rest.find(['.', '[']).unwrap_or(rest.len());
                if end == 0 {
                    return Err(PathParseError::EmptyKey(offset));
                }
                path = path.key(&rest[..end]);
                rest = &rest[end..];
                offset += end;
                want_key = false;
            } else if let Some(after) = rest.strip_prefix('.') {
                rest = after;
                offset += 1;
                want_key = true;
                if rest.is_empty() {
                    return Err(PathParseError::EmptyKey(offset));
                }
            } else if let Some(after) = rest.strip_prefix('[') {
                let close = after
                    .find(']')
                    .ok_or(PathParseError::UnclosedBracket(offset))?;
                let digits = &after[..close];
                let pos = digits
                    .parse::<usize>()
                    .map_err(|_| PathParseError::InvalidIndex(offset, digits.to_string()))?;
                path = path.index(pos);
                rest = &after[close + 1..];
                offset += close + 2;
            } else {
                // Text directly after ']' with no separator.
                want_key = true;
            }
        }
        Ok(path)
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut segments = self.segments.iter();
        if let Some(PathSegment::Key(name)) = self.segments.first() {
            f.write_str(name)?;
            segments.next();
        }
        segments.try_for_each(|segment| write!(f, "{segment}"))
    }
}

/// Get the value at `path` inside an object map
///
/// The root path has no single value inside a map and yields `None`;
/// callers that accept the root treat the map itself as the target.
pub fn get_at_path<'a>(map: &'a Map<String, Value>, path: &FieldPath) -> Option<&'a Value> {
    let (first, rest) = path.segments().split_first()?;
    let mut current = match first {
        PathSegment::Key(k) => map.get(k)?,
        PathSegment::Index(_) => return None,
    };
    for segment in rest {
        current = match (segment, current) {
            (PathSegment::Key(key), Value::Object(obj)) => obj.get(key)?,
            (PathSegment::Index(idx), Value::Array(arr)) => arr.get(*idx)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Mutable variant of [`get_at_path`]
pub fn get_at_path_mut<'a>(
    map: &'a mut Map<String, Value>,
    path: &FieldPath,
) -> Option<&'a mut Value> {
    let (first, rest) = path.segments().split_first()?;
    let mut current = match first {
        PathSegment::Key(k) => map.get_mut(k)?,
        PathSegment::Index(_) => return None,
    };
    for segment in rest {
        current = match (segment, current) {
            (PathSegment::Key(key), Value::Object(obj)) => obj.get_mut(key)?,
            (PathSegment::Index(idx), Value::Array(arr)) => arr.get_mut(*idx)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Error type for path mutations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    /// Type mismatch during path traversal
    #[error("type mismatch at '{path}': expected {expected}, found {found}")]
    TypeMismatch {
        /// Path prefix where traversal stopped
        path: String,
        /// Expected type
        expected: &'static str,
        /// Actual type found
        found: &'static str,
    },

    /// Array index out of bounds
    #[error("index out of bounds at '{path}': {index} >= {len}")]
    IndexOutOfBounds {
        /// Path prefix where traversal stopped
        path: String,
        /// The requested index
        index: usize,
        /// The array length
        len: usize,
    },

    /// The root path cannot be set or removed inside a map
    #[error("root path is not addressable")]
    Root,
}

/// Set the value at `path`, creating intermediate objects as needed
///
/// ```
/// use lyceum_core::json::{set_at_path, get_at_path, FieldPath};
/// use serde_json::{json, Map};
///
/// let mut map = Map::new();
/// let path: FieldPath = "school.name".parse().unwrap();
/// set_at_path(&mut map, &path, json!("North")).unwrap();
/// assert_eq!(get_at_path(&map, &path), Some(&json!("North")));
/// ```
pub fn set_at_path(
    map: &mut Map<String, Value>,
    path: &FieldPath,
    value: Value,
) -> Result<(), PathError> {
    let (last, parents) = path.segments().split_last().ok_or(PathError::Root)?;
    let Some((first, rest)) = parents.split_first() else {
        return match last {
            PathSegment::Key(k) => {
                map.insert(k.clone(), value);
                Ok(())
            }
            PathSegment::Index(_) => Err(mismatch(path, 0, "array", "object")),
        };
    };
    let PathSegment::Key(first) = first else {
        return Err(mismatch(path, 0, "array", "object"));
    };

    let mut current = map
        .entry(first.clone())
        .or_insert_with(|| Value::Object(Map::new()));
    for (offset, segment) in rest.iter().enumerate() {
        current = step_mut(current, segment, path, offset + 1)?;
    }

    let depth = parents.len();
    match (last, current) {
        (PathSegment::Key(k), Value::Object(obj)) => {
            obj.insert(k.clone(), value);
            Ok(())
        }
        (PathSegment::Index(idx), Value::Array(arr)) => {
            if *idx < arr.len() {
                arr[*idx] = value;
                Ok(())
            } else if *idx == arr.len() {
                arr.push(value);
                Ok(())
            } else {
                Err(PathError::IndexOutOfBounds {
                    path: prefix(path, depth),
                    index: *idx,
                    len: arr.len(),
                })
            }
        }
        (PathSegment::Key(_), other) => Err(mismatch(path, depth, "object", type_name(other))),
        (PathSegment::Index(_), other) => Err(mismatch(path, depth, "array", type_name(other))),
    }
}

fn prefix(path: &FieldPath, depth: usize) -> String {
    FieldPath::from_segments(path.segments()[..depth].to_vec()).to_string()
}

fn mismatch(path: &FieldPath, depth: usize, expected: &'static str, found: &'static str) -> PathError {
    PathError::TypeMismatch {
        path: prefix(path, depth),
        expected,
        found,
    }
}

fn step_mut<'a>(
    current: &'a mut Value,
    segment: &PathSegment,
    path: &FieldPath,
    depth: usize,
) -> Result<&'a mut Value, PathError> {
    match (segment, current) {
        (PathSegment::Key(k), Value::Object(obj)) => Ok(obj
            .entry(k.clone())
            .or_insert_with(|| Value::Object(Map::new()))),
        (PathSegment::Index(idx), Value::Array(arr)) => {
            let len = arr.len();
            arr.get_mut(*idx).ok_or(PathError::IndexOutOfBounds {
                path: prefix(path, depth),
                index: *idx,
                len,
            })
        }
        (PathSegment::Key(_), other) => Err(mismatch(path, depth, "object", type_name(other))),
        (PathSegment::Index(_), other) => Err(mismatch(path, depth, "array", type_name(other))),
    }
}

/// Remove and return the value at `path`
///
/// Missing paths are not an error; they return `Ok(None)`.
pub fn remove_at_path(
    map: &mut Map<String, Value>,
    path: &FieldPath,
) -> Result<Option<Value>, PathError> {
    let (last, _) = path.segments().split_last().ok_or(PathError::Root)?;
    let parent = match path.parent() {
        Some(p) if p.is_root() => {
            return match last {
                PathSegment::Key(k) => Ok(map.remove(k)),
                PathSegment::Index(_) => Ok(None),
            };
        }
        Some(p) => p,
        None => return Err(PathError::Root),
    };
    let removed = match (last, get_at_path_mut(map, &parent)) {
        (PathSegment::Key(k), Some(Value::Object(obj))) => obj.remove(k),
        (PathSegment::Index(idx), Some(Value::Array(arr))) if *idx < arr.len() => {
            Some(arr.remove(*idx))
        }
        _ => None,
    };
    Ok(removed)
}
