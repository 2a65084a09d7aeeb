//! Field projections
//!
//! A [`Projection`] limits which fields of a document a reader receives.
//! It is either an include-list or an exclude-list of dotted paths; paths
//! that cross an array apply to every element of that array.
//!
//! Wire form is the usual `{field: 1}` / `{field: 0}` map. Include
//! projections always keep `id` unless the map says `"id": 0`.
//!
//! ```
//! use lyceum_core::{Document, Projection};
//! use serde_json::json;
//!
//! let doc = Document::from_value(json!({"id": "s1", "name": "North", "city": "Oslo"})).unwrap();
//! let projected = Projection::fields(["name"]).apply(&doc);
//! assert_eq!(projected.into_value(), json!({"id": "s1", "name": "North"}));
//! ```

use crate::document::{Document, ID_FIELD};
use crate::error::{Error, Result};
use crate::json::{FieldPath, PathSegment};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Include or exclude
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Include,
    Exclude,
}

/// Field selection applied to documents on the way out
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct Projection {
    mode: Mode,
    fields: Vec<FieldPath>,
    keep_id: bool,
}

impl Projection {
    /// Projection that passes every field through
    pub fn all() -> Self {
        Projection {
            mode: Mode::Exclude,
            fields: Vec::new(),
            keep_id: true,
        }
    }

    /// Include-projection over the given dotted paths (plus `id`)
    ///
    /// Unparseable paths are skipped.
    pub fn fields<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut projection = Projection {
            mode: Mode::Include,
            fields: Vec::new(),
            keep_id: true,
        };
        for field in fields {
            if let Ok(path) = field.as_ref().parse::<FieldPath>() {
                projection.push_field(path);
            }
        }
        projection
    }

    /// Exclude-projection over the given dotted paths
    pub fn excluding<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut projection = Projection::all();
        for field in fields {
            if let Ok(path) = field.as_ref().parse::<FieldPath>() {
                projection.push_field(path);
            }
        }
        projection
    }

    /// Parse the `{field: 0|1}` map form
    ///
    /// # Errors
    ///
    /// Returns `Error::Validation` for non-object input, flag values other
    /// than 0/1/true/false, bad paths, or a mix of inclusions and
    /// exclusions (other than `id: 0`).
    pub fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Object(map) => Projection::try_from(map.clone()),
            Value::Null => Ok(Projection::all()),
            _ => Err(Error::validation("projection must be an object")),
        }
    }

    /// True for an include-list
    pub fn is_include(&self) -> bool {
        self.mode == Mode::Include
    }

    /// True when this projection passes every field through
    pub fn is_all(&self) -> bool {
        self.mode == Mode::Exclude && self.fields.is_empty() && self.keep_id
    }

    /// Paths named by the projection
    pub fn paths(&self) -> &[FieldPath] {
        &self.fields
    }

    fn push_field(&mut self, path: FieldPath) {
        if path.is_root() || self.fields.contains(&path) {
            return;
        }
        if path.segments() == [PathSegment::Key(ID_FIELD.to_string())] {
            match self.mode {
                Mode::Include => self.keep_id = true,
                Mode::Exclude => self.keep_id = false,
            }
            return;
        }
        self.fields.push(path);
    }

    /// Merge two projections so the result keeps everything either keeps
    pub fn union(&self, other: &Projection) -> Projection {
        match (self.mode, other.mode) {
            (Mode::Include, Mode::Include) => {
                let mut merged = self.clone();
                for field in &other.fields {
                    merged.push_field(field.clone());
                }
                merged.keep_id = self.keep_id || other.keep_id;
                merged
            }
            (Mode::Exclude, Mode::Exclude) => Projection {
                mode: Mode::Exclude,
                fields: self
                    .fields
                    .iter()
                    .filter(|f| other.fields.contains(f))
                    .cloned()
                    .collect(),
                keep_id: self.keep_id || other.keep_id,
            },
            (Mode::Exclude, Mode::Include) => exclude_minus(self, other),
            (Mode::Include, Mode::Exclude) => exclude_minus(other, self),
        }
    }

    /// Apply to a document, producing a new document
    pub fn apply(&self, doc: &Document) -> Document {
        let mut out = match self.mode {
            Mode::Include => {
                let mut out = Map::new();
                for path in &self.fields {
                    if let Some(picked) = pick(doc.as_map(), path.segments()) {
                        deep_merge_object(&mut out, picked);
                    }
                }
                out
            }
            Mode::Exclude => {
                let mut out = doc.as_map().clone();
                for path in &self.fields {
                    strip(&mut out, path.segments());
                }
                out
            }
        };
        if self.keep_id {
            if let Some(id) = doc.get(ID_FIELD) {
                out.insert(ID_FIELD.to_string(), id.clone());
            }
        } else {
            out.remove(ID_FIELD);
        }
        Document::from_map(out)
    }

    /// Apply to every document of a slice
    pub fn apply_all(&self, docs: &[Document]) -> Vec<Document> {
        docs.iter().map(|d| self.apply(d)).collect()
    }
}

impl Default for Projection {
    fn default() -> Self {
        Projection::all()
    }
}

fn exclude_minus(exclude: &Projection, include: &Projection) -> Projection {
    Projection {
        mode: Mode::Exclude,
        fields: exclude
            .fields
            .iter()
            .filter(|f| !include.fields.iter().any(|i| i.is_ancestor_of(f) || f.is_ancestor_of(i)))
            .cloned()
            .collect(),
        keep_id: exclude.keep_id || include.keep_id,
    }
}

/// Copy of the subtree at `segments`, rooted in a fresh object map
fn pick(map: &Map<String, Value>, segments: &[PathSegment]) -> Option<Map<String, Value>> {
    let (first, rest) = segments.split_first()?;
    let PathSegment::Key(key) = first else {
        return None;
    };
    let value = map.get(key)?;
    let picked = if rest.is_empty() {
        value.clone()
    } else {
        pick_value(value, rest)?
    };
    let mut out = Map::new();
    out.insert(key.clone(), picked);
    Some(out)
}

fn pick_value(value: &Value, segments: &[PathSegment]) -> Option<Value> {
    match (value, segments.first()) {
        (Value::Object(obj), Some(PathSegment::Key(_))) => pick(obj, segments).map(Value::Object),
        // Object elements lacking the field stay as `{}` so sibling paths
        // merge element-wise.
        (Value::Array(arr), Some(PathSegment::Key(_))) => Some(Value::Array(
            arr.iter()
                .filter_map(|elem| match elem {
                    Value::Object(obj) => Some(Value::Object(pick(obj, segments).unwrap_or_default())),
                    Value::Array(_) => pick_value(elem, segments),
                    _ => None,
                })
                .collect(),
        )),
        (Value::Array(arr), Some(PathSegment::Index(idx))) => {
            let elem = arr.get(*idx)?;
            if segments.len() == 1 {
                Some(Value::Array(vec![elem.clone()]))
            } else {
                pick_value(elem, &segments[1..]).map(|v| Value::Array(vec![v]))
            }
        }
        _ => None,
    }
}

/// Merge `src` into `dst`; objects merge by key, equal-length arrays merge
/// element-wise, everything else is replaced.
fn deep_merge_object(dst: &mut Map<String, Value>, src: Map<String, Value>) {
    for (key, value) in src {
        match dst.get_mut(&key) {
            Some(existing) => deep_merge_value(existing, value),
            None => {
                dst.insert(key, value);
            }
        }
    }
}

fn deep_merge_value(dst: &mut Value, src: Value) {
    match (dst, src) {
        (Value::Object(d), Value::Object(s)) => deep_merge_object(d, s),
        (Value::Array(d), Value::Array(s)) if d.len() == s.len() => {
            for (de, se) in d.iter_mut().zip(s) {
                deep_merge_value(de, se);
            }
        }
        (d, s) => *d = s,
    }
}

fn strip(map: &mut Map<String, Value>, segments: &[PathSegment]) {
    let Some((PathSegment::Key(key), rest)) = segments.split_first() else {
        return;
    };
    if rest.is_empty() {
        map.remove(key);
        return;
    }
    if let Some(value) = map.get_mut(key) {
        strip_value(value, rest);
    }
}

fn strip_value(value: &mut Value, segments: &[PathSegment]) {
    match value {
        Value::Object(obj) => strip(obj, segments),
        Value::Array(arr) => {
            for elem in arr.iter_mut() {
                strip_value(elem, segments);
            }
        }
        _ => {}
    }
}

impl TryFrom<Map<String, Value>> for Projection {
    type Error = Error;

    fn try_from(map: Map<String, Value>) -> Result<Self> {
        let mut includes = Vec::new();
        let mut excludes = Vec::new();
        let mut id_flag = None;

        for (field, flag) in &map {
            let on = match flag {
                Value::Bool(b) => *b,
                Value::Number(n) if n.as_i64() == Some(1) => true,
                Value::Number(n) if n.as_i64() == Some(0) => false,
                _ => {
                    return Err(Error::validation(format!(
                        "projection flag for '{}' must be 0 or 1",
                        field
                    )))
                }
            };
            let path: FieldPath = field.parse()?;
            if field == ID_FIELD {
                id_flag = Some(on);
            } else if on {
                includes.push(path);
            } else {
                excludes.push(path);
            }
        }

        if !includes.is_empty() && !excludes.is_empty() {
            return Err(Error::validation(
                "projection cannot mix inclusion and exclusion",
            ));
        }

        let mut projection = if includes.is_empty() && !(id_flag == Some(true) && excludes.is_empty()) {
            Projection {
                mode: Mode::Exclude,
                fields: excludes,
                keep_id: true,
            }
        } else {
            Projection {
                mode: Mode::Include,
                fields: includes,
                keep_id: true,
            }
        };
        if id_flag == Some(false) {
            projection.keep_id = false;
        }
        Ok(projection)
    }
}

impl From<Projection> for Map<String, Value> {
    fn from(projection: Projection) -> Self {
        let flag = if projection.is_include() { 1 } else { 0 };
        let mut map = Map::new();
        if projection.is_include() && projection.keep_id {
            map.insert(ID_FIELD.to_string(), Value::from(1));
        }
        for field in &projection.fields {
            map.insert(field.to_string(), Value::from(flag));
        }
        if !projection.keep_id {
            map.insert(ID_FIELD.to_string(), Value::from(0));
        }
        map
    }
}
