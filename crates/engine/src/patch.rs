//! Structural patch engine
//!
//! Pure document mutation. Nothing here touches a store; [`Collection`]
//! loads a record, runs these functions on its document, and writes it
//! back.
//!
//! # Order
//!
//! A request applies `set`, then `unset`, then `remove`, then `add`. An
//! array element named by both `remove` and `add` therefore ends up added.
//!
//! # Arrays
//!
//! Arrays of scalars behave as sets: `add` is union, `remove` is
//! difference. Arrays of objects that carry `id` are sets keyed by id:
//!
//! | Part | Descriptor | Effect |
//! |------|------------|--------|
//! | add | `{id, ..}`, id present | merge into that element |
//! | add | `{id, ..}`, id absent | append |
//! | add | `{..}` without id | append |
//! | remove | `{id}` or `{id, scalar..}` | delete that element |
//! | remove | `{id, field: [..] / {..}}` | subtract nested fields inside that element |
//! | remove | `{field: value..}` without id | delete first element equal on those fields |
//!
//! Subtraction recurses: a nested descriptor is matched and applied with
//! the same rules at every depth.
//!
//! [`Collection`]: crate::Collection

use lyceum_core::{
    get_at_path_mut, remove_at_path, set_at_path, Document, FieldPath, FieldSelector,
    PatchRequest, Result, ID_FIELD,
};
use serde_json::{Map, Value};

/// Apply a validated patch request to a document in place
pub fn apply_patch(doc: &mut Document, request: &PatchRequest) -> Result<()> {
    if let Some(set) = &request.set {
        apply_set(doc, set)?;
    }
    if let Some(unset) = &request.unset {
        apply_unset(doc, unset)?;
    }
    if let Some(remove) = &request.remove {
        apply_remove(doc, remove)?;
    }
    if let Some(add) = &request.add {
        apply_add(doc, add)?;
    }
    Ok(())
}

/// Replace each named field wholesale; dotted keys address nested fields
///
/// `id` is never replaced.
pub fn apply_set(doc: &mut Document, set: &Document) -> Result<()> {
    for (key, value) in set.iter() {
        if key == ID_FIELD {
            continue;
        }
        let path: FieldPath = key.parse()?;
        set_at_path(doc.as_map_mut(), &path, value.clone())?;
    }
    Ok(())
}

/// Remove each named field; missing fields are ignored
pub fn apply_unset(doc: &mut Document, fields: &[String]) -> Result<()> {
    for field in fields {
        let path: FieldPath = field.parse()?;
        if path.segments().len() == 1 && path.first_key() == Some(ID_FIELD) {
            continue;
        }
        remove_at_path(doc.as_map_mut(), &path)?;
    }
    Ok(())
}

/// Subtract values from the named fields
///
/// Missing fields and fields that are not containers are skipped.
pub fn apply_remove(doc: &mut Document, remove: &Document) -> Result<()> {
    for (key, removal) in remove.iter() {
        if key == ID_FIELD {
            continue;
        }
        let path: FieldPath = key.parse()?;
        if let Some(target) = get_at_path_mut(doc.as_map_mut(), &path) {
            remove_value(target, removal);
        }
    }
    Ok(())
}

/// Merge values into the named fields
///
/// A missing field is created: arrays are deduplicated, a lone scalar
/// becomes a one-element array, objects are copied.
pub fn apply_add(doc: &mut Document, add: &Document) -> Result<()> {
    for (key, addition) in add.iter() {
        if key == ID_FIELD {
            continue;
        }
        let path: FieldPath = key.parse()?;
        match get_at_path_mut(doc.as_map_mut(), &path) {
            Some(target) => add_value(target, addition),
            None => {
                let initial = match addition {
                    Value::Array(_) | Value::Object(_) => fresh(addition),
                    scalar => Value::Array(vec![scalar.clone()]),
                };
                set_at_path(doc.as_map_mut(), &path, initial)?;
            }
        }
    }
    Ok(())
}

// =============================================================================
// Remove
// =============================================================================

fn remove_value(target: &mut Value, removal: &Value) {
    match (target, removal) {
        (Value::Array(items), Value::Array(descriptors)) => {
            for descriptor in descriptors {
                remove_from_array(items, descriptor);
            }
        }
        (Value::Array(items), descriptor) => remove_from_array(items, descriptor),
        (Value::Object(obj), Value::Object(fields)) => remove_fields(obj, fields),
        _ => {}
    }
}

fn remove_fields(obj: &mut Map<String, Value>, fields: &Map<String, Value>) {
    for (key, removal) in fields {
        if key == ID_FIELD {
            continue;
        }
        if let Some(target) = obj.get_mut(key) {
            remove_value(target, removal);
        }
    }
}

fn remove_from_array(items: &mut Vec<Value>, descriptor: &Value) {
    let Value::Object(fields) = descriptor else {
        items.retain(|item| item != descriptor);
        return;
    };

    if let Some(id) = fields.get(ID_FIELD) {
        let Some(pos) = items.iter().position(|item| item_id(item) == Some(id)) else {
            return;
        };
        if has_nested(fields) {
            if let Value::Object(element) = &mut items[pos] {
                remove_fields(element, fields);
            }
        } else {
            items.remove(pos);
        }
        return;
    }

    if fields.is_empty() {
        return;
    }
    if let Some(pos) = items.iter().position(|item| matches_fields(item, fields)) {
        items.remove(pos);
    }
}

/// True when a removal descriptor carries sub-structure to subtract
fn has_nested(fields: &Map<String, Value>) -> bool {
    fields
        .iter()
        .any(|(key, value)| key != ID_FIELD && (value.is_array() || value.is_object()))
}

fn matches_fields(item: &Value, fields: &Map<String, Value>) -> bool {
    match item {
        Value::Object(obj) => fields.iter().all(|(key, value)| obj.get(key) == Some(value)),
        _ => false,
    }
}

fn item_id(item: &Value) -> Option<&Value> {
    item.as_object().and_then(|obj| obj.get(ID_FIELD))
}

// =============================================================================
// Add
// =============================================================================

fn add_value(target: &mut Value, addition: &Value) {
    match (target, addition) {
        (Value::Array(items), Value::Array(additions)) => {
            for addition in additions {
                add_to_array(items, addition);
            }
        }
        (Value::Array(items), addition) => add_to_array(items, addition),
        (Value::Object(obj), Value::Object(fields)) => merge_fields(obj, fields),
        (target, addition) => *target = fresh(addition),
    }
}

fn add_to_array(items: &mut Vec<Value>, addition: &Value) {
    match addition {
        Value::Object(fields) => {
            let pos = fields
                .get(ID_FIELD)
                .and_then(|id| items.iter().position(|item| item_id(item) == Some(id)));
            match pos.map(|pos| &mut items[pos]) {
                Some(Value::Object(element)) => merge_fields(element, fields),
                _ => items.push(fresh(addition)),
            }
        }
        scalar => {
            if !items.contains(scalar) {
                items.push(scalar.clone());
            }
        }
    }
}

/// Merge-by-id: arrays union recursively, objects merge recursively,
/// anything else is replaced
fn merge_fields(element: &mut Map<String, Value>, fields: &Map<String, Value>) {
    for (key, incoming) in fields {
        if key == ID_FIELD {
            continue;
        }
        match element.get_mut(key) {
            Some(existing) => add_value(existing, incoming),
            None => {
                element.insert(key.clone(), fresh(incoming));
            }
        }
    }
}

/// Copy of a value with every array in it deduplicated, at any depth
fn fresh(value: &Value) -> Value {
    match value {
        Value::Array(additions) => {
            let mut items = Vec::with_capacity(additions.len());
            for addition in additions {
                add_to_array(&mut items, addition);
            }
            Value::Array(items)
        }
        Value::Object(fields) => Value::Object(
            fields
                .iter()
                .map(|(key, value)| (key.clone(), fresh(value)))
                .collect(),
        ),
        other => other.clone(),
    }
}

// =============================================================================
// Embedded references
// =============================================================================

/// Overwrite the embedded copy of entity `values.id` with `values`' fields
///
/// A scalar selector updates the embedded object; an array selector
/// updates every array element with that id; the root selector updates the
/// document itself. Returns whether anything changed.
pub fn update_reference(doc: &mut Document, selector: &FieldSelector, values: &Document) -> bool {
    let Some(id) = values.get(ID_FIELD).cloned() else {
        return false;
    };
    if selector.is_root() {
        if doc.get(ID_FIELD) != Some(&id) {
            return false;
        }
        return overwrite(doc.as_map_mut(), values.as_map());
    }
    let Some(target) = get_at_path_mut(doc.as_map_mut(), selector.path()) else {
        return false;
    };
    match (selector.is_many(), target) {
        (false, Value::Object(embedded)) if embedded.get(ID_FIELD) == Some(&id) => {
            overwrite(embedded, values.as_map())
        }
        (true, Value::Array(items)) => {
            let mut changed = false;
            for item in items.iter_mut() {
                if let Value::Object(embedded) = item {
                    if embedded.get(ID_FIELD) == Some(&id) {
                        changed |= overwrite(embedded, values.as_map());
                    }
                }
            }
            changed
        }
        _ => false,
    }
}

/// Drop the embedded copy of entity `id`
///
/// A scalar selector reduces the embedded object to `{id}` (tombstone); an
/// array selector removes the matching elements. The root selector never
/// changes anything. Returns whether anything changed.
pub fn delete_reference(doc: &mut Document, selector: &FieldSelector, id: &str) -> bool {
    if selector.is_root() {
        return false;
    }
    let Some(target) = get_at_path_mut(doc.as_map_mut(), selector.path()) else {
        return false;
    };
    match (selector.is_many(), target) {
        (false, Value::Object(embedded)) if embedded_id(embedded) == Some(id) => {
            if embedded.len() == 1 {
                return false;
            }
            embedded.retain(|key, _| key == ID_FIELD);
            true
        }
        (true, Value::Array(items)) => {
            let before = items.len();
            items.retain(|item| {
                item.as_object()
                    .map_or(true, |embedded| embedded_id(embedded) != Some(id))
            });
            items.len() != before
        }
        _ => false,
    }
}

fn embedded_id(embedded: &Map<String, Value>) -> Option<&str> {
    embedded.get(ID_FIELD).and_then(Value::as_str)
}

fn overwrite(target: &mut Map<String, Value>, values: &Map<String, Value>) -> bool {
    let mut changed = false;
    for (key, value) in values {
        if key == ID_FIELD {
            continue;
        }
        if target.get(key) != Some(value) {
            target.insert(key.clone(), value.clone());
            changed = true;
        }
    }
    changed
}
