//! Field mutation rules shared by all backends.
//!
//! Backends call these while holding their write lock, so the
//! read-apply-write cycle is atomic per store.

use serde_json::Value;

use crate::traits::Fields;

/// Overwrite top-level fields (merge) or replace the document.
pub(crate) fn apply_set(existing: Option<Fields>, incoming: Fields, merge: bool) -> Fields {
    match (existing, merge) {
        (Some(mut current), true) => {
            current.extend(incoming);
            current
        }
        _ => incoming,
    }
}

/// Add values missing from the array field; returns true when anything changed.
pub(crate) fn apply_union(fields: &mut Fields, field: &str, values: Vec<Value>) -> bool {
    let entry = fields
        .entry(field.to_string())
        .or_insert_with(|| Value::Array(Vec::new()));
    let mut changed = false;
    if !entry.is_array() {
        *entry = Value::Array(Vec::new());
        changed = true;
    }
    if let Value::Array(items) = entry {
        for value in values {
            if !items.contains(&value) {
                items.push(value);
                changed = true;
            }
        }
    }
    changed
}

/// Drop every occurrence of the values; returns true when anything changed.
pub(crate) fn apply_remove(fields: &mut Fields, field: &str, values: &[Value]) -> bool {
    match fields.get_mut(field) {
        Some(Value::Array(items)) => {
            let before = items.len();
            items.retain(|item| !values.contains(item));
            items.len() != before
        }
        Some(other) => {
            *other = Value::Array(Vec::new());
            true
        }
        None => false,
    }
}
