//! Dotted-path access over JSON graphs and connection-shape flattening.
//!
//! Every function here is pure: reads borrow, writes return a new value.

use serde_json::{Map, Value};

/// Keys whose empty list still counts as a (zero-item) connection.
const CONNECTION_LIST_KEYS: [&str; 2] = ["edges", "nodes"];

/// Read the value at a dotted path such as `data.object.customer.email`.
///
/// Numeric segments index into arrays (`variants.0.price`). Any missing
/// segment yields `None`; this never fails.
pub fn get_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return Some(value);
    }
    path.split('.').try_fold(value, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// Return a copy of `value` with `new_value` stored at `path`.
///
/// Missing or non-container intermediate segments become objects. Existing
/// array elements addressed by a numeric segment are descended into.
pub fn set_path(value: &Value, path: &str, new_value: Value) -> Value {
    if path.is_empty() {
        return new_value;
    }
    let segments: Vec<&str> = path.split('.').collect();
    let mut result = value.clone();
    insert_at(&mut result, &segments, new_value);
    result
}

fn insert_at(target: &mut Value, segments: &[&str], new_value: Value) {
    let Some((head, rest)) = segments.split_first() else {
        *target = new_value;
        return;
    };

    if let Value::Array(items) = target {
        if let Some(slot) = head.parse::<usize>().ok().and_then(|i| items.get_mut(i)) {
            insert_at(slot, rest, new_value);
            return;
        }
    }

    if !target.is_object() {
        *target = Value::Object(Map::new());
    }
    if let Value::Object(map) = target {
        let slot = map.entry(head.to_string()).or_insert(Value::Null);
        insert_at(slot, rest, new_value);
    }
}

/// Unwrap a connection-shaped result into a flat item sequence.
///
/// Recognizes a list of single-field wrapper objects (`edges[].node`) either
/// directly in `raw`, in one of its fields, or one level further down
/// (`{products: {edges: [...]}}`). Inside each unwrapped item, fields that
/// are themselves connections become plain arrays of their inner items.
///
/// The one-level-down search only applies when `raw` holds no scalar
/// fields. An object with scalars is an item, so a single product with a
/// nested `variants` connection comes back as that product.
///
/// Input without a connection comes back as a one-element sequence holding
/// the original value, so callers can always iterate.
pub fn flatten_connection(raw: &Value) -> Vec<Value> {
    let connection = as_connection(raw).or_else(|| match raw {
        Value::Object(fields) if !fields.values().any(is_scalar) => {
            fields.values().find_map(as_connection)
        }
        _ => None,
    });

    match connection {
        Some(entries) => entries
            .iter()
            .filter_map(unwrap_entry)
            .map(flatten_nested_connections)
            .collect(),
        None => vec![raw.clone()],
    }
}

/// A connection is either a wrapper list itself or an object with a
/// wrapper-list field.
fn as_connection(value: &Value) -> Option<&Vec<Value>> {
    match value {
        Value::Array(items) if is_wrapper_list(items) => Some(items),
        Value::Object(fields) => fields.iter().find_map(|(key, field)| match field {
            Value::Array(items)
                if is_wrapper_list(items)
                    || (items.is_empty() && CONNECTION_LIST_KEYS.contains(&key.as_str())) =>
            {
                Some(items)
            }
            _ => None,
        }),
        _ => None,
    }
}

fn is_scalar(value: &Value) -> bool {
    matches!(value, Value::String(_) | Value::Number(_) | Value::Bool(_))
}

fn is_wrapper_list(items: &[Value]) -> bool {
    !items.is_empty() && items.iter().all(|entry| unwrap_entry(entry).is_some())
}

/// A wrapper is an object with exactly one field, holding an object.
fn unwrap_entry(entry: &Value) -> Option<Value> {
    match entry {
        Value::Object(fields) if fields.len() == 1 => fields
            .values()
            .next()
            .filter(|inner| inner.is_object())
            .cloned(),
        _ => None,
    }
}

fn flatten_nested_connections(item: Value) -> Value {
    match item {
        Value::Object(fields) => Value::Object(
            fields
                .into_iter()
                .map(|(key, field)| {
                    let flattened = match as_connection(&field) {
                        Some(entries) => {
                            Value::Array(entries.iter().filter_map(unwrap_entry).collect())
                        }
                        None => field,
                    };
                    (key, flattened)
                })
                .collect(),
        ),
        other => other,
    }
}
