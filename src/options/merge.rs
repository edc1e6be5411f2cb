//! Remote Options Merger
//!
//! The backend stores user options as one blob per user; this client only
//! understands some of its keys. Saving therefore never sends a bare delta:
//! the delta is merged into the previously-fetched blob so unknown keys
//! written by other clients (or newer versions) pass through untouched.
//!
//! [`merge`] is pure and deterministic on purpose: the engine uses the same
//! function once to decide whether a save would change anything at all and
//! once to build the payload it actually persists.

use serde_json::{Map, Value};

/// Merge a partial field update into the stored options blob.
///
/// For every path in `paths_to_default`, in order:
/// 1. keys missing at the path are filled from `defaults` (first save for a
///    never-configured scope),
/// 2. every key present in `new_values` is overlaid on top (absence models
///    an untouched field).
///
/// All other keys of `stored` - including ones this client does not
/// understand - are returned unchanged. Non-object nodes along a path are
/// replaced by objects.
pub fn merge(
    stored: &Value,
    paths_to_default: &[Vec<String>],
    defaults: Option<&Map<String, Value>>,
    new_values: &Map<String, Value>,
) -> Value {
    let mut result = match stored {
        Value::Object(_) => stored.clone(),
        _ => Value::Object(Map::new()),
    };

    for path in paths_to_default {
        let section = ensure_object_at(&mut result, path);
        if let Some(defaults) = defaults {
            for (key, value) in defaults {
                section.entry(key.clone()).or_insert_with(|| value.clone());
            }
        }
        for (key, value) in new_values {
            section.insert(key.clone(), value.clone());
        }
    }

    result
}

fn ensure_object_at<'a>(root: &'a mut Value, path: &[String]) -> &'a mut Map<String, Value> {
    let mut node = root;
    for key in path {
        if !node.is_object() {
            *node = Value::Object(Map::new());
        }
        let map = node.as_object_mut().expect("node was just made an object");
        node = map.entry(key.clone()).or_insert_with(|| Value::Object(Map::new()));
    }
    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    node.as_object_mut().expect("node was just made an object")
}
