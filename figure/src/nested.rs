//! Deep get/set/delete/merge on nested values.

use tracing::warn;

use crate::path::{is_blocked_key, KeyPath, PathSegment};
use crate::value::{Map, Value};

/// Returns the value at `path`, if present.
#[must_use]
pub fn get<'a>(root: &'a Value, path: &KeyPath) -> Option<&'a Value> {
    path.segments()
        .iter()
        .try_fold(root, |node, segment| match (segment, node) {
            (PathSegment::Key(key), Value::Object(map)) => map.get(key),
            (PathSegment::Index(index), Value::Array(items)) => items.get(*index),
            _ => None,
        })
}

/// How far past its end a write may extend an array.
pub const MAX_ARRAY_GROWTH: usize = 65_536;

/// Writes `value` at `path`, creating intermediate containers.
///
/// An intermediate index segment creates an array, a key segment an object.
/// Anything already in the way of a container is overwritten. Blocked paths
/// are ignored, as are writes that would pad an array by more than
/// [`MAX_ARRAY_GROWTH`] elements.
pub fn set(root: &mut Value, path: &KeyPath, value: Value) {
    if path.is_blocked() {
        warn!(path = %path, "refusing to write blocked property path");
        return;
    }
    if !within_growth(Some(root), path.segments()) {
        warn!(path = %path, limit = MAX_ARRAY_GROWTH, "refusing to grow array past limit");
        return;
    }
    set_in(root, path.segments(), value);
}

fn within_growth(node: Option<&Value>, segments: &[PathSegment]) -> bool {
    let Some((first, rest)) = segments.split_first() else {
        return true;
    };
    match first {
        PathSegment::Key(key) => within_growth(node.and_then(|node| node.get(key)), rest),
        PathSegment::Index(index) => {
            let (len, child) = match node {
                Some(Value::Array(items)) => (items.len(), items.get(*index)),
                Some(Value::Typed(array)) => (array.len(), None),
                _ => (0, None),
            };
            *index <= len.saturating_add(MAX_ARRAY_GROWTH) && within_growth(child, rest)
        }
    }
}

fn set_in(node: &mut Value, segments: &[PathSegment], value: Value) {
    let Some((first, rest)) = segments.split_first() else {
        *node = value;
        return;
    };
    match first {
        PathSegment::Key(key) => {
            if !matches!(node, Value::Object(_)) {
                *node = Value::object();
            }
            let Value::Object(map) = node else {
                return;
            };
            let child = map.entry(key.clone()).or_insert(Value::Undefined);
            set_in(child, rest, value);
        }
        PathSegment::Index(index) => {
            if let (Value::Typed(array), true, Some(number)) =
                (&mut *node, rest.is_empty(), value.as_f64())
            {
                if array.set(*index, number) {
                    return;
                }
            }
            if let Value::Typed(array) = node {
                *node = Value::Array(array.to_values());
            }
            if !matches!(node, Value::Array(_)) {
                *node = Value::Array(Vec::new());
            }
            let Value::Array(items) = node else {
                return;
            };
            let Some(needed) = index.checked_add(1) else {
                return;
            };
            if items.len() < needed {
                items.resize(needed, Value::Null);
            }
            set_in(&mut items[*index], rest, value);
        }
    }
}

/// Removes the value at `path` and returns it.
///
/// Object parents emptied by the removal are pruned. Array elements are
/// nulled instead of removed so sibling positions stay stable.
pub fn delete(root: &mut Value, path: &KeyPath) -> Option<Value> {
    if path.is_blocked() {
        warn!(path = %path, "refusing to delete blocked property path");
        return None;
    }
    delete_in(root, path.segments())
}

fn delete_in(node: &mut Value, segments: &[PathSegment]) -> Option<Value> {
    let (first, rest) = segments.split_first()?;
    match (first, node) {
        (PathSegment::Key(key), Value::Object(map)) => {
            if rest.is_empty() {
                return map.remove(key);
            }
            let child = map.get_mut(key)?;
            let removed = delete_in(child, rest)?;
            if matches!(child, Value::Object(inner) if inner.is_empty()) {
                map.remove(key);
            }
            Some(removed)
        }
        (PathSegment::Index(index), Value::Array(items)) => {
            let child = items.get_mut(*index)?;
            if rest.is_empty() {
                return Some(std::mem::replace(child, Value::Null));
            }
            delete_in(child, rest)
        }
        _ => None,
    }
}

/// Assigns with edit semantics: `Null` deletes, `Undefined` does nothing,
/// anything else is written.
pub fn assign(root: &mut Value, path: &KeyPath, value: Value) {
    match value {
        Value::Undefined => {}
        Value::Null => {
            delete(root, path);
        }
        value => set(root, path, value),
    }
}

/// Deep-merges `patch` into `target`.
///
/// Objects merge key by key; any other patch value replaces the target.
/// `Null` entries delete, `Undefined` entries are skipped.
pub fn merge(target: &mut Value, patch: Value) {
    match (target, patch) {
        (Value::Object(dst), Value::Object(src)) => merge_maps(dst, src),
        (_, Value::Undefined) => {}
        (dst, src) => *dst = src,
    }
}

fn merge_maps(dst: &mut Map, src: Map) {
    for (key, value) in src {
        if is_blocked_key(&key) {
            warn!(key = %key, "refusing to merge blocked key");
            continue;
        }
        match value {
            Value::Undefined => {}
            Value::Null => {
                dst.remove(&key);
            }
            value => merge(dst.entry(key).or_insert(Value::Undefined), value),
        }
    }
}
