//! # Path Utilities
//!
//! Dot-notation addressing over the dynamic state tree.
//!
//! ## Semantics
//!
//! - Object segments address keys; numeric segments index arrays.
//! - Reads are total: any missing or non-traversable segment yields `None`.
//! - Writes return a new root. Missing intermediates are created as empty
//!   objects, and a scalar sitting on an intermediate segment is replaced by
//!   an empty object. Arrays are never replaced: a non-numeric segment under
//!   an array is an error.
//! - `merge = true` shallow-merges two objects at the final segment; every
//!   other combination replaces the existing value outright.

use crate::{PathError, PATH_SEPARATOR, REFERENCE_PREFIX};
use serde_json::{Map, Value};

/// Check that a path is non-empty and has no empty segments.
pub fn validate_path(path: &str) -> Result<(), PathError> {
    if path.is_empty() {
        return Err(PathError::Empty);
    }
    if let Some(position) = path.split(PATH_SEPARATOR).position(str::is_empty) {
        return Err(PathError::Malformed {
            path: path.to_string(),
            position,
        });
    }
    Ok(())
}

/// Split a validated path into its segments.
pub fn split_path(path: &str) -> Result<Vec<&str>, PathError> {
    validate_path(path)?;
    Ok(path.split(PATH_SEPARATOR).collect())
}

/// Read the value at `path`. The empty path addresses the root itself.
pub fn get_value_by_path<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return Some(root);
    }
    path.split(PATH_SEPARATOR)
        .try_fold(root, |current, segment| child(current, segment))
}

fn child<'a>(value: &'a Value, segment: &str) -> Option<&'a Value> {
    match value {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    }
}

/// Return a new root with `value` installed at `path`.
///
/// # Errors
///
/// - `PathError::Empty` / `PathError::Malformed` for invalid paths
/// - `PathError::IndexOutOfBounds` when an array index is past `len`
///   (an index equal to `len` appends)
/// - `PathError::NotAnIndex` when a non-numeric segment addresses an array
pub fn set_value_by_path(
    root: &Value,
    path: &str,
    value: Value,
    merge: bool,
) -> Result<Value, PathError> {
    let segments = split_path(path)?;
    let mut new_root = deep_clone(root);
    set_in(&mut new_root, &segments, value, merge, path)?;
    Ok(new_root)
}

fn set_in(
    target: &mut Value,
    segments: &[&str],
    value: Value,
    merge: bool,
    path: &str,
) -> Result<(), PathError> {
    match segments {
        [] => {
            *target = value;
            Ok(())
        }
        [last] => install(target, last, value, merge, path),
        [head, rest @ ..] => {
            let slot = slot_mut(target, head, path)?;
            if !slot.is_object() && !slot.is_array() {
                *slot = Value::Object(Map::new());
            }
            set_in(slot, rest, value, merge, path)
        }
    }
}

/// Locate (creating if needed) the child slot for `segment`.
fn slot_mut<'a>(
    target: &'a mut Value,
    segment: &str,
    path: &str,
) -> Result<&'a mut Value, PathError> {
    let index = segment.parse::<usize>().ok().filter(|_| target.is_array());
    match (target, index) {
        (Value::Array(items), Some(index)) => {
            let len = items.len();
            match index.cmp(&len) {
                std::cmp::Ordering::Less => Ok(&mut items[index]),
                std::cmp::Ordering::Equal => {
                    items.push(Value::Object(Map::new()));
                    Ok(&mut items[index])
                }
                std::cmp::Ordering::Greater => Err(PathError::IndexOutOfBounds {
                    path: path.to_string(),
                    index,
                    len,
                }),
            }
        }
        (Value::Array(_), None) => Err(not_an_index(path, segment)),
        (target, _) => Ok(ensure_object(target)
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()))),
    }
}

/// Replace any non-object with an empty object and return its map.
fn ensure_object(target: &mut Value) -> &mut Map<String, Value> {
    if !target.is_object() {
        *target = Value::Object(Map::new());
    }
    match target {
        Value::Object(map) => map,
        _ => unreachable!("target was just replaced by an object"),
    }
}

fn install(
    target: &mut Value,
    segment: &str,
    value: Value,
    merge: bool,
    path: &str,
) -> Result<(), PathError> {
    if let (Value::Array(items), Ok(index)) = (&mut *target, segment.parse::<usize>()) {
        let len = items.len();
        return match index.cmp(&len) {
            std::cmp::Ordering::Less => {
                let merged = merge_or_replace(&items[index], value, merge);
                items[index] = merged;
                Ok(())
            }
            std::cmp::Ordering::Equal => {
                items.push(value);
                Ok(())
            }
            std::cmp::Ordering::Greater => Err(PathError::IndexOutOfBounds {
                path: path.to_string(),
                index,
                len,
            }),
        };
    }

    if target.is_array() {
        return Err(not_an_index(path, segment));
    }
    let map = ensure_object(target);
    let next = match map.get(segment) {
        Some(existing) => merge_or_replace(existing, value, merge),
        None => value,
    };
    map.insert(segment.to_string(), next);
    Ok(())
}

fn not_an_index(path: &str, segment: &str) -> PathError {
    PathError::NotAnIndex {
        path: path.to_string(),
        segment: segment.to_string(),
    }
}

fn merge_or_replace(existing: &Value, value: Value, merge: bool) -> Value {
    match (merge, existing, value) {
        (true, Value::Object(current), Value::Object(incoming)) => {
            let mut merged = current.clone();
            merged.extend(incoming);
            Value::Object(merged)
        }
        (_, _, value) => value,
    }
}

/// Structural copy of a value. `Value` owns all of its children, so the copy
/// shares nothing with the source.
pub fn deep_clone(value: &Value) -> Value {
    value.clone()
}

/// Recursive value equality.
///
/// Numbers compare numerically (`1` equals `1.0`), arrays never equal objects,
/// and objects must have exactly the same key set.
pub fn deep_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            if let (Some(x), Some(y)) = (x.as_i64(), y.as_i64()) {
                x == y
            } else if let (Some(x), Some(y)) = (x.as_u64(), y.as_u64()) {
                x == y
            } else {
                match (x.as_f64(), y.as_f64()) {
                    (Some(x), Some(y)) => x == y,
                    _ => x == y,
                }
            }
        }
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(l, r)| deep_equal(l, r))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x
                    .iter()
                    .all(|(key, l)| y.get(key).is_some_and(|r| deep_equal(l, r)))
        }
        _ => a == b,
    }
}

/// The parent of a path (`"a.b.c"` → `"a.b"`, `"a"` → `""`).
pub fn parent_path(path: &str) -> &str {
    path.rsplit_once(PATH_SEPARATOR)
        .map(|(parent, _)| parent)
        .unwrap_or("")
}

/// Append one segment to a path. Joining onto `""` yields the segment itself.
pub fn join_path(parent: &str, segment: &str) -> String {
    if parent.is_empty() {
        segment.to_string()
    } else {
        format!("{parent}{PATH_SEPARATOR}{segment}")
    }
}

/// True if `ancestor` is a strict ancestor of `descendant`. The empty path is
/// the ancestor of every non-empty path.
pub fn is_ancestor_path(ancestor: &str, descendant: &str) -> bool {
    if ancestor.is_empty() {
        return !descendant.is_empty();
    }
    descendant.len() > ancestor.len()
        && descendant.starts_with(ancestor)
        && descendant[ancestor.len()..].starts_with(PATH_SEPARATOR)
}

/// Resolve a reference against the state tree.
///
/// - `"$game.player.maxHealth"` is an absolute path.
/// - `"maxHealth"` is looked up as a sibling of `context_path`
///   (context `game.player.health` resolves `game.player.maxHealth`).
pub fn resolve_reference(
    reference: &str,
    state: &Value,
    context_path: &str,
) -> Result<Value, PathError> {
    let target = match reference.strip_prefix(REFERENCE_PREFIX) {
        Some(absolute) => absolute.to_string(),
        None => match parent_path(context_path) {
            "" => reference.to_string(),
            parent => format!("{parent}{PATH_SEPARATOR}{reference}"),
        },
    };

    if validate_path(&target).is_err() {
        return Err(PathError::UnresolvedReference {
            reference: reference.to_string(),
        });
    }

    get_value_by_path(state, &target)
        .map(deep_clone)
        .ok_or_else(|| PathError::UnresolvedReference {
            reference: reference.to_string(),
        })
}

/// [`resolve_reference`] with a caller-supplied fallback.
pub fn resolve_reference_or(
    reference: &str,
    state: &Value,
    context_path: &str,
    fallback: Value,
) -> Value {
    resolve_reference(reference, state, context_path).unwrap_or(fallback)
}

/// Approximate in-memory size of a value in bytes. Diagnostics only.
pub fn estimate_size(value: &Value) -> usize {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 4,
        Value::Number(_) => 8,
        Value::String(s) => s.len() * 2,
        Value::Array(items) => items.iter().map(estimate_size).sum(),
        Value::Object(map) => map
            .iter()
            .map(|(key, v)| key.len() * 2 + estimate_size(v))
            .sum(),
    }
}
