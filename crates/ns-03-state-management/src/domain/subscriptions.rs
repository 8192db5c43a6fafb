//! # Path Subscriptions
//!
//! Observers keyed by state path, stored in a [`PatternMatcher`].
//!
//! ## Notification rules
//!
//! | Subscription | Fires for a write at `C` when |
//! |--------------|-------------------------------|
//! | exact `P` | `P == C`, `P` is an ancestor of `C`, or `C` is an ancestor of `P`, **and** the value at `P` changed |
//! | glob `P` (`*`/`?`) | `P` matches `C` or a changed path below `C` |
//!
//! Root-level replacements (undo, redo, rollback) are reported with `C = ""`.
//! A glob is called once per changed path it matches, outermost first: once
//! it matches a path, nothing below that path is offered to it again.

use super::{StateError, SubscribeOptions};
use ns_01_pattern_matcher::{PatternId, PatternMatcher, PatternOptions, PatternType};
use serde::Serialize;
use serde_json::Value;
use shared_types::{
    deep_equal, get_value_by_path, has_wildcard, is_ancestor_path, join_path, validate_path,
};
use std::cmp::Reverse;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, error};

pub type SubscriptionId = PatternId;

/// Callback invoked with the change a subscriber observed.
pub type StateCallback = Arc<dyn Fn(&StateChange) + Send + Sync>;

/// What a subscriber sees. `None` means the path did not exist.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StateChange {
    /// The subscribed path for exact subscriptions, the matched changed path
    /// for globs.
    pub path: String,
    pub new_value: Option<Value>,
    pub old_value: Option<Value>,
}

/// Result of one notification pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NotifyOutcome {
    pub notified: usize,
    pub failures: usize,
}

#[derive(Default)]
pub struct StateSubscriptions {
    matcher: PatternMatcher<StateCallback>,
}

impl fmt::Debug for StateSubscriptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateSubscriptions")
            .field("count", &self.matcher.len())
            .finish()
    }
}

impl StateSubscriptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback` for `path`.
    ///
    /// Exact paths must be well formed; glob paths only need to compile.
    pub fn subscribe(
        &mut self,
        path: &str,
        callback: StateCallback,
        options: SubscribeOptions,
    ) -> Result<SubscriptionId, StateError> {
        if !has_wildcard(path) {
            validate_path(path)?;
        }
        let id = self.matcher.register(
            path,
            callback,
            PatternOptions {
                priority: options.priority,
                once: options.once,
            },
        )?;
        debug!(subscription = %id, path, "State subscription added");
        Ok(id)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.matcher.unregister(id)
    }

    pub fn len(&self) -> usize {
        self.matcher.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matcher.is_empty()
    }

    pub fn clear(&mut self) {
        self.matcher.clear();
    }

    /// Notify every subscriber affected by a write at `changed_path`.
    ///
    /// Callbacks run after the subscription table is updated (once-entries
    /// removed), so a callback may not observe itself as still registered.
    /// A panicking callback is logged and counted; the rest still run.
    pub fn notify(&mut self, changed_path: &str, old_root: &Value, new_root: &Value) -> NotifyOutcome {
        let mut entries: Vec<_> = self.matcher.iter().collect();
        entries.sort_by_key(|entry| Reverse(entry.priority));

        let mut changed: Option<Vec<String>> = None;
        let mut pending = Vec::new();
        for entry in entries {
            if entry.pattern_type == PatternType::Exact {
                let watched = entry.pattern.as_str();
                let related = watched == changed_path
                    || is_ancestor_path(watched, changed_path)
                    || is_ancestor_path(changed_path, watched);
                if !related {
                    continue;
                }
                if let Some(change) = change_at(watched, old_root, new_root) {
                    pending.push((entry.id, Arc::clone(&entry.handler), change));
                }
                continue;
            }

            let candidates = changed.get_or_insert_with(|| {
                let mut paths = Vec::new();
                collect_changed(
                    changed_path,
                    get_value_by_path(old_root, changed_path),
                    get_value_by_path(new_root, changed_path),
                    &mut paths,
                );
                paths
            });
            let mut last_match: Option<&str> = None;
            for candidate in candidates.iter() {
                if last_match.is_some_and(|matched| is_ancestor_path(matched, candidate)) {
                    continue;
                }
                if !entry.matches(candidate) {
                    continue;
                }
                last_match = Some(candidate);
                if let Some(change) = change_at(candidate, old_root, new_root) {
                    pending.push((entry.id, Arc::clone(&entry.handler), change));
                }
                if entry.once {
                    break;
                }
            }
        }

        let fired: Vec<SubscriptionId> = pending.iter().map(|(id, _, _)| *id).collect();
        self.matcher.remove_once_patterns(&fired);

        let mut outcome = NotifyOutcome::default();
        for (id, callback, change) in pending {
            outcome.notified += 1;
            if let Err(payload) = catch_unwind(AssertUnwindSafe(|| callback(&change))) {
                outcome.failures += 1;
                let message = payload
                    .downcast_ref::<&str>()
                    .map(|s| (*s).to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "subscriber panicked".to_string());
                error!(subscription = %id, path = %change.path, error = %message, "State subscriber failed");
            }
        }
        outcome
    }
}

/// The change at `path`, or `None` when the value there is the same.
fn change_at(path: &str, old_root: &Value, new_root: &Value) -> Option<StateChange> {
    let old_value = get_value_by_path(old_root, path);
    let new_value = get_value_by_path(new_root, path);
    if same(old_value, new_value) {
        return None;
    }
    Some(StateChange {
        path: path.to_string(),
        new_value: new_value.cloned(),
        old_value: old_value.cloned(),
    })
}

fn same(a: Option<&Value>, b: Option<&Value>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => deep_equal(a, b),
        (None, None) => true,
        _ => false,
    }
}

/// Pre-order list of every path at or below `at` whose value differs between
/// `old` and `new`. The root itself (`""`) is never listed.
fn collect_changed(at: &str, old: Option<&Value>, new: Option<&Value>, out: &mut Vec<String>) {
    if same(old, new) {
        return;
    }
    if !at.is_empty() {
        out.push(at.to_string());
    }

    let mut keys = child_keys(old);
    for key in child_keys(new) {
        if !keys.contains(&key) {
            keys.push(key);
        }
    }
    for key in keys {
        collect_changed(
            &join_path(at, &key),
            old.and_then(|value| child(value, &key)),
            new.and_then(|value| child(value, &key)),
            out,
        );
    }
}

fn child_keys(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Object(map)) => map.keys().cloned().collect(),
        Some(Value::Array(items)) => (0..items.len()).map(|i| i.to_string()).collect(),
        _ => Vec::new(),
    }
}

fn child<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    match value {
        Value::Object(map) => map.get(key),
        Value::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    }
}
