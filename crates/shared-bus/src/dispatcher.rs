//! # Event Dispatcher
//!
//! Publishing side of the bus and the listener table it fans out to.

use crate::event_log::EventLog;
use crate::events::{error_payload, EventRecord, ERROR_EVENT};
use crate::listener::{HandlerError, HandlerResult, Listener, ListenerId, ListenerOptions, Unsubscribe};
use crate::DEFAULT_HISTORY_SIZE;
use parking_lot::RwLock;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use shared_types::{compile_glob, has_wildcard};
use std::collections::{HashMap, VecDeque};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, warn};

/// Errors from dispatcher operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// Event names must be non-empty.
    #[error("Event name must be a non-empty string")]
    EmptyEventName,

    /// A wildcard pattern failed to compile.
    #[error("Invalid event pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },
}

/// Per-emit options.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EmitOptions {
    /// Queue handler invocations for the next `process_deferred` tick instead
    /// of running them inline.
    pub deferred: bool,
}

impl EmitOptions {
    pub fn deferred() -> Self {
        Self { deferred: true }
    }
}

/// Dispatcher counters for diagnostics.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DispatcherStats {
    pub events_emitted: u64,
    pub handlers_invoked: u64,
    pub handler_errors: u64,
    pub deferred_dispatches: u64,
    pub listener_count: usize,
    pub event_names: usize,
    pub wildcard_patterns: usize,
    pub history_len: usize,
    pub pending_deferred: usize,
}

#[derive(Debug)]
struct DeferredCall {
    listener: Listener,
    event_name: String,
    data: Value,
}

/// Shared dispatcher state.
#[derive(Debug)]
pub(crate) struct DispatcherInner {
    /// Listeners by key, sorted by descending priority (stable).
    listeners: HashMap<String, Vec<Listener>>,
    /// One compiled regex per distinct wildcard key.
    wildcard_patterns: HashMap<String, Regex>,
    history: EventLog,
    deferred: VecDeque<DeferredCall>,
    next_id: u64,
    stats: DispatcherStats,
}

impl DispatcherInner {
    fn new(history_size: usize) -> Self {
        Self {
            listeners: HashMap::new(),
            wildcard_patterns: HashMap::new(),
            history: EventLog::new(history_size),
            deferred: VecDeque::new(),
            next_id: 1,
            stats: DispatcherStats::default(),
        }
    }

    /// Remove one listener (`Some(id)`) or every listener (`None`) under `key`.
    /// Drops the key and its compiled pattern once no listener remains.
    pub(crate) fn remove_listeners(&mut self, key: &str, id: Option<ListenerId>) -> usize {
        let Some(listeners) = self.listeners.get_mut(key) else {
            return 0;
        };

        let before = listeners.len();
        match id {
            Some(id) => listeners.retain(|listener| listener.id != id),
            None => listeners.clear(),
        }
        let removed = before - listeners.len();

        if listeners.is_empty() {
            self.listeners.remove(key);
            self.wildcard_patterns.remove(key);
        }
        removed
    }

    /// Direct listeners plus every wildcard listener matching `event_name`,
    /// ordered by priority (desc) then registration (asc).
    fn collect_listeners(&self, event_name: &str) -> Vec<Listener> {
        let mut matched: Vec<Listener> = self
            .listeners
            .get(event_name)
            .cloned()
            .unwrap_or_default();

        for (pattern, regex) in &self.wildcard_patterns {
            // Listeners registered under the literal name are already in.
            if pattern == event_name || !regex.is_match(event_name) {
                continue;
            }
            if let Some(listeners) = self.listeners.get(pattern) {
                matched.extend(listeners.iter().cloned());
            }
        }

        matched.sort_by(|a, b| b.priority.cmp(&a.priority).then(a.id.cmp(&b.id)));
        matched
    }

    fn listener_count(&self) -> usize {
        self.listeners.values().map(Vec::len).sum()
    }
}

/// Priority-ordered, wildcard-aware publish/subscribe bus.
///
/// Cloning yields another handle to the same bus.
#[derive(Clone, Debug)]
pub struct EventDispatcher {
    inner: Arc<RwLock<DispatcherInner>>,
}

impl EventDispatcher {
    /// Create a dispatcher with the default event log size.
    #[must_use]
    pub fn new() -> Self {
        Self::with_history_size(DEFAULT_HISTORY_SIZE)
    }

    /// Create a dispatcher whose event log keeps `history_size` entries.
    #[must_use]
    pub fn with_history_size(history_size: usize) -> Self {
        Self {
            inner: Arc::new(RwLock::new(DispatcherInner::new(history_size))),
        }
    }

    /// Subscribe `handler` to `event_name`.
    ///
    /// Names containing `*` or `?` are wildcard subscriptions matched against
    /// every emitted name.
    ///
    /// # Errors
    ///
    /// - `DispatchError::EmptyEventName` for an empty name
    /// - `DispatchError::InvalidPattern` if a wildcard name fails to compile
    pub fn on<F>(
        &self,
        event_name: &str,
        handler: F,
        options: ListenerOptions,
    ) -> Result<Unsubscribe, DispatchError>
    where
        F: Fn(&Value, &str) -> HandlerResult + Send + Sync + 'static,
    {
        if event_name.is_empty() {
            return Err(DispatchError::EmptyEventName);
        }

        let mut inner = self.inner.write();

        if has_wildcard(event_name) && !inner.wildcard_patterns.contains_key(event_name) {
            let regex = compile_glob(event_name).map_err(|e| DispatchError::InvalidPattern {
                pattern: event_name.to_string(),
                reason: e.to_string(),
            })?;
            inner.wildcard_patterns.insert(event_name.to_string(), regex);
        }

        let id = ListenerId(inner.next_id);
        inner.next_id += 1;

        let listeners = inner.listeners.entry(event_name.to_string()).or_default();
        // Insert after every listener of equal or higher priority.
        let position = listeners.partition_point(|l| l.priority >= options.priority);
        listeners.insert(
            position,
            Listener {
                id,
                key: event_name.to_string(),
                priority: options.priority,
                once: options.once,
                handler: Arc::new(handler),
            },
        );

        debug!(
            event = event_name,
            listener = id.0,
            priority = options.priority,
            once = options.once,
            "Listener subscribed"
        );

        Ok(Unsubscribe::new(&self.inner, event_name, id))
    }

    /// `on` with `once = true`.
    pub fn once<F>(
        &self,
        event_name: &str,
        handler: F,
        options: ListenerOptions,
    ) -> Result<Unsubscribe, DispatchError>
    where
        F: Fn(&Value, &str) -> HandlerResult + Send + Sync + 'static,
    {
        self.on(event_name, handler, options.once())
    }

    /// Remove one listener, or all listeners of `event_name` when `id` is
    /// `None`. Returns how many were removed.
    pub fn off(&self, event_name: &str, id: Option<ListenerId>) -> usize {
        let removed = self.inner.write().remove_listeners(event_name, id);
        debug!(event = event_name, removed, "Listeners unsubscribed");
        removed
    }

    /// Emit inline. Returns whether any listener matched.
    pub fn emit(&self, event_name: &str, data: Value) -> bool {
        self.emit_with(event_name, data, EmitOptions::default())
    }

    /// Emit with options. Returns whether any listener matched.
    pub fn emit_with(&self, event_name: &str, data: Value, options: EmitOptions) -> bool {
        let matched = {
            let mut inner = self.inner.write();
            inner.history.push(EventRecord::new(event_name, data.clone()));
            inner.stats.events_emitted += 1;
            inner.collect_listeners(event_name)
        };

        if matched.is_empty() {
            debug!(event = event_name, "Event emitted (no listeners)");
            return false;
        }

        debug!(
            event = event_name,
            listeners = matched.len(),
            deferred = options.deferred,
            "Event emitted"
        );

        if options.deferred {
            let mut inner = self.inner.write();
            for listener in &matched {
                inner.deferred.push_back(DeferredCall {
                    listener: listener.clone(),
                    event_name: event_name.to_string(),
                    data: data.clone(),
                });
            }
            inner.stats.deferred_dispatches += matched.len() as u64;
        } else {
            for listener in &matched {
                self.invoke(listener, event_name, &data);
            }
        }

        let fired_once: Vec<&Listener> = matched.iter().filter(|l| l.once).collect();
        if !fired_once.is_empty() {
            let mut inner = self.inner.write();
            for listener in fired_once {
                inner.remove_listeners(&listener.key, Some(listener.id));
            }
        }

        true
    }

    /// Run every invocation queued by deferred emits. Invocations queued while
    /// this runs wait for the next call. Returns how many ran.
    pub fn process_deferred(&self) -> usize {
        let calls: Vec<DeferredCall> = self.inner.write().deferred.drain(..).collect();
        for call in &calls {
            self.invoke(&call.listener, &call.event_name, &call.data);
        }
        calls.len()
    }

    fn invoke(&self, listener: &Listener, event_name: &str, data: &Value) {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| (listener.handler)(data, event_name)));
        let failure = match outcome {
            Ok(Ok(())) => None,
            Ok(Err(err)) => Some(err),
            Err(payload) => Some(HandlerError::from_panic(payload)),
        };

        {
            let mut inner = self.inner.write();
            inner.stats.handlers_invoked += 1;
            if failure.is_some() {
                inner.stats.handler_errors += 1;
            }
        }

        let Some(err) = failure else {
            return;
        };

        error!(
            event = event_name,
            listener = listener.id.0,
            error = %err,
            "Event handler failed"
        );

        if event_name == ERROR_EVENT {
            warn!(listener = listener.id.0, "Error handler failed; not re-emitting");
            return;
        }
        self.emit(ERROR_EVENT, error_payload(event_name, &err.message, listener.id.0));
    }

    /// Remove every registered key matching `pattern` (a `*`/`?` glob).
    /// Returns how many keys were removed.
    pub fn remove_all_matching(&self, pattern: &str) -> Result<usize, DispatchError> {
        let regex = compile_glob(pattern).map_err(|e| DispatchError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;

        let mut inner = self.inner.write();
        let keys: Vec<String> = inner
            .listeners
            .keys()
            .filter(|key| regex.is_match(key))
            .cloned()
            .collect();
        for key in &keys {
            inner.remove_listeners(key, None);
        }

        debug!(pattern, removed = keys.len(), "Removed matching event names");
        Ok(keys.len())
    }

    /// The most recent `limit` emitted events, oldest first.
    pub fn event_history(&self, limit: usize) -> Vec<EventRecord> {
        self.inner.read().history.recent(limit)
    }

    /// Listeners registered under exactly `event_name`.
    pub fn listener_count(&self, event_name: &str) -> usize {
        self.inner
            .read()
            .listeners
            .get(event_name)
            .map_or(0, Vec::len)
    }

    /// Registered keys, sorted.
    pub fn event_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.read().listeners.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn has_listeners(&self, event_name: &str) -> bool {
        !self.inner.read().collect_listeners(event_name).is_empty()
    }

    pub fn stats(&self) -> DispatcherStats {
        let inner = self.inner.read();
        DispatcherStats {
            listener_count: inner.listener_count(),
            event_names: inner.listeners.len(),
            wildcard_patterns: inner.wildcard_patterns.len(),
            history_len: inner.history.len(),
            pending_deferred: inner.deferred.len(),
            ..inner.stats.clone()
        }
    }

    /// Drop all listeners, compiled patterns, pending deferred calls and the
    /// event log in one step.
    pub fn clear(&self) {
        let mut inner = self.inner.write();
        inner.listeners.clear();
        inner.wildcard_patterns.clear();
        inner.deferred.clear();
        inner.history.clear();
        debug!("Event dispatcher cleared");
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new()
    }
}
