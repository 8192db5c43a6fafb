//! # State Manager
//!
//! Owns the live state tree and composes history, events, subscriptions,
//! validation and the read cache.
//!
//! ## Write pipeline
//!
//! ```text
//! set_state(path, value)
//!   ├─ validate_path            → StateError::Path
//!   ├─ validator.validate       → StateError::Validation
//!   ├─ deep_equal(current, new) → Ok(false), nothing else happens
//!   ├─ set_value_by_path        (new root, old root untouched)
//!   ├─ history.add_state_to_history
//!   ├─ emit "state:changed" {path, value, previousValue, timestamp}
//!   └─ notify subscribers
//! ```
//!
//! Every failure is counted in `module_errors` before it is returned.

use super::stats::Counters;
use super::{
    default_game_state, ReadCache, ReadOptions, StateCallback, StateChange, StateConfig,
    StateError, StateStats, StateSubscriptions, SubscribeOptions, SubscriptionId, WriteOptions,
};
use crate::adapters::SchemaValidator;
use crate::ports::{StateStore, StateValidator};
use ns_02_state_history::{HistoryOptionsUpdate, InvalidationCallback, StateHistory};
use parking_lot::Mutex;
use serde_json::{json, Value};
use shared_bus::{EventDispatcher, STATE_CHANGED, STATE_RESET};
use shared_types::{
    current_timestamp_ms, deep_clone, deep_equal, get_value_by_path, has_wildcard,
    set_value_by_path, validate_path,
};
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct StateManager {
    config: StateConfig,
    default_state: Value,
    current_state: Value,
    history: StateHistory,
    dispatcher: EventDispatcher,
    subscriptions: StateSubscriptions,
    validator: Box<dyn StateValidator>,
    /// Shared with the history invalidation callback.
    cache: Arc<Mutex<ReadCache>>,
    counters: Counters,
}

impl fmt::Debug for StateManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateManager")
            .field("config", &self.config)
            .field("history", &self.history)
            .field("subscriptions", &self.subscriptions)
            .finish_non_exhaustive()
    }
}

impl StateManager {
    /// Manager over the default game state with the game validator.
    pub fn new(config: StateConfig, dispatcher: EventDispatcher) -> Self {
        Self::build(
            config,
            dispatcher,
            default_game_state(),
            Box::new(SchemaValidator::for_game()),
        )
    }

    /// Manager over a caller-supplied default tree. Validation checks value
    /// kinds against that tree only.
    pub fn with_default_state(
        config: StateConfig,
        dispatcher: EventDispatcher,
        default_state: Value,
    ) -> Self {
        let validator = Box::new(SchemaValidator::new(default_state.clone()));
        Self::build(config, dispatcher, default_state, validator)
    }

    #[must_use]
    pub fn with_validator(mut self, validator: Box<dyn StateValidator>) -> Self {
        self.validator = validator;
        self
    }

    fn build(
        config: StateConfig,
        dispatcher: EventDispatcher,
        default_state: Value,
        validator: Box<dyn StateValidator>,
    ) -> Self {
        let cache = Arc::new(Mutex::new(ReadCache::new(config.read_cache_size)));
        let invalidate: InvalidationCallback = {
            let cache = Arc::clone(&cache);
            Arc::new(move || cache.lock().invalidate())
        };

        let current_state = deep_clone(&default_state);
        let mut history = StateHistory::new(config.history_options())
            .with_dispatcher(dispatcher.clone())
            .with_invalidation(invalidate);
        history.initialize(&current_state);

        info!(
            max_history_size = config.max_history_size,
            history = config.enable_history,
            validation = config.enable_validation,
            events = config.enable_events,
            immutable = config.immutable,
            "State manager initialised"
        );

        Self {
            config,
            default_state,
            current_state,
            history,
            dispatcher,
            subscriptions: StateSubscriptions::new(),
            validator,
            cache,
            counters: Counters::default(),
        }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Value at `path` (`""` for the whole tree), `None` if absent.
    ///
    /// With `immutable` set the result is an owned deep copy; otherwise it
    /// borrows the live tree.
    pub fn get_state(&self, path: &str, options: ReadOptions) -> Option<Cow<'_, Value>> {
        if !options.skip_stats {
            self.counters.record_read();
        }
        let value = get_value_by_path(&self.current_state, path)?;
        Some(if self.config.immutable {
            Cow::Owned(deep_clone(value))
        } else {
            Cow::Borrowed(value)
        })
    }

    /// Owned copy of the value at `path`.
    pub fn get(&self, path: &str) -> Option<Value> {
        self.get_state(path, ReadOptions::default())
            .map(Cow::into_owned)
    }

    /// Cached, reference-counted snapshot of the value at `path`.
    ///
    /// Repeated reads between writes share one allocation.
    pub fn get_shared(&self, path: &str) -> Option<Arc<Value>> {
        self.counters.record_read();
        let mut cache = self.cache.lock();
        if let Some(hit) = cache.get(path) {
            return Some(hit);
        }
        let value = Arc::new(deep_clone(get_value_by_path(&self.current_state, path)?));
        cache.put(path, Arc::clone(&value));
        Some(value)
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Write `value` at `path`. Returns `Ok(false)` when the value was
    /// already deep-equal (no history entry, event or notification).
    ///
    /// # Errors
    ///
    /// - `StateError::Path` for an empty or malformed path, or an array
    ///   index past the end
    /// - `StateError::Validation` when the validator rejects the value
    pub fn set_state(
        &mut self,
        path: &str,
        value: Value,
        options: WriteOptions,
    ) -> Result<bool, StateError> {
        if let Err(err) = validate_path(path) {
            warn!(path, error = %err, "Rejected write to malformed path");
            return Err(self.fail(err.into()));
        }

        if self.config.enable_validation && !options.skip_validation {
            if let Err(failure) = self.validator.validate(path, &value, &self.current_state) {
                self.counters.validation_errors += 1;
                warn!(path, reason = %failure, "State validation failed");
                return Err(self.fail(StateError::Validation {
                    path: path.to_string(),
                    reason: failure.reason,
                }));
            }
        }

        let previous = get_value_by_path(&self.current_state, path).cloned();
        if !options.merge && same_value(previous.as_ref(), Some(&value)) {
            return Ok(self.skip_no_op(path));
        }

        let next = match set_value_by_path(&self.current_state, path, value, options.merge) {
            Ok(next) => next,
            Err(err) => {
                warn!(path, error = %err, "State write failed");
                return Err(self.fail(err.into()));
            }
        };
        let current = get_value_by_path(&next, path).cloned();
        if options.merge && same_value(previous.as_ref(), current.as_ref()) {
            return Ok(self.skip_no_op(path));
        }

        let old_root = std::mem::replace(&mut self.current_state, next);
        self.cache.lock().invalidate();

        if self.config.enable_history && !options.skip_history {
            self.history.add_state_to_history(&self.current_state);
        }
        self.counters.writes += 1;

        if self.config.enable_debug {
            debug!(path, previous = ?previous, value = ?current, "State updated");
        }

        if self.config.enable_events && !options.skip_events {
            self.dispatcher.emit(
                STATE_CHANGED,
                json!({
                    "path": path,
                    "value": current,
                    "previousValue": previous,
                    "timestamp": current_timestamp_ms(),
                }),
            );
        }

        self.notify(path, &old_root);
        Ok(true)
    }

    /// [`set_state`](Self::set_state) after yielding to the runtime once.
    pub async fn set_state_async(
        &mut self,
        path: &str,
        value: Value,
        options: WriteOptions,
    ) -> Result<bool, StateError> {
        self.counters.async_operations += 1;
        tokio::task::yield_now().await;
        self.set_state(path, value, options)
    }

    /// Reset the subtree at `path` to its default, or everything for `""`.
    ///
    /// A full reset restores the default tree, re-initialises history, drops
    /// every subscription, zeroes the counters and emits `state:reset`.
    /// A subtree reset is an ordinary `set_state`.
    ///
    /// # Errors
    ///
    /// - `StateError::Path` for a malformed path
    /// - `StateError::MissingDefault` when the default tree has no value there
    pub fn reset_state(&mut self, path: &str) -> Result<bool, StateError> {
        if path.is_empty() {
            self.current_state = deep_clone(&self.default_state);
            self.history.initialize(&self.current_state);
            self.history.reset_operations();
            self.subscriptions.clear();
            self.counters.reset();
            {
                let mut cache = self.cache.lock();
                cache.invalidate();
                cache.reset_stats();
            }

            if self.config.enable_events {
                self.dispatcher.emit(
                    STATE_RESET,
                    json!({
                        "state": self.current_state,
                        "timestamp": current_timestamp_ms(),
                    }),
                );
            }
            info!("State reset to defaults");
            return Ok(true);
        }

        if let Err(err) = validate_path(path) {
            return Err(self.fail(err.into()));
        }
        let Some(default_value) = get_value_by_path(&self.default_state, path).cloned() else {
            return Err(self.fail(StateError::MissingDefault {
                path: path.to_string(),
            }));
        };
        self.set_state(path, default_value, WriteOptions::default())
    }

    /// Run `f` all-or-nothing. On error the state tree and the history log
    /// are restored to their values before `f` ran and the error is returned.
    ///
    /// Events already emitted by `f` are not retracted; subscribers are
    /// notified of the rollback.
    pub fn transaction<T, F>(&mut self, f: F) -> Result<T, StateError>
    where
        F: FnOnce(&mut Self) -> Result<T, StateError>,
    {
        let snapshot = deep_clone(&self.current_state);
        let checkpoint = self.history.checkpoint();

        match f(self) {
            Ok(value) => Ok(value),
            Err(err) => {
                warn!(error = %err, "Transaction failed, rolling back");
                if matches!(err, StateError::Aborted(_)) {
                    self.counters.record_error(err.module(), 1);
                }
                let abandoned = std::mem::replace(&mut self.current_state, snapshot);
                self.history.restore(checkpoint);
                self.cache.lock().invalidate();
                self.counters.rollbacks += 1;
                self.notify("", &abandoned);
                Err(err)
            }
        }
    }

    /// Apply several writes atomically as a single history entry.
    ///
    /// Returns how many writes changed the state. Any failure rolls back
    /// the whole batch.
    pub fn batch_update<I, P>(&mut self, updates: I) -> Result<usize, StateError>
    where
        I: IntoIterator<Item = (P, Value)>,
        P: AsRef<str>,
    {
        let record_history = self.config.enable_history;
        self.transaction(|sm| {
            let options = WriteOptions {
                skip_history: true,
                ..WriteOptions::default()
            };
            let mut changed = 0;
            for (path, value) in updates {
                if sm.set_state(path.as_ref(), value, options)? {
                    changed += 1;
                }
            }
            if changed > 0 && record_history {
                sm.history.add_state_to_history(&sm.current_state);
            }
            debug!(changed, "Batch update applied");
            Ok(changed)
        })
    }

    // =========================================================================
    // History
    // =========================================================================

    /// Step back one snapshot and make it the current state.
    ///
    /// `Ok(None)` when there is nothing to undo.
    ///
    /// # Errors
    ///
    /// `StateError::History` when history is disabled.
    pub fn undo(&mut self) -> Result<Option<Value>, StateError> {
        match self.history.undo() {
            Ok(snapshot) => Ok(snapshot.map(|state| self.install(state))),
            Err(err) => Err(self.fail(err.into())),
        }
    }

    /// Step forward one snapshot and make it the current state.
    ///
    /// # Errors
    ///
    /// `StateError::History` when history is disabled.
    pub fn redo(&mut self) -> Result<Option<Value>, StateError> {
        match self.history.redo() {
            Ok(snapshot) => Ok(snapshot.map(|state| self.install(state))),
            Err(err) => Err(self.fail(err.into())),
        }
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn update_history_options(&mut self, update: HistoryOptionsUpdate) {
        self.history.update_options(update);
        let options = self.history.options();
        self.config.max_history_size = options.max_history_size;
        self.config.enable_history = options.enable_history;
    }

    pub fn history(&self) -> &StateHistory {
        &self.history
    }

    // =========================================================================
    // Subscriptions
    // =========================================================================

    /// Observe changes at `path`. See [`StateSubscriptions`] for which writes
    /// reach which subscribers.
    ///
    /// With `immediate`, the callback runs once right away with the current
    /// value (exact paths only); combined with `once` that call consumes the
    /// subscription.
    pub fn subscribe<F>(
        &mut self,
        path: &str,
        callback: F,
        options: SubscribeOptions,
    ) -> Result<SubscriptionId, StateError>
    where
        F: Fn(&StateChange) + Send + Sync + 'static,
    {
        let callback: StateCallback = Arc::new(callback);
        let id = match self.subscriptions.subscribe(path, Arc::clone(&callback), options) {
            Ok(id) => id,
            Err(err) => return Err(self.fail(err)),
        };

        if options.immediate && !has_wildcard(path) {
            callback(&StateChange {
                path: path.to_string(),
                new_value: get_value_by_path(&self.current_state, path).cloned(),
                old_value: None,
            });
            if options.once {
                self.subscriptions.unsubscribe(id);
            }
        }
        Ok(id)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.subscriptions.unsubscribe(id)
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }

    // =========================================================================
    // Accessors & stats
    // =========================================================================

    pub fn config(&self) -> &StateConfig {
        &self.config
    }

    pub fn dispatcher(&self) -> &EventDispatcher {
        &self.dispatcher
    }

    pub fn default_state(&self) -> &Value {
        &self.default_state
    }

    pub fn stats(&self) -> StateStats {
        StateStats {
            reads: self.counters.reads(),
            writes: self.counters.writes,
            no_op_writes: self.counters.no_op_writes,
            validation_errors: self.counters.validation_errors,
            rollbacks: self.counters.rollbacks,
            async_operations: self.counters.async_operations,
            subscription_count: self.subscriptions.len(),
            history: self.history.stats(),
            events: self.dispatcher.stats(),
            cache: self.cache.lock().stats(),
            module_errors: self.counters.module_errors.clone(),
        }
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn fail(&mut self, err: StateError) -> StateError {
        self.counters.record_error(err.module(), 1);
        err
    }

    fn skip_no_op(&mut self, path: &str) -> bool {
        self.counters.no_op_writes += 1;
        debug!(path, "Write skipped, value unchanged");
        false
    }

    /// Make `state` current after a history step.
    fn install(&mut self, state: Value) -> Value {
        let old_root = std::mem::replace(&mut self.current_state, state);
        self.cache.lock().invalidate();
        self.notify("", &old_root);
        deep_clone(&self.current_state)
    }

    fn notify(&mut self, path: &str, old_root: &Value) {
        if self.subscriptions.is_empty() {
            return;
        }
        let outcome = self.subscriptions.notify(path, old_root, &self.current_state);
        if outcome.failures > 0 {
            self.counters
                .record_error("subscriptions", outcome.failures as u64);
        }
    }
}

fn same_value(a: Option<&Value>, b: Option<&Value>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => deep_equal(a, b),
        (None, None) => true,
        _ => false,
    }
}

impl StateStore for StateManager {
    fn read(&self, path: &str) -> Option<Value> {
        self.get(path)
    }

    fn write(&mut self, path: &str, value: Value) -> Result<bool, StateError> {
        self.set_state(path, value, WriteOptions::default())
    }

    fn undo(&mut self) -> Result<Option<Value>, StateError> {
        StateManager::undo(self)
    }

    fn redo(&mut self) -> Result<Option<Value>, StateError> {
        StateManager::redo(self)
    }
}
