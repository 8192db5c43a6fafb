//! # State History
//!
//! Linear undo/redo over deep-cloned snapshots.

use super::{HistoryError, HistoryOptions, HistoryOptionsUpdate};
use serde::Serialize;
use serde_json::{json, Value};
use shared_bus::{EventDispatcher, STATE_REDO, STATE_UNDO};
use shared_types::{deep_clone, estimate_size};
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Called whenever the stored history changes so readers can drop caches.
pub type InvalidationCallback = Arc<dyn Fn() + Send + Sync>;

/// Diagnostics snapshot.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct HistoryStats {
    pub enabled: bool,
    pub entries: usize,
    pub history_index: Option<usize>,
    pub max_history_size: usize,
    /// Successful undo + redo steps.
    pub history_operations: u64,
    /// Approximate bytes held by stored snapshots.
    pub memory_bytes: usize,
}

/// Saved history position used to roll back a failed transaction.
#[derive(Clone, Debug, PartialEq)]
pub struct HistoryCheckpoint {
    entries: VecDeque<Value>,
    history_index: Option<usize>,
}

pub struct StateHistory {
    history: VecDeque<Value>,
    history_index: Option<usize>,
    options: HistoryOptions,
    dispatcher: Option<EventDispatcher>,
    on_invalidate: Option<InvalidationCallback>,
    history_operations: u64,
}

impl fmt::Debug for StateHistory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateHistory")
            .field("entries", &self.history.len())
            .field("history_index", &self.history_index)
            .field("options", &self.options)
            .field("history_operations", &self.history_operations)
            .finish_non_exhaustive()
    }
}

impl StateHistory {
    #[must_use]
    pub fn new(options: HistoryOptions) -> Self {
        Self {
            history: VecDeque::new(),
            history_index: None,
            options,
            dispatcher: None,
            on_invalidate: None,
            history_operations: 0,
        }
    }

    /// Emit `state:undo` / `state:redo` through `dispatcher`.
    #[must_use]
    pub fn with_dispatcher(mut self, dispatcher: EventDispatcher) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    /// Run `callback` whenever the stored history changes.
    #[must_use]
    pub fn with_invalidation(mut self, callback: InvalidationCallback) -> Self {
        self.on_invalidate = Some(callback);
        self
    }

    /// Reset to a single snapshot of `state` (or to empty when disabled).
    pub fn initialize(&mut self, state: &Value) {
        self.history.clear();
        if self.options.enable_history {
            self.history.push_back(deep_clone(state));
            self.history_index = Some(0);
        } else {
            self.history_index = None;
        }
        self.invalidate();
    }

    /// Append a snapshot. Any redo-able snapshots after the cursor are
    /// discarded first; the oldest snapshots are dropped to stay in bound.
    pub fn add_state_to_history(&mut self, state: &Value) {
        if !self.options.enable_history {
            return;
        }

        if let Some(index) = self.history_index {
            if index + 1 < self.history.len() {
                let discarded = self.history.len() - index - 1;
                self.history.truncate(index + 1);
                debug!(discarded, "Redo branch truncated");
            }
        }

        self.history.push_back(deep_clone(state));
        self.history_index = Some(self.history.len() - 1);
        self.trim_to_bound();
        self.invalidate();
    }

    /// Step back one snapshot.
    ///
    /// Returns `Ok(None)` when already at the oldest snapshot.
    ///
    /// # Errors
    ///
    /// `HistoryError::Disabled` when history is turned off.
    pub fn undo(&mut self) -> Result<Option<Value>, HistoryError> {
        if !self.options.enable_history {
            warn!("undo called while history is disabled");
            return Err(HistoryError::Disabled);
        }
        match self.history_index {
            Some(index) if index > 0 => Ok(Some(self.step_to(index - 1, STATE_UNDO))),
            _ => Ok(None),
        }
    }

    /// Step forward one snapshot.
    ///
    /// Returns `Ok(None)` when already at the newest snapshot.
    ///
    /// # Errors
    ///
    /// `HistoryError::Disabled` when history is turned off.
    pub fn redo(&mut self) -> Result<Option<Value>, HistoryError> {
        if !self.options.enable_history {
            warn!("redo called while history is disabled");
            return Err(HistoryError::Disabled);
        }
        match self.history_index {
            Some(index) if index + 1 < self.history.len() => {
                Ok(Some(self.step_to(index + 1, STATE_REDO)))
            }
            _ => Ok(None),
        }
    }

    fn step_to(&mut self, index: usize, event_name: &str) -> Value {
        self.history_index = Some(index);
        let state = deep_clone(&self.history[index]);

        if self.options.enable_events {
            if let Some(dispatcher) = &self.dispatcher {
                dispatcher.emit(
                    event_name,
                    json!({ "state": deep_clone(&state), "historyIndex": index }),
                );
            }
        }

        self.history_operations += 1;
        self.invalidate();
        debug!(event = event_name, history_index = index, "History step");
        state
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
        self.history_index = None;
        self.invalidate();
    }

    pub fn can_undo(&self) -> bool {
        self.options.enable_history && self.history_index.is_some_and(|index| index > 0)
    }

    pub fn can_redo(&self) -> bool {
        self.options.enable_history
            && self
                .history_index
                .is_some_and(|index| index + 1 < self.history.len())
    }

    /// Merge new options. Shrinking `max_history_size` below the current
    /// length trims the oldest snapshots immediately.
    pub fn update_options(&mut self, update: HistoryOptionsUpdate) {
        self.options.merge(update);
        if self.history.len() > self.options.bound() {
            self.trim_to_bound();
            self.invalidate();
        }
    }

    fn trim_to_bound(&mut self) {
        let bound = self.options.bound();
        if self.history.len() <= bound {
            return;
        }
        let excess = self.history.len() - bound;
        self.history.drain(..excess);
        self.history_index = self.history_index.map(|index| index.saturating_sub(excess));
        debug!(dropped = excess, bound, "History trimmed to bound");
    }

    fn invalidate(&self) {
        if let Some(callback) = &self.on_invalidate {
            callback();
        }
    }

    /// Snapshot at the cursor.
    pub fn current(&self) -> Option<&Value> {
        self.history_index.and_then(|index| self.history.get(index))
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.history.get(index)
    }

    pub fn history_index(&self) -> Option<usize> {
        self.history_index
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn options(&self) -> &HistoryOptions {
        &self.options
    }

    pub fn history_operations(&self) -> u64 {
        self.history_operations
    }

    /// Approximate bytes held by stored snapshots.
    pub fn memory_usage(&self) -> usize {
        self.history.iter().map(estimate_size).sum()
    }

    pub fn checkpoint(&self) -> HistoryCheckpoint {
        HistoryCheckpoint {
            entries: self.history.clone(),
            history_index: self.history_index,
        }
    }

    pub fn restore(&mut self, checkpoint: HistoryCheckpoint) {
        self.history = checkpoint.entries;
        self.history_index = checkpoint.history_index;
        self.invalidate();
    }

    pub fn reset_operations(&mut self) {
        self.history_operations = 0;
    }

    pub fn stats(&self) -> HistoryStats {
        HistoryStats {
            enabled: self.options.enable_history,
            entries: self.history.len(),
            history_index: self.history_index,
            max_history_size: self.options.max_history_size,
            history_operations: self.history_operations,
            memory_bytes: self.memory_usage(),
        }
    }
}

impl Default for StateHistory {
    fn default() -> Self {
        Self::new(HistoryOptions::default())
    }
}
