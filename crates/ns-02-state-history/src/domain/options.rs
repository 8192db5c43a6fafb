//! History options.

use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_HISTORY_SIZE: usize = 100;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryOptions {
    /// Upper bound on stored snapshots. Zero is treated as one.
    pub max_history_size: usize,
    pub enable_history: bool,
    /// Emit `state:undo` / `state:redo` through the injected dispatcher.
    pub enable_events: bool,
}

impl Default for HistoryOptions {
    fn default() -> Self {
        Self {
            max_history_size: DEFAULT_MAX_HISTORY_SIZE,
            enable_history: true,
            enable_events: true,
        }
    }
}

/// Partial update for [`HistoryOptions`]; `None` keeps the current value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HistoryOptionsUpdate {
    pub max_history_size: Option<usize>,
    pub enable_history: Option<bool>,
    pub enable_events: Option<bool>,
}

impl HistoryOptions {
    /// Apply a partial update in place.
    pub fn merge(&mut self, update: HistoryOptionsUpdate) {
        if let Some(max) = update.max_history_size {
            self.max_history_size = max;
        }
        if let Some(enabled) = update.enable_history {
            self.enable_history = enabled;
        }
        if let Some(enabled) = update.enable_events {
            self.enable_events = enabled;
        }
    }

    pub(crate) fn bound(&self) -> usize {
        self.max_history_size.max(1)
    }
}
