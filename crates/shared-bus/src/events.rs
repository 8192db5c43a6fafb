//! # Runtime Events
//!
//! Reserved event names and the recorded form of an emitted event.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use shared_types::current_timestamp_ms;

/// A value at a path changed. Payload: `{path, value, previousValue, timestamp}`.
pub const STATE_CHANGED: &str = "state:changed";

/// History moved one step back. Payload: `{state, historyIndex}`.
pub const STATE_UNDO: &str = "state:undo";

/// History moved one step forward. Payload: `{state, historyIndex}`.
pub const STATE_REDO: &str = "state:redo";

/// The whole tree was reset to its defaults. Payload: `{state, timestamp}`.
pub const STATE_RESET: &str = "state:reset";

/// A handler failed. Payload: `{originalEvent, error, listener, timestamp}`.
pub const ERROR_EVENT: &str = "error";

/// One entry of the event log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub event_name: String,
    pub data: Value,
    /// Milliseconds since the Unix epoch.
    pub timestamp: u64,
}

impl EventRecord {
    pub fn new(event_name: &str, data: Value) -> Self {
        Self {
            event_name: event_name.to_string(),
            data,
            timestamp: current_timestamp_ms(),
        }
    }
}

/// Payload carried by an `"error"` event.
pub(crate) fn error_payload(original_event: &str, error: &str, listener: u64) -> Value {
    json!({
        "originalEvent": original_event,
        "error": error,
        "listener": listener,
        "timestamp": current_timestamp_ms(),
    })
}
