//! Primary API consumed by gameplay systems.

use crate::domain::StateError;
use serde_json::Value;

/// Minimal read/write surface over the state tree.
///
/// Gameplay systems take `&mut impl StateStore` so they can be driven by the
/// real manager or a test double.
pub trait StateStore {
    /// Owned copy of the value at `path` (`""` for the whole tree).
    fn read(&self, path: &str) -> Option<Value>;

    /// Write `value` at `path`. Returns whether the state changed.
    fn write(&mut self, path: &str, value: Value) -> Result<bool, StateError>;

    fn undo(&mut self) -> Result<Option<Value>, StateError>;

    fn redo(&mut self) -> Result<Option<Value>, StateError>;

    /// Numeric read with a fallback for missing or non-numeric values.
    fn read_f64(&self, path: &str, fallback: f64) -> f64 {
        self.read(path).and_then(|v| v.as_f64()).unwrap_or(fallback)
    }

    fn read_i64(&self, path: &str, fallback: i64) -> i64 {
        self.read(path).and_then(|v| v.as_i64()).unwrap_or(fallback)
    }
}
