//! Validation port.

use serde_json::Value;
use thiserror::Error;

/// Why a proposed write was rejected.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{reason}")]
pub struct ValidationFailure {
    pub reason: String,
}

impl ValidationFailure {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Domain rules checked before a write is applied.
///
/// `state` is the tree as it is *before* the write.
pub trait StateValidator: Send + Sync {
    fn validate(&self, path: &str, value: &Value, state: &Value) -> Result<(), ValidationFailure>;
}

/// Accepts every write.
#[derive(Clone, Copy, Debug, Default)]
pub struct AcceptAll;

impl StateValidator for AcceptAll {
    fn validate(&self, _path: &str, _value: &Value, _state: &Value) -> Result<(), ValidationFailure> {
        Ok(())
    }
}
