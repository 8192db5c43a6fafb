use ns_01_pattern_matcher::PatternError;
use ns_02_state_history::HistoryError;
use shared_bus::DispatchError;
use shared_types::PathError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StateError {
    #[error(transparent)]
    Path(#[from] PathError),

    #[error("Validation failed for '{path}': {reason}")]
    Validation { path: String, reason: String },

    #[error(transparent)]
    History(#[from] HistoryError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error("Invalid subscription: {0}")]
    Subscription(#[from] PatternError),

    #[error("No default value for '{path}'")]
    MissingDefault { path: String },

    #[error("Transaction aborted: {0}")]
    Aborted(String),
}

impl StateError {
    /// Bucket name used in the per-module error tally.
    pub fn module(&self) -> &'static str {
        match self {
            StateError::Path(_) | StateError::MissingDefault { .. } => "path",
            StateError::Validation { .. } => "validation",
            StateError::History(_) => "history",
            StateError::Dispatch(_) => "events",
            StateError::Subscription(_) => "subscriptions",
            StateError::Aborted(_) => "transaction",
        }
    }
}
