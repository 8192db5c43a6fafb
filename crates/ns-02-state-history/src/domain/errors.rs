use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HistoryError {
    /// `undo`/`redo` called while history is turned off.
    #[error("History is disabled")]
    Disabled,
}
