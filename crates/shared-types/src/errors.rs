//! # Error Types
//!
//! Path errors shared by every crate that addresses the state tree.

use thiserror::Error;

/// Errors raised when a dot-path cannot be used for a write or lookup.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PathError {
    /// The path was the empty string.
    #[error("Path must be a non-empty string")]
    Empty,

    /// The path has an empty segment (`"a..b"`, `".a"`, `"a."`).
    #[error("Malformed path '{path}': empty segment at position {position}")]
    Malformed { path: String, position: usize },

    /// An array index segment points past the end of the array.
    #[error("Index {index} out of bounds (len {len}) at '{path}'")]
    IndexOutOfBounds {
        path: String,
        index: usize,
        len: usize,
    },

    /// A non-numeric segment addressed an array.
    #[error("Segment '{segment}' is not an array index at '{path}'")]
    NotAnIndex { path: String, segment: String },

    /// A reference could not be resolved against the state tree.
    #[error("Unresolved reference '{reference}'")]
    UnresolvedReference { reference: String },
}
