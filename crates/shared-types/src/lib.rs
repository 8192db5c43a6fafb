//! # Shared Types Crate
//!
//! Types and pure helpers shared by every runtime crate.
//!
//! ## Contents
//!
//! - **State tree**: [`Value`] (re-exported `serde_json::Value`) is the dynamic
//!   tree every snapshot, event payload and path write is expressed in.
//! - **Paths**: dot-notation addressing (`"game.player.health"`) with
//!   immutable get/set, deep equality and reference resolution.
//! - **Globs**: the single `*`/`?` to anchored-regex compiler used for
//!   wildcard listeners, effect patterns and path subscriptions.
//!
//! ## Design Principles
//!
//! - **Never mutate the input root**: every write returns a new tree.
//! - **Reads never fail**: a missing segment reads as `None`.
//! - **Writes validate paths**: malformed paths are rejected up front.

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod errors;
pub mod glob;
pub mod path;
pub mod time;

pub use errors::PathError;
pub use glob::{compile_glob, has_wildcard};
pub use path::{
    deep_clone, deep_equal, estimate_size, get_value_by_path, is_ancestor_path, join_path,
    parent_path, resolve_reference, resolve_reference_or, set_value_by_path, split_path,
    validate_path,
};
pub use serde_json::{json, Map, Value};
pub use time::current_timestamp_ms;

/// Separator between path segments.
pub const PATH_SEPARATOR: char = '.';

/// Prefix marking an absolute state reference (`"$game.player.health"`).
pub const REFERENCE_PREFIX: char = '$';
