//! # ns-02-state-history
//!
//! Bounded undo/redo log of whole-state snapshots.
//!
//! ## Model
//!
//! A linear sequence of snapshots plus a cursor (`history_index`):
//!
//! ```text
//!   [S0, S1, S2]          index = 2
//!   undo → S1             index = 1
//!   add S3 → [S0, S1, S3] S2 is gone (branch truncation)
//! ```
//!
//! ## Invariants
//!
//! | Invariant | Enforcement |
//! |-----------|-------------|
//! | `history_index` is `None` iff the log is empty | `initialize`, `clear_history` |
//! | `index < len` whenever the log is non-empty | `add_state_to_history`, `trim_to_bound` |
//! | `len <= max_history_size` | `trim_to_bound` on add and on option shrink |
//! | a new edit after undo drops every later snapshot | `add_state_to_history` |
//!
//! Snapshots are deep copies; nothing stored here aliases the live state.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod domain;

pub use domain::*;
