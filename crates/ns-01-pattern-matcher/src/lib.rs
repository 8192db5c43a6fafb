//! # ns-01-pattern-matcher
//!
//! Pattern table used to route side effects (audio cues, UI refreshes,
//! achievements) to the events and state transitions that trigger them.
//!
//! ## Classification
//!
//! Each registered pattern gets exactly one type, by the first rule that
//! applies:
//!
//! | Rule | Type | Test |
//! |------|------|------|
//! | a compiled `Regex` | `Regex` | `regex.is_match` |
//! | text containing `*` | `Glob` | anchored glob regex (`?` still compiles to `.`) |
//! | text containing `?` | `Wildcard` | anchored glob regex |
//! | anything else | `Exact` | string equality |
//!
//! ## Ordering
//!
//! `get_matches` returns entries by descending priority; equal priorities keep
//! registration order.
//!
//! ```text
//! register("user:*", h1, priority 10) ─┐
//! register("user:?", h2, priority 1)  ─┼─→ get_matches("user:1") → [h1, h2]
//! register("admin:*", h3)             ─┘
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod domain;

pub use domain::*;
