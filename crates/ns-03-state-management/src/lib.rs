//! # ns-03-state-management
//!
//! Single source of truth for the game state tree.
//!
//! ## Role in System
//!
//! - **Owner**: the only component that mutates the live tree
//! - **Composer**: drives `ns-02` history, `shared-bus` events and `ns-01`
//!   pattern tables for path subscriptions
//! - **Gatekeeper**: every write is path-checked and validated first
//!
//! ```text
//! gameplay ──set_state──→ [StateManager] ──state:changed──→ [EventDispatcher]
//!                              │   │
//!                 snapshots    │   └──StateChange──→ path subscribers
//!                              ↓
//!                       [StateHistory] ──state:undo / state:redo──→ [EventDispatcher]
//! ```
//!
//! ## Layout
//!
//! - `domain`: manager, config, options, subscriptions, read cache, schema
//! - `ports`: [`StateStore`] (consumer API) and [`StateValidator`] (rules)
//! - `adapters`: [`SchemaValidator`], the default rule set
//!
//! There is no process-wide instance. Construct a [`StateManager`] per session
//! and pass it (and its [`shared_bus::EventDispatcher`]) to whoever needs it.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod adapters;
pub mod domain;
pub mod ports;

pub use adapters::*;
pub use domain::*;
pub use ports::*;
