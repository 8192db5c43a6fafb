//! # Shared Bus - In-Process Event Dispatcher
//!
//! Priority-ordered publish/subscribe for the game runtime. Gameplay, audio and
//! UI systems subscribe to event names; the state manager publishes `state:*`
//! events through the same bus.
//!
//! ## Dispatch Pass
//!
//! ```text
//! emit("user:login", data)
//!        │
//!        ├─→ record into event log (ring buffer, O(1))
//!        │
//!        ├─→ direct listeners["user:login"]  ─┐
//!        ├─→ wildcard listeners ("user:*")   ─┼─→ sort by priority desc
//!        │                                    │
//!        ▼                                    ▼
//!   handler(data, "user:login")   for each, in order
//!        │
//!        └─ Err / panic ─→ log + emit("error", {...}) and continue
//! ```
//!
//! ## Rules
//!
//! - **Explicit instances**: there is no global bus. `EventDispatcher` is a
//!   cheap `Clone` handle; pass it to every consumer.
//! - **Error isolation**: a failing handler never aborts the fan-out.
//! - **Recursion guard**: failures while dispatching `"error"` are logged only.
//! - **Snapshot semantics**: the listener set is fixed when `emit` starts.

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod dispatcher;
pub mod event_log;
pub mod events;
pub mod listener;

// Re-export main types
pub use dispatcher::{DispatchError, DispatcherStats, EmitOptions, EventDispatcher};
pub use event_log::EventLog;
pub use events::{
    EventRecord, ERROR_EVENT, STATE_CHANGED, STATE_REDO, STATE_RESET, STATE_UNDO,
};
pub use listener::{HandlerError, HandlerResult, ListenerId, ListenerOptions, Unsubscribe};

/// Default capacity of the event log ring buffer.
pub const DEFAULT_HISTORY_SIZE: usize = 100;
