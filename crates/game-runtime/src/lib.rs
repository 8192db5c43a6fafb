//! # Nova Strike Game Runtime
//!
//! Library half of the `game-runtime` binary. Exposes the session container,
//! the effect wiring and the scripted frame loop so they can be tested.
//!
//! ## Layout
//!
//! - `container/` - runtime configuration and per-session dependency injection
//! - `wiring/` - routes bus events to sound, UI and achievement effects
//! - `gameplay` - seeded gameplay script driving the state tree
//! - `game_loop` - fixed-interval frame loop with graceful shutdown
//!
//! ## Frame Flow
//!
//! ```text
//! ScriptedGameplay ──write──→ StateManager ──state:changed──→ EventDispatcher
//!        │                                                        │
//!        └──game:* (deferred)──→ process_deferred ────────────────┤
//!                                                                 ↓
//!                                            EffectRouter ──→ drain_effects
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod container;
pub mod game_loop;
pub mod gameplay;
pub mod wiring;

pub use container::{ConfigError, GameContainer, RuntimeConfig};
pub use game_loop::{GameLoop, LoopReport};
pub use gameplay::{FrameOutcome, ScriptedGameplay};
pub use wiring::{Effect, EffectRouter};
