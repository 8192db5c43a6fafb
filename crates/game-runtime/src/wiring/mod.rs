//! # Wiring
//!
//! Connects the event bus to side-effect handlers.

pub mod effects;

pub use effects::{register_default_bindings, Effect, EffectHandler, EffectRouter};
