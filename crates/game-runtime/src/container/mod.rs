//! # Game Container
//!
//! Builds one game session with explicit dependency injection.
//!
//! ```text
//! RuntimeConfig
//!     │
//!     ├─→ EventDispatcher ──clone──→ StateManager
//!     │         │
//!     │         └──"*" listener──→ EffectRouter
//!     ↓
//! GameContainer { config, dispatcher, state, effects }
//! ```
//!
//! Nothing here is global: two containers are two independent sessions.

pub mod config;
pub mod session;

pub use config::{ConfigError, RuntimeConfig};
pub use session::GameContainer;
