//! # Runtime Configuration
//!
//! Frame loop parameters plus the state manager configuration.
//!
//! | Variable | Default | Field |
//! |----------|---------|-------|
//! | `NS_FRAMES` | 600 | `frames` |
//! | `NS_FRAME_INTERVAL_MS` | 16 | `frame_interval_ms` |
//! | `NS_SEED` | 7 | `seed` |
//! | `NS_EVENT_HISTORY_SIZE` | 100 | `event_history_size` |
//! | `NS_STATS_EVERY` | 120 | `stats_every` |
//!
//! State options come from `StateConfig::from_env`.

use ns_03_state_management::StateConfig;
use serde::Deserialize;
use std::env;
use std::time::Duration;
use thiserror::Error;

/// Complete runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Frames to simulate before exiting.
    pub frames: u64,
    pub frame_interval_ms: u64,
    /// Seed for the scripted gameplay RNG.
    pub seed: u64,
    /// Entries kept by the dispatcher's event log.
    pub event_history_size: usize,
    /// Log a stats line every this many frames (0 disables).
    pub stats_every: u64,
    pub state: StateConfig,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            frames: 600,
            frame_interval_ms: 16,
            seed: 7,
            event_history_size: 100,
            stats_every: 120,
            state: StateConfig::default(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("frame_interval_ms must be greater than zero")]
    ZeroFrameInterval,

    #[error("event_history_size must be greater than zero")]
    ZeroEventHistory,
}

impl RuntimeConfig {
    /// Defaults overridden by `NS_*` environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            frames: parse_env("NS_FRAMES").unwrap_or(defaults.frames),
            frame_interval_ms: parse_env("NS_FRAME_INTERVAL_MS")
                .unwrap_or(defaults.frame_interval_ms),
            seed: parse_env("NS_SEED").unwrap_or(defaults.seed),
            event_history_size: parse_env("NS_EVENT_HISTORY_SIZE")
                .unwrap_or(defaults.event_history_size),
            stats_every: parse_env("NS_STATS_EVERY").unwrap_or(defaults.stats_every),
            state: StateConfig::from_env(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.frame_interval_ms == 0 {
            return Err(ConfigError::ZeroFrameInterval);
        }
        if self.event_history_size == 0 {
            return Err(ConfigError::ZeroEventHistory);
        }
        Ok(())
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}
