//! # State Configuration
//!
//! Construction-time options for [`crate::StateManager`].
//!
//! | Field | Default | Env var |
//! |-------|---------|---------|
//! | `max_history_size` | 100 | `NS_MAX_HISTORY_SIZE` |
//! | `enable_history` | true | `NS_ENABLE_HISTORY` |
//! | `enable_validation` | true | `NS_ENABLE_VALIDATION` |
//! | `enable_events` | true | `NS_ENABLE_EVENTS` |
//! | `enable_debug` | false | `NS_DEBUG` |
//! | `immutable` | true | `NS_IMMUTABLE` |
//! | `read_cache_size` | 256 | `NS_READ_CACHE_SIZE` |

use ns_02_state_history::{HistoryOptions, DEFAULT_MAX_HISTORY_SIZE};
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use tracing::warn;

pub const DEFAULT_READ_CACHE_SIZE: usize = 256;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StateConfig {
    pub max_history_size: usize,
    pub enable_history: bool,
    pub enable_validation: bool,
    pub enable_events: bool,
    /// Log every write with its previous and new value.
    pub enable_debug: bool,
    /// Hand out deep copies from `get_state` instead of borrows of the live tree.
    pub immutable: bool,
    /// Entries kept by the shared-read cache.
    pub read_cache_size: usize,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            max_history_size: DEFAULT_MAX_HISTORY_SIZE,
            enable_history: true,
            enable_validation: true,
            enable_events: true,
            enable_debug: false,
            immutable: true,
            read_cache_size: DEFAULT_READ_CACHE_SIZE,
        }
    }
}

impl StateConfig {
    /// Defaults overridden by `NS_*` environment variables.
    ///
    /// Unparseable values are logged and ignored.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_history_size: env_or("NS_MAX_HISTORY_SIZE", defaults.max_history_size),
            enable_history: env_flag("NS_ENABLE_HISTORY", defaults.enable_history),
            enable_validation: env_flag("NS_ENABLE_VALIDATION", defaults.enable_validation),
            enable_events: env_flag("NS_ENABLE_EVENTS", defaults.enable_events),
            enable_debug: env_flag("NS_DEBUG", defaults.enable_debug),
            immutable: env_flag("NS_IMMUTABLE", defaults.immutable),
            read_cache_size: env_or("NS_READ_CACHE_SIZE", defaults.read_cache_size),
        }
    }

    /// The subset of options owned by the history log.
    pub fn history_options(&self) -> HistoryOptions {
        HistoryOptions {
            max_history_size: self.max_history_size,
            enable_history: self.enable_history,
            enable_events: self.enable_events,
        }
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(var = name, value = %raw, "Ignoring unparseable environment override");
            default
        }),
        Err(_) => default,
    }
}

fn env_flag(name: &str, default: bool) -> bool {
    match env::var(name) {
        Ok(raw) => parse_flag(&raw).unwrap_or_else(|| {
            warn!(var = name, value = %raw, "Ignoring unparseable environment flag");
            default
        }),
        Err(_) => default,
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
