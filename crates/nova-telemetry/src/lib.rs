//! # Nova Telemetry
//!
//! Structured logging for every Nova Strike crate.
//!
//! Library crates only emit `tracing` events; the binary decides where they
//! go by calling [`init_telemetry`] once at startup.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use nova_telemetry::{init_telemetry, TelemetryConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     let _guard = init_telemetry(TelemetryConfig::from_env())?;
//!     // ...
//!     Ok(())
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `NS_SERVICE_NAME` | `nova-strike` | Service name in log lines |
//! | `NS_LOG_LEVEL` / `RUST_LOG` | `info` | Filter directive |
//! | `NS_CONSOLE_OUTPUT` | `true` | Write logs to stdout |
//! | `NS_JSON_LOGS` | `false` | JSON lines instead of pretty output |

mod config;
mod tracing_setup;

pub use config::{TelemetryConfig, DEFAULT_SERVICE_NAME};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Invalid log filter '{directive}': {reason}")]
    Filter { directive: String, reason: String },

    #[error("Failed to install tracing subscriber: {0}")]
    SubscriberInit(String),
}

/// Install the global subscriber.
///
/// Returns a guard to hold for the lifetime of the application; dropping it
/// logs the shutdown.
///
/// # Errors
///
/// - `TelemetryError::Filter` for an unparseable filter directive
/// - `TelemetryError::SubscriberInit` if a global subscriber already exists
pub fn init_telemetry(config: TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    tracing_setup::init_tracing(&config)?;
    Ok(TelemetryGuard {
        service_name: config.service_name,
    })
}

/// Guard that keeps telemetry active.
#[derive(Debug)]
pub struct TelemetryGuard {
    service_name: String,
}

impl TelemetryGuard {
    pub fn service_name(&self) -> &str {
        &self.service_name
    }
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        tracing::info!(service = %self.service_name, "Shutting down telemetry");
    }
}

/// Span tagged with the emitting module.
///
/// # Example
///
/// ```rust,ignore
/// let _span = module_span!("frame", module = "game_loop", frame = 12).entered();
/// ```
#[macro_export]
macro_rules! module_span {
    ($name:expr, $($field:tt)*) => {
        tracing::info_span!($name, $($field)*)
    };
}
