//! Telemetry configuration from environment variables.

use serde::Deserialize;
use std::env;

pub const DEFAULT_SERVICE_NAME: &str = "nova-strike";

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Service name attached to every log line
    pub service_name: String,

    /// Filter directive (`info`, `ns_03_state_management=debug`, ...)
    pub log_level: String,

    /// Whether to write to stdout at all
    pub console_output: bool,

    /// JSON lines instead of the human-readable format
    pub json_logs: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: DEFAULT_SERVICE_NAME.to_string(),
            log_level: "info".to_string(),
            console_output: true,
            json_logs: false,
        }
    }
}

impl TelemetryConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `NS_SERVICE_NAME`: Service name (default: nova-strike)
    /// - `NS_LOG_LEVEL` or `RUST_LOG`: Filter directive (default: info)
    /// - `NS_CONSOLE_OUTPUT`: Enable console output (default: true)
    /// - `NS_JSON_LOGS`: Enable JSON logs (default: false)
    pub fn from_env() -> Self {
        Self {
            service_name: env::var("NS_SERVICE_NAME")
                .unwrap_or_else(|_| DEFAULT_SERVICE_NAME.to_string()),

            log_level: env::var("NS_LOG_LEVEL")
                .or_else(|_| env::var("RUST_LOG"))
                .unwrap_or_else(|_| "info".to_string()),

            console_output: env::var("NS_CONSOLE_OUTPUT")
                .map(|v| v.to_lowercase() != "false" && v != "0")
                .unwrap_or(true),

            json_logs: env::var("NS_JSON_LOGS")
                .map(|v| v.to_lowercase() == "true" || v == "1")
                .unwrap_or(false),
        }
    }

    /// Configuration for one named component (`nova-strike-runtime`).
    pub fn for_component(component: &str) -> Self {
        let mut config = Self::from_env();
        config.service_name = format!("{DEFAULT_SERVICE_NAME}-{component}");
        config
    }
}
