//! # Nova Strike Game Runtime
//!
//! Builds one game session and runs the scripted frame loop until the frame
//! budget is spent, the run ends, or Ctrl+C is pressed.
//!
//! ## Startup Sequence
//!
//! 1. Initialize telemetry
//! 2. Load configuration from `NS_*` environment variables
//! 3. Build the game container (dispatcher, state manager, effect router)
//! 4. Run the frame loop

use anyhow::{Context, Result};
use game_runtime::{GameContainer, GameLoop, RuntimeConfig};
use nova_telemetry::{init_telemetry, TelemetryConfig};
use tokio::sync::watch;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    let _telemetry = init_telemetry(TelemetryConfig::for_component("runtime"))
        .context("Failed to initialize telemetry")?;

    info!("===========================================");
    info!("  Nova Strike Game Runtime v{}", env!("CARGO_PKG_VERSION"));
    info!("===========================================");

    let config = RuntimeConfig::from_env();
    info!(
        frames = config.frames,
        frame_interval_ms = config.frame_interval_ms,
        seed = config.seed,
        history = config.state.enable_history,
        "Configuration loaded"
    );

    let container = GameContainer::new(config)?;
    let mut game = GameLoop::new(container);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received Ctrl+C, stopping after the current frame");
                if shutdown_tx.send(true).is_err() {
                    error!("Frame loop already stopped");
                }
            }
            Err(e) => error!("Failed to listen for Ctrl+C: {}", e),
        }
    });

    let report = game.run(shutdown_rx).await?;
    info!(
        report = %serde_json::to_string(&report).context("Failed to serialize report")?,
        "Run complete"
    );

    Ok(())
}
