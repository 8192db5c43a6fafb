use anyhow::{Context, Result};
use ns_03_state_management::{StateManager, StateStats};
use shared_bus::EventDispatcher;
use tracing::info;

use super::RuntimeConfig;
use crate::wiring::EffectRouter;

/// Every service of one game session.
pub struct GameContainer {
    pub config: RuntimeConfig,
    pub dispatcher: EventDispatcher,
    pub state: StateManager,
    pub effects: EffectRouter,
}

impl GameContainer {
    /// Build the session in dependency order: dispatcher, state, effects.
    pub fn new(config: RuntimeConfig) -> Result<Self> {
        config.validate().context("Invalid runtime configuration")?;

        let dispatcher = EventDispatcher::with_history_size(config.event_history_size);
        let state = StateManager::new(config.state.clone(), dispatcher.clone());

        let mut effects =
            EffectRouter::with_default_bindings().context("Failed to register effect bindings")?;
        effects
            .attach(&dispatcher)
            .context("Failed to attach effect router")?;

        info!(
            bindings = effects.binding_count(),
            history = config.state.max_history_size,
            "Game session created"
        );

        Ok(Self {
            config,
            dispatcher,
            state,
            effects,
        })
    }

    pub fn stats(&self) -> StateStats {
        self.state.stats()
    }
}
