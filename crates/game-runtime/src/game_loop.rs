//! # Frame Loop
//!
//! Ticks the scripted gameplay at a fixed interval until the frame budget is
//! spent, the run ends, or shutdown is signalled.
//!
//! ## Per-frame order
//!
//! 1. Gameplay step (state writes, immediate `state:*` events)
//! 2. `process_deferred` flushes the `game:*` events queued by the step
//! 3. Effects produced by the router are drained

use anyhow::{Context, Result};
use ns_03_state_management::{StateStats, StateStore};
use nova_telemetry::module_span;
use serde::Serialize;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::container::GameContainer;
use crate::gameplay::ScriptedGameplay;

/// Summary of one loop run.
#[derive(Clone, Debug, Serialize)]
pub struct LoopReport {
    pub frames_run: u64,
    pub kills: u64,
    pub hits: u64,
    pub rewinds: u64,
    pub effects: u64,
    pub deferred_processed: u64,
    pub final_score: i64,
    pub game_over: bool,
    pub stats: StateStats,
}

pub struct GameLoop {
    container: GameContainer,
    gameplay: ScriptedGameplay,
    totals: Totals,
}

#[derive(Default)]
struct Totals {
    frames: u64,
    kills: u64,
    hits: u64,
    rewinds: u64,
    effects: u64,
    deferred: u64,
    game_over: bool,
}

impl GameLoop {
    pub fn new(container: GameContainer) -> Self {
        let gameplay = ScriptedGameplay::new(container.config.seed);
        Self {
            container,
            gameplay,
            totals: Totals::default(),
        }
    }

    pub fn container(&self) -> &GameContainer {
        &self.container
    }

    /// Run until the frame budget is spent, the game ends, or `shutdown`
    /// flips to `true`. A dropped sender is not a shutdown.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) -> Result<LoopReport> {
        self.gameplay
            .start(&mut self.container.state)
            .context("Failed to start run")?;

        let mut ticker = tokio::time::interval(self.container.config.frame_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut shutdown_open = true;

        while self.totals.frames < self.container.config.frames && !self.totals.game_over {
            if *shutdown.borrow() {
                info!(frame = self.totals.frames, "Shutdown requested");
                break;
            }

            tokio::select! {
                biased;

                changed = shutdown.changed(), if shutdown_open => {
                    if changed.is_err() {
                        debug!("Shutdown sender dropped");
                        shutdown_open = false;
                    }
                }
                _ = ticker.tick() => {
                    self.frame()?;
                }
            }
        }

        let report = self.report();
        info!(
            frames = report.frames_run,
            score = report.final_score,
            kills = report.kills,
            effects = report.effects,
            game_over = report.game_over,
            "Loop finished"
        );
        Ok(report)
    }

    fn frame(&mut self) -> Result<()> {
        let frame = self.totals.frames;
        let _span = module_span!("frame", module = "game_loop", frame).entered();

        let outcome = self
            .gameplay
            .step(frame, &mut self.container.state, &self.container.dispatcher)
            .with_context(|| format!("Gameplay step failed at frame {frame}"))?;

        let deferred = self.container.dispatcher.process_deferred();
        let effects = self.container.effects.drain_effects();
        for effect in &effects {
            debug!(?effect, "Effect");
        }

        self.totals.frames += 1;
        self.totals.kills += u64::from(outcome.kills);
        self.totals.hits += u64::from(outcome.hits);
        self.totals.rewinds += u64::from(outcome.rewound);
        self.totals.effects += effects.len() as u64;
        self.totals.deferred += deferred as u64;
        self.totals.game_over = outcome.game_over;

        let every = self.container.config.stats_every;
        if every > 0 && self.totals.frames % every == 0 {
            self.log_stats();
        }
        Ok(())
    }

    fn log_stats(&self) {
        let stats = self.container.stats();
        info!(
            frame = self.totals.frames,
            writes = stats.writes,
            no_op_writes = stats.no_op_writes,
            history = stats.history.entries,
            subscriptions = stats.subscription_count,
            events = stats.events.events_emitted,
            "State stats"
        );
        if stats.validation_errors > 0 {
            warn!(count = stats.validation_errors, "Validation errors during run");
        }
    }

    pub fn report(&self) -> LoopReport {
        LoopReport {
            frames_run: self.totals.frames,
            kills: self.totals.kills,
            hits: self.totals.hits,
            rewinds: self.totals.rewinds,
            effects: self.totals.effects,
            deferred_processed: self.totals.deferred,
            final_score: self.container.state.read_i64("game.score", 0),
            game_over: self.totals.game_over,
            stats: self.container.stats(),
        }
    }
}
