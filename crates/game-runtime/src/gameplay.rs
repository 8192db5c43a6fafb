//! # Scripted Gameplay
//!
//! Deterministic (seeded) stand-in for real gameplay systems. Each frame it
//! may destroy an enemy, take damage, heal or advance the level, writing
//! through a [`StateStore`] and announcing gameplay events as deferred
//! emits.
//!
//! | Rule | Writes | Events |
//! |------|--------|--------|
//! | kill (30%) | `game.combo`, `game.score` | `game:enemy_destroyed` |
//! | hit (10%) | `game.combo`, `game.player.health`, `game.lives` | `game:player_down` |
//! | heal (every 90 frames) | `game.player.health` | |
//! | level up (every 240 frames) | `game.level` | `game:boss_intro` |
//! | rewind (once, near death) | undo of the hit | `game:rewind` |

use ns_03_state_management::{StateError, StateStore};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use serde_json::json;
use shared_bus::{EmitOptions, EventDispatcher};
use tracing::{debug, info};

const KILL_CHANCE: f64 = 0.3;
const HIT_CHANCE: f64 = 0.1;
const HEAL_EVERY: u64 = 90;
const HEAL_AMOUNT: i64 = 15;
const LEVEL_EVERY: u64 = 240;
const REWIND_THRESHOLD: i64 = 10;

/// What happened during one frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct FrameOutcome {
    pub kills: u32,
    pub hits: u32,
    pub rewound: bool,
    pub game_over: bool,
}

#[derive(Debug)]
pub struct ScriptedGameplay {
    rng: StdRng,
    rewinds_left: u32,
}

impl ScriptedGameplay {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            rewinds_left: 1,
        }
    }

    /// Enter the `playing` phase.
    pub fn start<S: StateStore>(&mut self, store: &mut S) -> Result<(), StateError> {
        store.write("game.phase", json!("playing"))?;
        info!("Run started");
        Ok(())
    }

    pub fn step<S: StateStore>(
        &mut self,
        frame: u64,
        store: &mut S,
        dispatcher: &EventDispatcher,
    ) -> Result<FrameOutcome, StateError> {
        let mut outcome = FrameOutcome::default();
        if store.read("game.phase") == Some(json!("game_over")) {
            outcome.game_over = true;
            return Ok(outcome);
        }

        if self.rng.gen_bool(KILL_CHANCE) {
            self.destroy_enemy(frame, store, dispatcher)?;
            outcome.kills += 1;
        }

        if self.rng.gen_bool(HIT_CHANCE) {
            let damage = self.rng.gen_range(5..=30);
            outcome.hits += 1;
            outcome.rewound = self.take_hit(damage, store, dispatcher)?;
            outcome.game_over = store.read("game.phase") == Some(json!("game_over"));
        }

        if frame > 0 && frame % HEAL_EVERY == 0 && !outcome.game_over {
            let max = store.read_i64("game.player.maxHealth", 100);
            let health = store.read_i64("game.player.health", max);
            store.write("game.player.health", json!((health + HEAL_AMOUNT).min(max)))?;
        }

        if frame > 0 && frame % LEVEL_EVERY == 0 && !outcome.game_over {
            let level = store.read_i64("game.level", 1) + 1;
            store.write("game.level", json!(level))?;
            dispatcher.emit_with("game:boss_intro", json!({ "level": level }), EmitOptions::deferred());
            info!(level, "Level up");
        }

        Ok(outcome)
    }

    fn destroy_enemy<S: StateStore>(
        &mut self,
        frame: u64,
        store: &mut S,
        dispatcher: &EventDispatcher,
    ) -> Result<(), StateError> {
        let combo = store.read_i64("game.combo", 0) + 1;
        let score = store.read_i64("game.score", 0) + 10 * combo;
        store.write("game.combo", json!(combo))?;
        store.write("game.score", json!(score))?;
        dispatcher.emit_with(
            "game:enemy_destroyed",
            json!({ "frame": frame, "combo": combo }),
            EmitOptions::deferred(),
        );
        Ok(())
    }

    /// Apply `damage`. Returns whether the hit was rewound.
    fn take_hit<S: StateStore>(
        &mut self,
        damage: i64,
        store: &mut S,
        dispatcher: &EventDispatcher,
    ) -> Result<bool, StateError> {
        store.write("game.combo", json!(0))?;
        let health = (store.read_i64("game.player.health", 0) - damage).max(0);
        store.write("game.player.health", json!(health))?;
        debug!(damage, health, "Player hit");

        if health <= REWIND_THRESHOLD && self.rewinds_left > 0 {
            self.rewinds_left -= 1;
            store.undo()?;
            dispatcher.emit_with("game:rewind", json!({ "damage": damage }), EmitOptions::deferred());
            info!(damage, "Lethal hit rewound");
            return Ok(true);
        }

        if health == 0 {
            let lives = (store.read_i64("game.lives", 0) - 1).max(0);
            store.write("game.lives", json!(lives))?;
            dispatcher.emit_with("game:player_down", json!({ "lives": lives }), EmitOptions::deferred());

            if lives == 0 {
                self.finish(store)?;
            } else {
                let max = store.read_i64("game.player.maxHealth", 100);
                store.write("game.player.health", json!(max))?;
            }
        }
        Ok(false)
    }

    fn finish<S: StateStore>(&mut self, store: &mut S) -> Result<(), StateError> {
        let score = store.read_i64("game.score", 0);
        if score > store.read_i64("game.highScore", 0) {
            store.write("game.highScore", json!(score))?;
        }
        store.write("game.phase", json!("game_over"))?;
        info!(score, "Game over");
        Ok(())
    }
}
