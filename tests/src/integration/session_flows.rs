//! # Session Flows
//!
//! End-to-end flows through one `GameContainer`: state writes become
//! `state:changed` events, events become effects, and the frame loop drives
//! all of it.
//!
//! ## Flows Tested
//!
//! 1. **Damage**: health write → hit sound + low health alarm
//! 2. **Validation**: rejected writes change nothing and produce no effects
//! 3. **Transactions**: rollback restores state and history together
//! 4. **Reset**: full reset clears subscriptions and refreshes the UI
//! 5. **Subscriptions**: ancestor subscribers see descendant writes, glob
//!    subscribers see ancestor writes and undo
//! 6. **Frame loop**: a scripted run stays valid end to end

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use game_runtime::{Effect, GameContainer, GameLoop, RuntimeConfig};
    use ns_03_state_management::{StateError, StateStore, SubscribeOptions, WriteOptions};
    use parking_lot::Mutex;
    use serde_json::{json, Value};
    use shared_bus::{HandlerError, ListenerOptions};
    use tokio::sync::watch;

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    fn container() -> GameContainer {
        GameContainer::new(RuntimeConfig::default()).unwrap()
    }

    fn write(container: &mut GameContainer, path: &str, value: Value) -> bool {
        container
            .state
            .set_state(path, value, WriteOptions::default())
            .unwrap()
    }

    fn sound(name: &str) -> Effect {
        Effect::PlaySound(name.into())
    }

    fn ui(name: &str) -> Effect {
        Effect::RefreshUi(name.into())
    }

    // =============================================================================
    // DAMAGE & VALIDATION
    // =============================================================================

    #[test]
    fn test_heavy_hit_plays_sound_then_alarm() {
        let mut container = container();

        write(&mut container, "game.player.health", json!(20));

        assert_eq!(
            container.effects.drain_effects(),
            vec![sound("player_hit"), sound("low_health_alarm")]
        );
    }

    #[test]
    fn test_heal_plays_heal_sound() {
        let mut container = container();
        write(&mut container, "game.player.health", json!(60));
        container.effects.drain_effects();

        write(&mut container, "game.player.health", json!(90));

        assert_eq!(container.effects.drain_effects(), vec![sound("heal")]);
    }

    #[test]
    fn test_rejected_write_changes_nothing() {
        let mut container = container();

        let result = container
            .state
            .set_state("game.player.health", json!(150), WriteOptions::default());

        assert!(matches!(result, Err(StateError::Validation { .. })));
        assert_eq!(container.state.get("game.player.health"), Some(json!(100)));
        assert!(container.effects.drain_effects().is_empty());
        assert_eq!(container.stats().validation_errors, 1);
    }

    #[test]
    fn test_health_bound_follows_max_health() {
        let mut container = container();
        write(&mut container, "game.player.maxHealth", json!(150));

        assert!(write(&mut container, "game.player.health", json!(150)));
    }

    #[test]
    fn test_wrong_kind_rejected() {
        let mut container = container();
        let result = container
            .state
            .set_state("game.score", json!("lots"), WriteOptions::default());

        match result {
            Err(StateError::Validation { path, reason }) => {
                assert_eq!(path, "game.score");
                assert!(reason.contains("expected number"));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    // =============================================================================
    // EFFECT ROUTING
    // =============================================================================

    #[test]
    fn test_first_level_up_unlocks_achievement_once() {
        let mut container = container();

        write(&mut container, "game.level", json!(2));
        write(&mut container, "game.level", json!(3));

        let achievements: Vec<_> = container
            .effects
            .drain_effects()
            .into_iter()
            .filter(|e| matches!(e, Effect::UnlockAchievement(_)))
            .collect();
        assert_eq!(
            achievements,
            vec![Effect::UnlockAchievement("first_sector_cleared".into())]
        );
    }

    #[test]
    fn test_volume_settings_refresh_audio_panel() {
        let mut container = container();

        write(&mut container, "settings.musicVolume", json!(0.3));
        write(&mut container, "settings.sfxVolume", json!(0.1));
        write(&mut container, "settings.difficulty", json!("hard"));

        assert_eq!(
            container.effects.drain_effects(),
            vec![ui("audio_settings"), ui("audio_settings")]
        );
    }

    #[test]
    fn test_last_life_refreshes_game_over() {
        let mut container = container();
        write(&mut container, "game.lives", json!(1));
        assert!(container.effects.drain_effects().is_empty());

        write(&mut container, "game.lives", json!(0));
        assert_eq!(container.effects.drain_effects(), vec![ui("game_over")]);
    }

    #[test]
    fn test_handler_failure_becomes_log_effect() {
        let container = container();
        container
            .dispatcher
            .on(
                "game:enemy_destroyed",
                |_, _| Err(HandlerError::new("missing sprite")),
                ListenerOptions::with_priority(50),
            )
            .unwrap();

        container.dispatcher.emit("game:enemy_destroyed", json!({}));

        let effects = container.effects.drain_effects();
        assert!(effects.contains(&sound("explosion")));
        assert!(effects
            .iter()
            .any(|e| matches!(e, Effect::Log(message) if message.contains("missing sprite"))));
    }

    #[test]
    fn test_boss_events_map_to_sounds() {
        let container = container();

        container.dispatcher.emit("game:boss_intro", json!({ "level": 2 }));
        container.dispatcher.emit("game:boss_defeated", json!({}));

        assert_eq!(
            container.effects.drain_effects(),
            vec![sound("game_boss_intro"), sound("game_boss_defeated")]
        );
    }

    // =============================================================================
    // TRANSACTIONS & BATCHES
    // =============================================================================

    #[test]
    fn test_failed_transaction_rolls_back() {
        let mut container = container();
        let history_len = container.state.history().len();

        let result: Result<(), StateError> = container.state.transaction(|sm| {
            sm.set_state("game.score", json!(50), WriteOptions::default())?;
            sm.set_state("game.combo", json!(3), WriteOptions::default())?;
            Err(StateError::Aborted("wave cancelled".into()))
        });

        assert!(result.is_err());
        assert_eq!(container.state.get("game.score"), Some(json!(0)));
        assert_eq!(container.state.get("game.combo"), Some(json!(0)));
        assert_eq!(container.state.history().len(), history_len);
        assert_eq!(container.stats().rollbacks, 1);
        assert_eq!(container.stats().module_errors["transaction"], 1);
    }

    #[test]
    fn test_transaction_rolls_back_on_validation_failure() {
        let mut container = container();

        let result = container.state.transaction(|sm| {
            sm.set_state("game.score", json!(50), WriteOptions::default())?;
            sm.set_state("game.lives", json!(-1), WriteOptions::default())
        });

        assert!(matches!(result, Err(StateError::Validation { .. })));
        assert_eq!(container.state.get("game.score"), Some(json!(0)));
    }

    #[test]
    fn test_batch_is_one_undo_step() {
        let mut container = container();
        let history_len = container.state.history().len();

        let changed = container
            .state
            .batch_update([
                ("game.score", json!(300)),
                ("game.combo", json!(4)),
                ("game.level", json!(1)),
            ])
            .unwrap();

        assert_eq!(changed, 2);
        assert_eq!(container.state.history().len(), history_len + 1);

        container.state.undo().unwrap();
        assert_eq!(container.state.get("game.score"), Some(json!(0)));
        assert_eq!(container.state.get("game.combo"), Some(json!(0)));
    }

    // =============================================================================
    // RESET
    // =============================================================================

    #[test]
    fn test_full_reset_restores_defaults() {
        let mut container = container();
        write(&mut container, "game.score", json!(900));
        container
            .state
            .subscribe("game.score", |_| {}, SubscribeOptions::default())
            .unwrap();
        container.effects.drain_effects();

        assert!(container.state.reset_state("").unwrap());

        assert_eq!(container.state.get("game.score"), Some(json!(0)));
        assert_eq!(container.state.subscription_count(), 0);
        assert!(!container.state.can_undo());
        assert_eq!(container.stats().writes, 0);
        assert_eq!(container.effects.drain_effects(), vec![ui("all")]);
    }

    #[test]
    fn test_subtree_reset_is_undoable() {
        let mut container = container();
        write(&mut container, "game.player.health", json!(40));
        write(&mut container, "game.player.shield", json!(25));

        assert!(container.state.reset_state("game.player").unwrap());
        assert_eq!(container.state.get("game.player.health"), Some(json!(100)));

        container.state.undo().unwrap();
        assert_eq!(container.state.get("game.player.shield"), Some(json!(25)));
    }

    #[test]
    fn test_reset_unknown_path_fails() {
        let mut container = container();
        assert!(matches!(
            container.state.reset_state("mods.custom"),
            Err(StateError::MissingDefault { .. })
        ));
    }

    // =============================================================================
    // SUBSCRIPTIONS
    // =============================================================================

    #[test]
    fn test_ancestor_subscriber_sees_descendant_write() {
        let mut container = container();
        let seen: Arc<Mutex<Vec<(String, Option<Value>)>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        container
            .state
            .subscribe(
                "game.player",
                move |change| {
                    let health = change.new_value.as_ref().map(|p| p["health"].clone());
                    sink.lock().push((change.path.clone(), health));
                },
                SubscribeOptions::default(),
            )
            .unwrap();

        write(&mut container, "game.player.health", json!(70));
        write(&mut container, "game.score", json!(10));

        assert_eq!(
            *seen.lock(),
            vec![("game.player".to_string(), Some(json!(70)))]
        );
    }

    #[test]
    fn test_glob_subscriber_sees_matching_paths() {
        let mut container = container();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        container
            .state
            .subscribe(
                "settings.*Volume",
                move |change| sink.lock().push(change.path.clone()),
                SubscribeOptions::default(),
            )
            .unwrap();

        write(&mut container, "settings.masterVolume", json!(0.5));
        write(&mut container, "settings.showFps", json!(true));

        assert_eq!(*seen.lock(), vec!["settings.masterVolume".to_string()]);
    }

    #[test]
    fn test_glob_subscriber_sees_ancestor_writes_and_undo() {
        let mut container = container();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        container
            .state
            .subscribe(
                "settings.*Volume",
                move |change| sink.lock().push((change.path.clone(), change.new_value.clone())),
                SubscribeOptions::default(),
            )
            .unwrap();

        container
            .state
            .set_state("settings", json!({ "musicVolume": 0.1 }), WriteOptions::merge())
            .unwrap();
        write(&mut container, "settings.sfxVolume", json!(0.2));
        container.state.undo().unwrap();

        assert_eq!(
            *seen.lock(),
            vec![
                ("settings.musicVolume".to_string(), Some(json!(0.1))),
                ("settings.sfxVolume".to_string(), Some(json!(0.2))),
                ("settings.sfxVolume".to_string(), Some(json!(0.9))),
            ]
        );
    }

    #[test]
    fn test_out_of_range_settings_merge_rejected() {
        let mut container = container();
        let result = container.state.set_state(
            "settings",
            json!({ "musicVolume": 5.0, "difficulty": "hard" }),
            WriteOptions::merge(),
        );

        assert!(matches!(result, Err(StateError::Validation { .. })));
        assert_eq!(container.state.get("settings.musicVolume"), Some(json!(0.6)));
        assert_eq!(container.state.get("settings.difficulty"), Some(json!("normal")));
        assert!(container.effects.drain_effects().is_empty());
    }

    #[test]
    fn test_immediate_once_subscription_is_consumed() {
        let mut container = container();
        let calls = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&calls);
        container
            .state
            .subscribe(
                "game.score",
                move |_| *counter.lock() += 1,
                SubscribeOptions {
                    immediate: true,
                    once: true,
                    ..Default::default()
                },
            )
            .unwrap();

        write(&mut container, "game.score", json!(5));

        assert_eq!(*calls.lock(), 1);
        assert_eq!(container.state.subscription_count(), 0);
    }

    #[test]
    fn test_panicking_subscriber_does_not_block_write() {
        let mut container = container();
        container
            .state
            .subscribe("game.score", |_| panic!("ui crashed"), SubscribeOptions::default())
            .unwrap();

        assert!(write(&mut container, "game.score", json!(5)));
        assert_eq!(container.state.read_i64("game.score", 0), 5);
    }

    // =============================================================================
    // ASYNC & FRAME LOOP
    // =============================================================================

    #[tokio::test]
    async fn test_async_write_counts_operation() {
        let mut container = container();

        let changed = container
            .state
            .set_state_async("game.score", json!(12), WriteOptions::default())
            .await
            .unwrap();

        assert!(changed);
        assert_eq!(container.stats().async_operations, 1);
        assert_eq!(container.state.get("game.score"), Some(json!(12)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_scripted_run_stays_consistent() {
        let config = RuntimeConfig {
            frames: 480,
            seed: 2024,
            stats_every: 0,
            ..Default::default()
        };
        let mut game = GameLoop::new(GameContainer::new(config).unwrap());
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);

        let report = game.run(shutdown_rx).await.unwrap();

        assert!(report.frames_run == 480 || report.game_over);
        assert!(report.effects > 0);
        assert_eq!(report.stats.validation_errors, 0);
        assert!(report.stats.history.entries <= 100);

        let state = &game.container().state;
        let health = state.read_i64("game.player.health", -1);
        assert!((0..=state.read_i64("game.player.maxHealth", 0)).contains(&health));
        assert_eq!(report.final_score, state.read_i64("game.score", -1));
    }
}
