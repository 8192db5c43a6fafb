//! # State Properties
//!
//! Properties of the state manager that hold across `shared-types`,
//! `ns-02-state-history` and `ns-03-state-management` together.
//!
//! 1. **Idempotence**: the same write twice is one transition
//! 2. **Round-trip**: a read right after a write returns the written value
//! 3. **History bound**: the log never exceeds `max_history_size`
//! 4. **Undo/redo symmetry** and **branch truncation**
//! 5. **Malformed paths** are rejected before anything changes

#[cfg(test)]
mod tests {
    use std::borrow::Cow;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use ns_02_state_history::HistoryError;
    use ns_03_state_management::{
        ReadOptions, StateConfig, StateError, StateManager, SubscribeOptions, WriteOptions,
    };
    use serde_json::{json, Value};
    use shared_bus::{EventDispatcher, ListenerOptions, STATE_CHANGED};
    use shared_types::{deep_equal, PathError};

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    fn manager() -> (StateManager, EventDispatcher) {
        manager_with(StateConfig::default())
    }

    fn manager_with(config: StateConfig) -> (StateManager, EventDispatcher) {
        let dispatcher = EventDispatcher::new();
        (StateManager::new(config, dispatcher.clone()), dispatcher)
    }

    fn count_changes(dispatcher: &EventDispatcher) -> Arc<AtomicUsize> {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        dispatcher
            .on(
                STATE_CHANGED,
                move |_, _| {
                    seen.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                },
                ListenerOptions::default(),
            )
            .unwrap();
        count
    }

    fn write(sm: &mut StateManager, path: &str, value: Value) -> bool {
        sm.set_state(path, value, WriteOptions::default()).unwrap()
    }

    // =============================================================================
    // IDEMPOTENCE
    // =============================================================================

    #[test]
    fn test_same_write_twice_is_one_transition() {
        let (mut sm, dispatcher) = manager();
        let changes = count_changes(&dispatcher);
        let history_before = sm.history().len();

        assert!(write(&mut sm, "game.score", json!(100)));
        assert!(!write(&mut sm, "game.score", json!(100)));

        assert_eq!(sm.history().len(), history_before + 1);
        assert_eq!(changes.load(Ordering::SeqCst), 1);
        assert_eq!(sm.stats().writes, 1);
        assert_eq!(sm.stats().no_op_writes, 1);
    }

    #[test]
    fn test_numerically_equal_write_is_no_op() {
        let (mut sm, dispatcher) = manager();
        let changes = count_changes(&dispatcher);

        assert!(!write(&mut sm, "settings.masterVolume", json!(0.8)));
        assert!(!write(&mut sm, "game.level", json!(1.0)));

        assert_eq!(changes.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_deep_equal_object_write_is_no_op() {
        let (mut sm, _dispatcher) = manager();
        let position = sm.get("game.player.position").unwrap();

        assert!(!write(&mut sm, "game.player.position", position));
    }

    // =============================================================================
    // PATH ROUND-TRIP
    // =============================================================================

    #[test]
    fn test_read_after_write_round_trips() {
        let (mut sm, _dispatcher) = manager();
        let cases = [
            ("game.score", json!(4200)),
            ("settings.difficulty", json!("hard")),
            ("game.player.position", json!({ "x": 12.5, "y": -3 })),
            ("story.unlockedLogs", json!(["log-01", "log-02"])),
            ("mods.custom.enabled", json!(true)),
            ("player.unlockedWeapons.1", json!("laser")),
        ];

        for (path, value) in cases {
            write(&mut sm, path, value.clone());
            let read = sm.get_state(path, ReadOptions::default()).unwrap();
            assert!(deep_equal(&read, &value), "{path} did not round-trip");
        }
    }

    #[test]
    fn test_immutable_reads_are_copies() {
        let (mut sm, _dispatcher) = manager();
        write(&mut sm, "game.player.powerups", json!(["shield"]));

        let read = sm.get_state("game.player.powerups", ReadOptions::default()).unwrap();
        assert!(matches!(read, Cow::Owned(_)));
    }

    #[test]
    fn test_mutable_config_borrows_live_tree() {
        let (mut sm, _dispatcher) = manager_with(StateConfig {
            immutable: false,
            ..Default::default()
        });
        write(&mut sm, "game.score", json!(7));

        let read = sm.get_state("game.score", ReadOptions::default()).unwrap();
        assert!(matches!(read, Cow::Borrowed(_)));
        assert_eq!(*read, json!(7));
    }

    #[test]
    fn test_shared_reads_reuse_allocation_until_write() {
        let (mut sm, _dispatcher) = manager();

        let first = sm.get_shared("game.player").unwrap();
        let second = sm.get_shared("game.player").unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        write(&mut sm, "game.player.health", json!(50));
        let third = sm.get_shared("game.player").unwrap();
        assert!(!Arc::ptr_eq(&first, &third));
        assert_eq!(third["health"], json!(50));
    }

    // =============================================================================
    // HISTORY BOUND
    // =============================================================================

    #[test]
    fn test_history_never_exceeds_bound() {
        let max = 5;
        let (mut sm, _dispatcher) = manager_with(StateConfig {
            max_history_size: max,
            ..Default::default()
        });

        let writes = 8;
        for score in 1..=writes {
            write(&mut sm, "game.score", json!(score));
        }

        assert_eq!(sm.history().len(), max);
        let oldest = sm.history().get(0).unwrap();
        assert_eq!(oldest["game"]["score"], json!(writes - max as i64 + 1));
    }

    #[test]
    fn test_shrinking_bound_trims_oldest() {
        let (mut sm, _dispatcher) = manager();
        for score in 1..=10 {
            write(&mut sm, "game.score", json!(score));
        }

        sm.update_history_options(ns_02_state_history::HistoryOptionsUpdate {
            max_history_size: Some(3),
            ..Default::default()
        });

        assert_eq!(sm.history().len(), 3);
        assert_eq!(sm.history().get(0).unwrap()["game"]["score"], json!(8));
        assert_eq!(sm.undo().unwrap().unwrap()["game"]["score"], json!(9));
    }

    // =============================================================================
    // UNDO / REDO
    // =============================================================================

    #[test]
    fn test_undo_redo_symmetry() {
        let (mut sm, _dispatcher) = manager();
        let s0 = sm.get("").unwrap();

        write(&mut sm, "game.score", json!(10));
        write(&mut sm, "game.lives", json!(2));
        let s2 = sm.get("").unwrap();

        sm.undo().unwrap();
        sm.undo().unwrap();
        assert!(deep_equal(&sm.get("").unwrap(), &s0));

        sm.redo().unwrap();
        sm.redo().unwrap();
        assert!(deep_equal(&sm.get("").unwrap(), &s2));
    }

    #[test]
    fn test_new_edit_after_undo_drops_redo_branch() {
        let (mut sm, _dispatcher) = manager();
        write(&mut sm, "game.score", json!(1));
        write(&mut sm, "game.score", json!(2));

        sm.undo().unwrap();
        assert_eq!(sm.get("game.score"), Some(json!(1)));

        write(&mut sm, "game.score", json!(3));

        assert!(!sm.can_redo());
        assert_eq!(sm.redo().unwrap(), None);
        assert_eq!(sm.get("game.score"), Some(json!(3)));
    }

    #[test]
    fn test_undo_at_start_is_not_an_error() {
        let (mut sm, _dispatcher) = manager();
        assert_eq!(sm.undo().unwrap(), None);
        assert_eq!(sm.redo().unwrap(), None);
        assert!(sm.stats().module_errors.is_empty());
    }

    #[test]
    fn test_undo_with_history_disabled_fails() {
        let (mut sm, _dispatcher) = manager_with(StateConfig {
            enable_history: false,
            ..Default::default()
        });
        write(&mut sm, "game.score", json!(5));

        assert!(matches!(
            sm.undo(),
            Err(StateError::History(HistoryError::Disabled))
        ));
        assert!(!sm.can_undo());
        assert_eq!(sm.stats().module_errors["history"], 1);
    }

    #[test]
    fn test_score_undo_scenario() {
        let (mut sm, _dispatcher) = manager();

        write(&mut sm, "game.score", json!(100));
        assert_eq!(sm.get("game.score"), Some(json!(100)));

        sm.undo().unwrap();
        assert_eq!(sm.get("game.score"), Some(json!(0)));
        assert_eq!(sm.stats().history.history_operations, 1);
    }

    #[test]
    fn test_undo_notifies_exact_subscribers() {
        let (mut sm, _dispatcher) = manager();
        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        sm.subscribe(
            "game.score",
            move |change| sink.lock().push(change.new_value.clone()),
            SubscribeOptions::default(),
        )
        .unwrap();

        write(&mut sm, "game.score", json!(30));
        sm.undo().unwrap();

        assert_eq!(*seen.lock(), vec![Some(json!(30)), Some(json!(0))]);
    }

    // =============================================================================
    // MALFORMED PATHS
    // =============================================================================

    #[test]
    fn test_malformed_paths_rejected() {
        let (mut sm, dispatcher) = manager();
        let changes = count_changes(&dispatcher);
        let before = sm.get("").unwrap();

        for path in ["", "game..score", ".game", "game."] {
            let result = sm.set_state(path, json!(1), WriteOptions::default());
            assert!(
                matches!(result, Err(StateError::Path(_))),
                "{path:?} was accepted"
            );
        }

        assert_eq!(sm.get(""), Some(before));
        assert_eq!(changes.load(Ordering::SeqCst), 0);
        assert_eq!(sm.stats().module_errors["path"], 4);
    }

    #[test]
    fn test_array_index_past_end_rejected() {
        let (mut sm, _dispatcher) = manager();
        let result = sm.set_state("player.unlockedWeapons.5", json!("laser"), WriteOptions::default());
        assert!(matches!(
            result,
            Err(StateError::Path(PathError::IndexOutOfBounds { index: 5, len: 1, .. }))
        ));
    }

    #[test]
    fn test_malformed_subscription_rejected() {
        let (mut sm, _dispatcher) = manager();
        let result = sm.subscribe("game..score", |_| {}, SubscribeOptions::default());
        assert!(result.is_err());
        assert_eq!(sm.subscription_count(), 0);
    }

    #[test]
    fn test_missing_path_reads_none() {
        let (sm, _dispatcher) = manager();
        assert_eq!(sm.get("game.player.jetpack"), None);
        assert_eq!(sm.get("game.score.digits"), None);
    }
}
