//! # Event Routing
//!
//! Dispatch-order and fault-isolation properties of `shared-bus`, and the
//! matching rules `ns-01-pattern-matcher` shares with it.
//!
//! ## Flows Tested
//!
//! 1. Listeners run in descending priority, ties in subscription order
//! 2. `*` and `?` wildcards match the same names on both crates
//! 3. A failing handler is reported once on `"error"` and never stops fan-out
//! 4. Deferred emits run only when the owner calls `process_deferred`

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use ns_01_pattern_matcher::{PatternMatcher, PatternOptions, PatternType};
    use parking_lot::Mutex;
    use serde_json::{json, Value};
    use shared_bus::{EmitOptions, EventDispatcher, HandlerError, ListenerOptions, ERROR_EVENT};

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    type Trace = Arc<Mutex<Vec<String>>>;

    fn trace() -> Trace {
        Arc::new(Mutex::new(Vec::new()))
    }

    fn record(dispatcher: &EventDispatcher, event: &str, label: &str, priority: i32, trace: &Trace) {
        let trace = Arc::clone(trace);
        let label = label.to_string();
        dispatcher
            .on(
                event,
                move |_, _| {
                    trace.lock().push(label.clone());
                    Ok(())
                },
                ListenerOptions::with_priority(priority),
            )
            .unwrap();
    }

    fn counter(dispatcher: &EventDispatcher, event: &str) -> Arc<AtomicUsize> {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        dispatcher
            .on(
                event,
                move |_, _| {
                    seen.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                },
                ListenerOptions::default(),
            )
            .unwrap();
        count
    }

    // =============================================================================
    // PRIORITY ORDERING
    // =============================================================================

    #[test]
    fn test_listeners_run_by_descending_priority() {
        let dispatcher = EventDispatcher::new();
        let calls = trace();
        record(&dispatcher, "tick", "1", 1, &calls);
        record(&dispatcher, "tick", "10", 10, &calls);
        record(&dispatcher, "tick", "5", 5, &calls);

        assert!(dispatcher.emit("tick", Value::Null));
        assert_eq!(*calls.lock(), vec!["10", "5", "1"]);
    }

    #[test]
    fn test_direct_and_wildcard_listeners_share_one_order() {
        let dispatcher = EventDispatcher::new();
        let calls = trace();
        record(&dispatcher, "game:*", "glob-3", 3, &calls);
        record(&dispatcher, "game:start", "direct-1", 1, &calls);
        record(&dispatcher, "game:start", "direct-7", 7, &calls);
        record(&dispatcher, "game:?????", "wild-5", 5, &calls);

        dispatcher.emit("game:start", Value::Null);

        assert_eq!(*calls.lock(), vec!["direct-7", "wild-5", "glob-3", "direct-1"]);
    }

    #[test]
    fn test_equal_priority_keeps_subscription_order() {
        let dispatcher = EventDispatcher::new();
        let calls = trace();
        for label in ["a", "b", "c"] {
            record(&dispatcher, "tick", label, 0, &calls);
        }

        dispatcher.emit("tick", Value::Null);
        assert_eq!(*calls.lock(), vec!["a", "b", "c"]);
    }

    // =============================================================================
    // WILDCARD MATCHING
    // =============================================================================

    #[test]
    fn test_star_wildcard_on_dispatcher() {
        let dispatcher = EventDispatcher::new();
        let hits = counter(&dispatcher, "user:*");

        assert!(dispatcher.emit("user:login", Value::Null));
        assert!(dispatcher.emit("user:login:success", Value::Null));
        assert!(!dispatcher.emit("admin:login", Value::Null));

        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_question_wildcard_on_dispatcher() {
        let dispatcher = EventDispatcher::new();
        let hits = counter(&dispatcher, "user:?");

        assert!(dispatcher.emit("user:1", Value::Null));
        assert!(!dispatcher.emit("user:ab", Value::Null));

        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_matcher_agrees_with_dispatcher() {
        let mut matcher = PatternMatcher::new();
        matcher.register("user:*", "star", PatternOptions::default()).unwrap();
        matcher.register("user:?", "one", PatternOptions::default()).unwrap();

        let names = |event: &str| -> Vec<&'static str> {
            matcher.get_matches(event).iter().map(|e| e.handler).collect()
        };

        assert_eq!(names("user:login"), vec!["star"]);
        assert_eq!(names("user:login:success"), vec!["star"]);
        assert_eq!(names("user:1"), vec!["star", "one"]);
        assert!(names("admin:login").is_empty());
    }

    #[test]
    fn test_matcher_orders_same_pattern_by_priority() {
        let mut matcher = PatternMatcher::new();
        let low = matcher
            .register("user:*", "h2", PatternOptions::with_priority(1))
            .unwrap();
        let high = matcher
            .register("user:*", "h", PatternOptions::with_priority(10))
            .unwrap();

        let matches = matcher.get_matches("user:login");
        let ids: Vec<_> = matches.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![high, low]);
        assert_eq!(matches[0].handler, "h");
        assert_eq!(matches[0].pattern_type, PatternType::Glob);
    }

    #[test]
    fn test_bare_wildcards() {
        let mut matcher = PatternMatcher::new();
        matcher.register("*", "any", PatternOptions::default()).unwrap();
        matcher.register("?", "single", PatternOptions::default()).unwrap();

        let names = |event: &str| -> Vec<&'static str> {
            matcher.get_matches(event).iter().map(|e| e.handler).collect()
        };

        assert_eq!(names(""), vec!["any"]);
        assert_eq!(names("x"), vec!["any", "single"]);
        assert_eq!(names("xy"), vec!["any"]);
    }

    #[test]
    fn test_metacharacters_are_literal() {
        let dispatcher = EventDispatcher::new();
        let hits = counter(&dispatcher, "score.+*");

        assert!(dispatcher.emit("score.+100", Value::Null));
        assert!(!dispatcher.emit("scoreX+100", Value::Null));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    // =============================================================================
    // ERROR ISOLATION
    // =============================================================================

    #[test]
    fn test_failing_handler_does_not_stop_fan_out() {
        let dispatcher = EventDispatcher::new();
        let errors: Arc<Mutex<Vec<Value>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&errors);
        dispatcher
            .on(
                ERROR_EVENT,
                move |data, _| {
                    sink.lock().push(data.clone());
                    Ok(())
                },
                ListenerOptions::default(),
            )
            .unwrap();

        dispatcher
            .on(
                "hit",
                |_, _| Err(HandlerError::new("boom")),
                ListenerOptions::with_priority(10),
            )
            .unwrap();
        let survivors = counter(&dispatcher, "hit");

        dispatcher.emit("hit", json!({ "damage": 5 }));

        assert_eq!(survivors.load(Ordering::SeqCst), 1);
        let errors = errors.lock();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0]["originalEvent"], json!("hit"));
        assert_eq!(errors[0]["error"], json!("boom"));
        assert!(errors[0]["timestamp"].is_u64());
    }

    #[test]
    fn test_panicking_handler_is_isolated() {
        let dispatcher = EventDispatcher::new();
        let errors = counter(&dispatcher, ERROR_EVENT);
        dispatcher
            .on(
                "hit",
                |_, _| panic!("handler exploded"),
                ListenerOptions::with_priority(10),
            )
            .unwrap();
        let survivors = counter(&dispatcher, "hit");

        dispatcher.emit("hit", Value::Null);

        assert_eq!(survivors.load(Ordering::SeqCst), 1);
        assert_eq!(errors.load(Ordering::SeqCst), 1);
        assert_eq!(dispatcher.stats().handler_errors, 1);
    }

    #[test]
    fn test_failing_error_handler_does_not_recurse() {
        let dispatcher = EventDispatcher::new();
        dispatcher
            .on(ERROR_EVENT, |_, _| Err(HandlerError::new("again")), ListenerOptions::default())
            .unwrap();
        dispatcher
            .on("hit", |_, _| Err(HandlerError::new("boom")), ListenerOptions::default())
            .unwrap();

        dispatcher.emit("hit", Value::Null);

        let stats = dispatcher.stats();
        assert_eq!(stats.handler_errors, 2);
        assert_eq!(stats.events_emitted, 2);
    }

    // =============================================================================
    // DEFERRED EMITS & ONCE
    // =============================================================================

    #[test]
    fn test_deferred_emit_waits_for_processing() {
        let dispatcher = EventDispatcher::new();
        let hits = counter(&dispatcher, "game:enemy_destroyed");

        assert!(dispatcher.emit_with("game:enemy_destroyed", Value::Null, EmitOptions::deferred()));
        assert_eq!(hits.load(Ordering::SeqCst), 0);

        assert_eq!(dispatcher.process_deferred(), 1);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(dispatcher.process_deferred(), 0);
    }

    #[test]
    fn test_once_listener_fires_once() {
        let dispatcher = EventDispatcher::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&hits);
        dispatcher
            .once(
                "game:boss_intro",
                move |_, _| {
                    seen.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                },
                ListenerOptions::default(),
            )
            .unwrap();

        dispatcher.emit("game:boss_intro", Value::Null);
        dispatcher.emit("game:boss_intro", Value::Null);

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(!dispatcher.has_listeners("game:boss_intro"));
    }

    #[test]
    fn test_event_history_is_chronological() {
        let dispatcher = EventDispatcher::with_history_size(3);
        for name in ["a", "b", "c", "d"] {
            dispatcher.emit(name, Value::Null);
        }

        let names: Vec<_> = dispatcher
            .event_history(10)
            .into_iter()
            .map(|r| r.event_name)
            .collect();
        assert_eq!(names, vec!["b", "c", "d"]);
    }
}
