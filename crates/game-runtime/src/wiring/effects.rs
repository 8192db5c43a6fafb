//! # Effect Routing
//!
//! Side effects (sound cues, UI refreshes, achievements) keyed by event
//! pattern. One catch-all dispatcher listener feeds every emitted event
//! through a [`PatternMatcher`]; matching handlers run by priority and may
//! produce an [`Effect`].
//!
//! ## Routed names
//!
//! ```text
//! emit("state:changed", {path: "game.player.health", ...})
//!        │
//!        ├─→ "state:changed"                       (the event itself)
//!        └─→ "state:changed:game.player.health"    (event + written path)
//! ```
//!
//! The derived name lets bindings target paths with globs such as
//! `state:changed:settings.*Volume`.

use ns_01_pattern_matcher::{PatternError, PatternId, PatternMatcher, PatternOptions};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use shared_bus::{
    DispatchError, EventDispatcher, ListenerOptions, Unsubscribe, ERROR_EVENT, STATE_CHANGED,
};
use std::sync::Arc;
use tracing::{debug, info};

/// A side effect requested by a binding.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum Effect {
    PlaySound(String),
    RefreshUi(String),
    UnlockAchievement(String),
    Log(String),
}

/// `(routed_name, event_data) -> effect`.
pub type EffectHandler = Arc<dyn Fn(&str, &Value) -> Option<Effect> + Send + Sync>;

/// Runs after gameplay listeners.
const ROUTER_PRIORITY: i32 = -100;

/// Keep at most this many unread effects.
const MAX_PENDING_EFFECTS: usize = 1024;

pub struct EffectRouter {
    bindings: Arc<Mutex<PatternMatcher<EffectHandler>>>,
    pending: Arc<Mutex<Vec<Effect>>>,
    listener: Option<Unsubscribe>,
}

impl Default for EffectRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl EffectRouter {
    pub fn new() -> Self {
        Self {
            bindings: Arc::new(Mutex::new(PatternMatcher::new())),
            pending: Arc::new(Mutex::new(Vec::new())),
            listener: None,
        }
    }

    /// Router pre-loaded with the standard game bindings.
    pub fn with_default_bindings() -> Result<Self, PatternError> {
        let router = Self::new();
        register_default_bindings(&router)?;
        Ok(router)
    }

    pub fn bind<F>(
        &self,
        pattern: &str,
        handler: F,
        options: PatternOptions,
    ) -> Result<PatternId, PatternError>
    where
        F: Fn(&str, &Value) -> Option<Effect> + Send + Sync + 'static,
    {
        self.bindings
            .lock()
            .register(pattern, Arc::new(handler) as EffectHandler, options)
    }

    pub fn unbind(&self, id: PatternId) -> bool {
        self.bindings.lock().unregister(id)
    }

    pub fn binding_count(&self) -> usize {
        self.bindings.lock().len()
    }

    /// Subscribe to every event on `dispatcher`. Replaces a previous attachment.
    pub fn attach(&mut self, dispatcher: &EventDispatcher) -> Result<(), DispatchError> {
        self.detach();
        let bindings = Arc::clone(&self.bindings);
        let pending = Arc::clone(&self.pending);
        let handle = dispatcher.on(
            "*",
            move |data: &Value, event_name: &str| {
                route(&bindings, &pending, event_name, data);
                Ok(())
            },
            ListenerOptions::with_priority(ROUTER_PRIORITY),
        )?;
        info!(listener = %handle.id(), "Effect router attached");
        self.listener = Some(handle);
        Ok(())
    }

    /// Remove the dispatcher listener. Returns whether one was attached.
    pub fn detach(&mut self) -> bool {
        self.listener
            .take()
            .is_some_and(|handle| handle.unsubscribe())
    }

    /// Route one event directly, without a dispatcher. Returns the number of
    /// effects produced.
    pub fn route(&self, event_name: &str, data: &Value) -> usize {
        route(&self.bindings, &self.pending, event_name, data)
    }

    /// Take every effect produced since the last drain, oldest first.
    pub fn drain_effects(&self) -> Vec<Effect> {
        std::mem::take(&mut *self.pending.lock())
    }
}

fn route(
    bindings: &Mutex<PatternMatcher<EffectHandler>>,
    pending: &Mutex<Vec<Effect>>,
    event_name: &str,
    data: &Value,
) -> usize {
    let mut names = vec![event_name.to_string()];
    if event_name == STATE_CHANGED {
        if let Some(path) = data.get("path").and_then(Value::as_str) {
            names.push(format!("{event_name}:{path}"));
        }
    }

    let mut produced = Vec::new();
    for name in &names {
        // Handlers run outside the lock so they may bind or unbind.
        let matched: Vec<(PatternId, EffectHandler)> = {
            let mut table = bindings.lock();
            let matched: Vec<_> = table
                .get_matches(name)
                .into_iter()
                .map(|entry| (entry.id, Arc::clone(&entry.handler)))
                .collect();
            let ids: Vec<PatternId> = matched.iter().map(|(id, _)| *id).collect();
            table.remove_once_patterns(&ids);
            matched
        };

        for (id, handler) in matched {
            if let Some(effect) = handler(name, data) {
                debug!(binding = %id, routed = %name, effect = ?effect, "Effect produced");
                produced.push(effect);
            }
        }
    }

    let count = produced.len();
    if count > 0 {
        let mut pending = pending.lock();
        pending.extend(produced);
        if pending.len() > MAX_PENDING_EFFECTS {
            let excess = pending.len() - MAX_PENDING_EFFECTS;
            pending.drain(..excess);
        }
    }
    count
}

fn number(data: &Value, key: &str) -> Option<f64> {
    data.get(key).and_then(Value::as_f64)
}

/// Standard bindings for the Nova Strike demo.
pub fn register_default_bindings(router: &EffectRouter) -> Result<(), PatternError> {
    router.bind(
        "state:changed:game.score",
        |_, _| Some(Effect::RefreshUi("score".into())),
        PatternOptions::default(),
    )?;

    router.bind(
        "state:changed:game.player.health",
        |_, data| match (number(data, "value"), number(data, "previousValue")) {
            (Some(now), Some(before)) if now < before => Some(Effect::PlaySound("player_hit".into())),
            (Some(now), Some(before)) if now > before => Some(Effect::PlaySound("heal".into())),
            _ => None,
        },
        PatternOptions::with_priority(10),
    )?;

    router.bind(
        "state:changed:game.player.health",
        |_, data| {
            number(data, "value")
                .filter(|health| *health > 0.0 && *health <= 25.0)
                .map(|_| Effect::PlaySound("low_health_alarm".into()))
        },
        PatternOptions::with_priority(5),
    )?;

    router.bind(
        "state:changed:game.level",
        |_, _| Some(Effect::UnlockAchievement("first_sector_cleared".into())),
        PatternOptions::default().once(),
    )?;

    router.bind(
        "state:changed:game.lives",
        |_, data| {
            number(data, "value")
                .filter(|lives| *lives == 0.0)
                .map(|_| Effect::RefreshUi("game_over".into()))
        },
        PatternOptions::default(),
    )?;

    router.bind(
        "state:changed:settings.*Volume",
        |_, _| Some(Effect::RefreshUi("audio_settings".into())),
        PatternOptions::default(),
    )?;

    router.bind(
        "state:*do",
        |name, _| Some(Effect::RefreshUi(format!("history:{}", &name["state:".len()..]))),
        PatternOptions::default(),
    )?;

    router.bind(
        "state:reset",
        |_, _| Some(Effect::RefreshUi("all".into())),
        PatternOptions::default(),
    )?;

    router.bind(
        "game:enemy_destroyed",
        |_, _| Some(Effect::PlaySound("explosion".into())),
        PatternOptions::default(),
    )?;

    router.bind(
        "game:boss_*",
        |name, _| Some(Effect::PlaySound(name.replace(':', "_"))),
        PatternOptions::default(),
    )?;

    router.bind(
        ERROR_EVENT,
        |_, data| {
            let message = data.get("error").and_then(Value::as_str).unwrap_or("unknown");
            Some(Effect::Log(format!("handler error: {message}")))
        },
        PatternOptions::default(),
    )?;

    Ok(())
}
