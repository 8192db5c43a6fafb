//! Per-call options.

/// Options for `get_state`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReadOptions {
    /// Do not count this read in the statistics.
    pub skip_stats: bool,
}

impl ReadOptions {
    pub fn untracked() -> Self {
        Self { skip_stats: true }
    }
}

/// Options for `set_state`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WriteOptions {
    pub skip_validation: bool,
    pub skip_events: bool,
    pub skip_history: bool,
    /// Shallow-merge object values into the existing object instead of replacing it.
    pub merge: bool,
}

impl WriteOptions {
    pub fn merge() -> Self {
        Self {
            merge: true,
            ..Self::default()
        }
    }

    /// Write without validation, events or a history entry.
    pub fn silent() -> Self {
        Self {
            skip_validation: true,
            skip_events: true,
            skip_history: true,
            merge: false,
        }
    }
}

/// Options for `subscribe`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SubscribeOptions {
    /// Invoke the callback once with the current value right after subscribing.
    pub immediate: bool,
    /// Remove the subscription after its first notification.
    pub once: bool,
    /// Higher runs first.
    pub priority: i32,
}
