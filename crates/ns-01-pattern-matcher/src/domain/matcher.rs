//! # Pattern Matcher
//!
//! Owns the pattern table. Generic over the handler type so the same table
//! backs effect routing (`game-runtime`) and path subscriptions
//! (`ns-03-state-management`).

use super::{PatternEntry, PatternError, PatternId, PatternOptions, PatternSpec, PatternStats, PatternType};
use shared_types::compile_glob;
use std::cmp::Reverse;
use std::collections::BTreeMap;
use tracing::debug;

/// Priority-ordered pattern table.
#[derive(Debug)]
pub struct PatternMatcher<H> {
    /// Keyed by id; iteration order is registration order.
    patterns: BTreeMap<PatternId, PatternEntry<H>>,
    next_id: u64,
}

impl<H> PatternMatcher<H> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            patterns: BTreeMap::new(),
            next_id: 1,
        }
    }

    /// Register a pattern and return its id.
    ///
    /// # Errors
    ///
    /// - `PatternError::Empty` for an empty text pattern
    /// - `PatternError::InvalidGlob` if the glob fails to compile
    pub fn register(
        &mut self,
        pattern: impl Into<PatternSpec>,
        handler: H,
        options: PatternOptions,
    ) -> Result<PatternId, PatternError> {
        let spec = pattern.into();
        let pattern_type = spec.classify();

        let (source, compiled) = match spec {
            PatternSpec::Regex(regex) => (regex.as_str().to_string(), Some(regex)),
            PatternSpec::Text(text) if text.is_empty() => return Err(PatternError::Empty),
            PatternSpec::Text(text) if pattern_type == PatternType::Exact => (text, None),
            PatternSpec::Text(text) => {
                let regex = compile_glob(&text).map_err(|source| PatternError::InvalidGlob {
                    pattern: text.clone(),
                    source,
                })?;
                (text, Some(regex))
            }
        };

        let id = PatternId(self.next_id);
        self.next_id += 1;

        debug!(
            id = id.0,
            pattern = %source,
            pattern_type = ?pattern_type,
            priority = options.priority,
            once = options.once,
            "Pattern registered"
        );

        self.patterns.insert(
            id,
            PatternEntry {
                id,
                pattern: source,
                handler,
                priority: options.priority,
                once: options.once,
                pattern_type,
                compiled,
            },
        );
        Ok(id)
    }

    /// Remove by id. Returns whether it existed.
    pub fn unregister(&mut self, id: PatternId) -> bool {
        let removed = self.patterns.remove(&id).is_some();
        if removed {
            debug!(id = id.0, "Pattern unregistered");
        }
        removed
    }

    /// Every entry matching `name`, highest priority first.
    pub fn get_matches(&self, name: &str) -> Vec<&PatternEntry<H>> {
        let mut matches: Vec<&PatternEntry<H>> = self
            .patterns
            .values()
            .filter(|entry| entry.matches(name))
            .collect();
        // Stable: equal priorities stay in registration order.
        matches.sort_by_key(|entry| Reverse(entry.priority));
        matches
    }

    /// Delete the `once` entries among `ids`. Returns how many were removed.
    pub fn remove_once_patterns(&mut self, ids: &[PatternId]) -> usize {
        let mut removed = 0;
        for id in ids {
            if self.patterns.get(id).is_some_and(|entry| entry.once) {
                self.patterns.remove(id);
                removed += 1;
            }
        }
        removed
    }

    pub fn get(&self, id: PatternId) -> Option<&PatternEntry<H>> {
        self.patterns.get(&id)
    }

    /// All entries in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &PatternEntry<H>> {
        self.patterns.values()
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn stats(&self) -> PatternStats {
        let mut stats = PatternStats {
            total: self.patterns.len(),
            ..PatternStats::default()
        };
        for entry in self.patterns.values() {
            *stats.by_type.entry(entry.pattern_type).or_insert(0) += 1;
            *stats.by_priority.entry(entry.priority).or_insert(0) += 1;
            if entry.once {
                stats.once += 1;
            }
        }
        stats
    }

    pub fn clear(&mut self) {
        debug!(count = self.patterns.len(), "Pattern table cleared");
        self.patterns.clear();
    }
}

impl<H> Default for PatternMatcher<H> {
    fn default() -> Self {
        Self::new()
    }
}
