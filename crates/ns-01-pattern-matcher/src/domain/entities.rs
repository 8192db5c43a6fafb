//! Pattern entities.

use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Opaque identifier returned by `PatternMatcher::register`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct PatternId(pub u64);

impl fmt::Display for PatternId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pattern-{}", self.0)
    }
}

/// How a pattern is tested against a name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternType {
    Exact,
    Glob,
    Wildcard,
    Regex,
}

/// Raw pattern as supplied by the caller.
#[derive(Clone, Debug)]
pub enum PatternSpec {
    Text(String),
    Regex(Regex),
}

impl From<&str> for PatternSpec {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for PatternSpec {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Regex> for PatternSpec {
    fn from(value: Regex) -> Self {
        Self::Regex(value)
    }
}

impl PatternSpec {
    /// First matching rule wins: regex, then `*`, then `?`, then exact.
    pub fn classify(&self) -> PatternType {
        match self {
            Self::Regex(_) => PatternType::Regex,
            Self::Text(text) if text.contains('*') => PatternType::Glob,
            Self::Text(text) if text.contains('?') => PatternType::Wildcard,
            Self::Text(_) => PatternType::Exact,
        }
    }

    /// Source text of the pattern.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Text(text) => text,
            Self::Regex(regex) => regex.as_str(),
        }
    }
}

/// Registration options.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PatternOptions {
    /// Higher runs first.
    pub priority: i32,
    /// Removed after it fires once.
    pub once: bool,
}

impl PatternOptions {
    pub fn with_priority(priority: i32) -> Self {
        Self {
            priority,
            once: false,
        }
    }

    pub fn once(mut self) -> Self {
        self.once = true;
        self
    }
}

/// A registered pattern and its handler.
#[derive(Clone, Debug)]
pub struct PatternEntry<H> {
    pub id: PatternId,
    pub pattern: String,
    pub handler: H,
    pub priority: i32,
    pub once: bool,
    pub pattern_type: PatternType,
    /// `None` for exact patterns.
    pub compiled: Option<Regex>,
}

impl<H> PatternEntry<H> {
    /// Type-appropriate test against `name`.
    pub fn matches(&self, name: &str) -> bool {
        match (&self.pattern_type, &self.compiled) {
            (PatternType::Exact, _) => self.pattern == name,
            (_, Some(regex)) => regex.is_match(name),
            (_, None) => false,
        }
    }
}

/// Counts by type and by priority bucket.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PatternStats {
    pub total: usize,
    pub once: usize,
    pub by_type: BTreeMap<PatternType, usize>,
    pub by_priority: BTreeMap<i32, usize>,
}
