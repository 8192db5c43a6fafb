//! # Schema Validator
//!
//! Default [`StateValidator`]:
//!
//! 1. **Kind check**: where the schema has a non-null value at the written
//!    path, the new value must have the same JSON kind. Objects and arrays are
//!    compared node by node, so every nested value the schema knows is checked
//!    too. Paths the schema does not know are accepted.
//! 2. **Range rules**: numeric bounds keyed by path pattern. A bound is either
//!    a constant or a reference to another number in the state
//!    (`"maxHealth"` is a sibling, `"$game.player.maxHealth"` is absolute).
//!    Every numeric leaf of the written value is matched against the rules
//!    under its full path, so replacing or merging `game.player` or
//!    `settings` wholesale is still bounded.

use crate::domain::default_game_state;
use crate::ports::{StateValidator, ValidationFailure};
use ns_01_pattern_matcher::{PatternError, PatternId, PatternMatcher, PatternOptions};
use serde_json::Value;
use shared_types::{
    get_value_by_path, is_ancestor_path, join_path, parent_path, resolve_reference,
    PATH_SEPARATOR, REFERENCE_PREFIX,
};
use std::fmt;
use tracing::warn;

/// One side of a range.
#[derive(Clone, Debug, PartialEq)]
pub enum Bound {
    Value(f64),
    /// Resolved against the state at validation time.
    Reference(String),
}

/// Inclusive numeric range. A missing side is unbounded.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Range {
    pub min: Option<Bound>,
    pub max: Option<Bound>,
}

impl Range {
    pub fn at_least(min: f64) -> Self {
        Self {
            min: Some(Bound::Value(min)),
            max: None,
        }
    }

    pub fn between(min: f64, max: f64) -> Self {
        Self {
            min: Some(Bound::Value(min)),
            max: Some(Bound::Value(max)),
        }
    }

    /// `min..=<value of reference>`.
    pub fn up_to_reference(min: f64, reference: &str) -> Self {
        Self {
            min: Some(Bound::Value(min)),
            max: Some(Bound::Reference(reference.to_string())),
        }
    }
}

pub struct SchemaValidator {
    schema: Value,
    rules: PatternMatcher<Range>,
}

impl fmt::Debug for SchemaValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaValidator")
            .field("rules", &self.rules.len())
            .finish_non_exhaustive()
    }
}

impl SchemaValidator {
    /// Kind checks against `schema`, no range rules.
    pub fn new(schema: Value) -> Self {
        Self {
            schema,
            rules: PatternMatcher::new(),
        }
    }

    /// The game schema with the standard gameplay bounds.
    pub fn for_game() -> Self {
        let mut validator = Self::new(default_game_state());
        let rules = [
            ("game.score", Range::at_least(0.0)),
            ("game.highScore", Range::at_least(0.0)),
            ("game.lives", Range::at_least(0.0)),
            ("game.level", Range::at_least(1.0)),
            ("game.combo", Range::at_least(0.0)),
            ("game.player.health", Range::up_to_reference(0.0, "maxHealth")),
            ("game.player.maxHealth", Range::at_least(1.0)),
            ("game.player.shield", Range::between(0.0, 100.0)),
            ("game.boss.health", Range::up_to_reference(0.0, "maxHealth")),
            ("settings.*Volume", Range::between(0.0, 1.0)),
        ];
        for (pattern, range) in rules {
            if let Err(err) = validator.add_rule(pattern, range) {
                warn!(pattern, error = %err, "Skipping invalid range rule");
            }
        }
        validator
    }

    pub fn add_rule(&mut self, pattern: &str, range: Range) -> Result<PatternId, PatternError> {
        self.rules.register(pattern, range, PatternOptions::default())
    }

    pub fn schema(&self) -> &Value {
        &self.schema
    }

    fn check_kind(&self, path: &str, value: &Value) -> Result<(), ValidationFailure> {
        match get_value_by_path(&self.schema, path) {
            Some(expected) => check_kind_at(path, path, expected, value),
            None => Ok(()),
        }
    }

    fn check_ranges(&self, path: &str, value: &Value, state: &Value) -> Result<(), ValidationFailure> {
        let mut leaves = Vec::new();
        numeric_leaves(path, value, &mut leaves);

        for (leaf, number) in &leaves {
            for entry in self.rules.get_matches(leaf) {
                self.check_range(&entry.pattern, leaf, *number, &entry.handler, path, value, state)?;
            }
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn check_range(
        &self,
        rule: &str,
        target: &str,
        number: f64,
        range: &Range,
        written_path: &str,
        written: &Value,
        state: &Value,
    ) -> Result<(), ValidationFailure> {
        let resolve = |bound: &Option<Bound>| {
            bound
                .as_ref()
                .and_then(|b| resolve_bound(b, target, written_path, written, state))
        };

        if let Some(min) = resolve(&range.min) {
            if number < min {
                return Err(ValidationFailure::new(format!(
                    "{target} = {number} is below the minimum {min} ({rule})"
                )));
            }
        }
        if let Some(max) = resolve(&range.max) {
            if number > max {
                return Err(ValidationFailure::new(format!(
                    "{target} = {number} exceeds the maximum {max} ({rule})"
                )));
            }
        }
        Ok(())
    }
}

impl StateValidator for SchemaValidator {
    fn validate(&self, path: &str, value: &Value, state: &Value) -> Result<(), ValidationFailure> {
        self.check_kind(path, value)?;
        self.check_ranges(path, value, state)
    }
}

/// Resolve a bound, preferring the value being written when the reference
/// points into it. Unresolvable references leave that side unbounded.
fn resolve_bound(
    bound: &Bound,
    context: &str,
    written_path: &str,
    written: &Value,
    state: &Value,
) -> Option<f64> {
    let reference = match bound {
        Bound::Value(v) => return Some(*v),
        Bound::Reference(reference) => reference,
    };

    let absolute = match reference.strip_prefix(REFERENCE_PREFIX) {
        Some(absolute) => absolute.to_string(),
        None => match parent_path(context) {
            "" => reference.clone(),
            parent => format!("{parent}{PATH_SEPARATOR}{reference}"),
        },
    };

    let from_write = if absolute == written_path {
        Some(written.clone())
    } else if is_ancestor_path(written_path, &absolute) {
        get_value_by_path(written, &absolute[written_path.len() + 1..]).cloned()
    } else {
        None
    };

    let resolved = match from_write {
        Some(value) => Some(value),
        None => resolve_reference(reference, state, context).ok(),
    };

    let number = resolved.as_ref().and_then(Value::as_f64);
    if number.is_none() {
        warn!(reference = %reference, context, "Range bound did not resolve to a number");
    }
    number
}

/// Compare `value` against the schema node `expected`, descending into the
/// children both sides have.
fn check_kind_at(
    written_path: &str,
    at: &str,
    expected: &Value,
    value: &Value,
) -> Result<(), ValidationFailure> {
    if expected.is_null() {
        return Ok(());
    }
    if kind(expected) != kind(value) {
        let reason = format!("expected {}, got {}", kind(expected), kind(value));
        return Err(ValidationFailure::new(if at == written_path {
            reason
        } else {
            format!("{at}: {reason}")
        }));
    }

    match (expected, value) {
        (Value::Object(schema), Value::Object(written)) => {
            for (key, child) in written {
                if let Some(expected) = schema.get(key) {
                    check_kind_at(written_path, &join_path(at, key), expected, child)?;
                }
            }
        }
        (Value::Array(schema), Value::Array(written)) => {
            for (index, (expected, child)) in schema.iter().zip(written).enumerate() {
                check_kind_at(written_path, &join_path(at, &index.to_string()), expected, child)?;
            }
        }
        _ => {}
    }
    Ok(())
}

/// Every number inside `value`, keyed by its full path.
fn numeric_leaves(at: &str, value: &Value, out: &mut Vec<(String, f64)>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                numeric_leaves(&join_path(at, key), child, out);
            }
        }
        Value::Array(items) => {
            for (index, child) in items.iter().enumerate() {
                numeric_leaves(&join_path(at, &index.to_string()), child, out);
            }
        }
        _ => {
            if let Some(number) = value.as_f64() {
                out.push((at.to_string(), number));
            }
        }
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
