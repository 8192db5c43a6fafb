//! Aggregated statistics.

use super::CacheStats;
use ns_02_state_history::HistoryStats;
use serde::Serialize;
use shared_bus::DispatcherStats;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Snapshot returned by `StateManager::stats`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StateStats {
    pub reads: u64,
    pub writes: u64,
    /// Writes skipped because the value was already deep-equal.
    pub no_op_writes: u64,
    pub validation_errors: u64,
    pub rollbacks: u64,
    pub async_operations: u64,
    pub subscription_count: usize,
    pub history: HistoryStats,
    pub events: DispatcherStats,
    pub cache: CacheStats,
    /// Error tally keyed by module (`path`, `validation`, `history`, ...).
    pub module_errors: BTreeMap<String, u64>,
}

/// Running counters owned by the manager. Reads go through `&self`, hence
/// the atomic.
#[derive(Debug, Default)]
pub(crate) struct Counters {
    pub reads: AtomicU64,
    pub writes: u64,
    pub no_op_writes: u64,
    pub validation_errors: u64,
    pub rollbacks: u64,
    pub async_operations: u64,
    pub module_errors: BTreeMap<String, u64>,
}

impl Counters {
    pub fn record_read(&self) {
        self.reads.fetch_add(1, Ordering::Relaxed);
    }

    pub fn reads(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }

    pub fn record_error(&mut self, module: &str, count: u64) {
        *self.module_errors.entry(module.to_string()).or_default() += count;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
