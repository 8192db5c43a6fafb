//! # Event Log
//!
//! Fixed-capacity ring buffer of emitted events.
//!
//! - Inserts overwrite the oldest slot in place (O(1), no shifting)
//! - The buffer never grows past its capacity
//! - `recent(limit)` walks backward from the write position and returns the
//!   slice oldest-first

use crate::events::EventRecord;

#[derive(Debug, Clone)]
pub struct EventLog {
    slots: Vec<Option<EventRecord>>,
    /// Next slot to write.
    write_index: usize,
    len: usize,
}

impl EventLog {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: (0..capacity).map(|_| None).collect(),
            write_index: 0,
            len: 0,
        }
    }

    pub fn push(&mut self, record: EventRecord) {
        let capacity = self.slots.len();
        if capacity == 0 {
            return;
        }
        self.slots[self.write_index] = Some(record);
        self.write_index = (self.write_index + 1) % capacity;
        self.len = (self.len + 1).min(capacity);
    }

    /// The most recent `limit` records, oldest first.
    pub fn recent(&self, limit: usize) -> Vec<EventRecord> {
        let capacity = self.slots.len();
        let count = limit.min(self.len);
        let mut records: Vec<EventRecord> = (1..=count)
            .filter_map(|offset| {
                let index = (self.write_index + capacity - offset) % capacity;
                self.slots[index].clone()
            })
            .collect();
        records.reverse();
        records
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(|slot| *slot = None);
        self.write_index = 0;
        self.len = 0;
    }
}
