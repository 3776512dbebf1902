//! Append-only per-field change ledger.

use std::collections::VecDeque;

use crate::models::ChangeRecord;

/// Maximum number of records retained.
pub const CHANGE_HISTORY_CAPACITY: usize = 50;

/// Most recent field mutations; the oldest record is dropped once full.
#[derive(Debug, Clone)]
pub struct ChangeHistoryLog {
    records: VecDeque<ChangeRecord>,
    capacity: usize,
}

impl Default for ChangeHistoryLog {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeHistoryLog {
    pub fn new() -> Self {
        Self::with_capacity(CHANGE_HISTORY_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    pub fn append(&mut self, record: ChangeRecord) {
        self.records.push_back(record);
        if self.records.len() > self.capacity {
            self.records.pop_front();
        }
    }

    pub fn extend(&mut self, records: impl IntoIterator<Item = ChangeRecord>) {
        for record in records {
            self.append(record);
        }
    }

    /// Records, newest first.
    pub fn entries(&self) -> impl Iterator<Item = &ChangeRecord> {
        self.records.iter().rev()
    }

    /// Records touching one field, newest first.
    pub fn for_field<'a>(
        &'a self,
        category: &'a str,
        field: &'a str,
    ) -> impl Iterator<Item = &'a ChangeRecord> + 'a {
        self.entries()
            .filter(move |r| r.category == category && r.field == field)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
