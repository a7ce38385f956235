//! In-memory commit log.

use std::collections::VecDeque;

use terra_core::{Change, Tick};

use crate::entry::JournalRecord;
use crate::error::{JournalError, JournalResult};

/// In-memory journal with a bounded retention window.
#[derive(Debug)]
pub struct MemoryJournal {
    /// Retained records, oldest first.
    records: VecDeque<JournalRecord>,
    /// Tick of the last appended batch (0 before any commit).
    head: Tick,
    /// Maximum number of records kept.
    retention: usize,
}

impl Default for MemoryJournal {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl MemoryJournal {
    /// Create a new empty journal keeping at most `retention` batches.
    pub fn new(retention: usize) -> Self {
        Self {
            records: VecDeque::new(),
            head: 0,
            retention,
        }
    }

    /// Tick of the last committed batch.
    pub fn head(&self) -> Tick {
        self.head
    }

    /// Tick the next appended batch will receive.
    pub fn next_tick(&self) -> Tick {
        self.head + 1
    }

    /// Oldest tick still retained, if any.
    pub fn oldest(&self) -> Option<Tick> {
        self.records.front().map(|r| r.tick)
    }

    /// Append a committed batch, returning its tick.
    pub fn append(&mut self, changes: Vec<Change>) -> Tick {
        self.head += 1;
        self.records.push_back(JournalRecord::new(self.head, changes));
        while self.records.len() > self.retention {
            self.records.pop_front();
        }
        self.head
    }

    /// All batches committed strictly after `tick`, oldest first.
    pub fn since(&self, tick: Tick) -> JournalResult<Vec<JournalRecord>> {
        if tick > self.head {
            return Err(JournalError::future_tick(tick, self.head));
        }
        if tick == self.head {
            return Ok(Vec::new());
        }
        match self.oldest() {
            Some(oldest) if tick + 1 >= oldest => Ok(self
                .records
                .iter()
                .filter(|r| r.tick > tick)
                .cloned()
                .collect()),
            Some(oldest) => Err(JournalError::truncated(tick, oldest)),
            None => Err(JournalError::truncated(tick, self.head + 1)),
        }
    }

    /// Number of retained records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
