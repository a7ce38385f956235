//! Journal record types.

use serde::{Deserialize, Serialize};
use terra_core::{Change, EntityId, Tick};

/// One committed batch: every change of a single Change-To-Apply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalRecord {
    /// Tick the batch committed at.
    pub tick: Tick,
    /// The committed changes, in commit order.
    pub changes: Vec<Change>,
}

impl JournalRecord {
    /// Create a new journal record.
    pub fn new(tick: Tick, changes: Vec<Change>) -> Self {
        Self { tick, changes }
    }

    /// Ids touched by this batch.
    pub fn touched(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.changes.iter().map(|c| c.id())
    }
}
