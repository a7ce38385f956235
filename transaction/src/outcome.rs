//! Attempt states and per-event outcomes.

use std::fmt;
use std::sync::Arc;
use terra_core::{Change, Tick};

use crate::error::TransactionError;

/// Where one attempt currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptState {
    Queued,
    ReadFirstPass,
    Derived,
    FinalSpecResolved,
    SnapshotFetched,
    Committed,
    Conflicted,
    RolledBack,
    FatalError,
}

impl AttemptState {
    /// States an attempt cannot leave.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AttemptState::Committed | AttemptState::RolledBack | AttemptState::FatalError
        )
    }
}

impl fmt::Display for AttemptState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AttemptState::Queued => "queued",
            AttemptState::ReadFirstPass => "read-first-pass",
            AttemptState::Derived => "derived",
            AttemptState::FinalSpecResolved => "final-spec-resolved",
            AttemptState::SnapshotFetched => "snapshot-fetched",
            AttemptState::Committed => "committed",
            AttemptState::Conflicted => "conflicted",
            AttemptState::RolledBack => "rolled-back",
            AttemptState::FatalError => "fatal-error",
        };
        f.write_str(name)
    }
}

/// What happened to one event.
#[derive(Debug)]
pub enum EventOutcome {
    /// The event's transaction landed. `tick` is `None` when it wrote
    /// nothing.
    Committed {
        tick: Option<Tick>,
        changes: Vec<Change>,
        attempts: u32,
    },
    /// The handler decided not to act. Nothing was written.
    RolledBack { reason: String },
    /// A required query matched nothing. Nothing was written.
    Unsatisfied { name: String },
    /// The event was dropped with an error. Shared by every member of a
    /// coalesced group that failed together.
    Failed { error: Arc<TransactionError> },
}

impl EventOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, EventOutcome::Committed { .. })
    }

    pub fn is_rolled_back(&self) -> bool {
        matches!(self, EventOutcome::RolledBack { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, EventOutcome::Failed { .. })
    }

    pub fn tick(&self) -> Option<Tick> {
        match self {
            EventOutcome::Committed { tick, .. } => *tick,
            _ => None,
        }
    }

    pub fn changes(&self) -> &[Change] {
        match self {
            EventOutcome::Committed { changes, .. } => changes,
            _ => &[],
        }
    }
}
