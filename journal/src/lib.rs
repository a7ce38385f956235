//! Terra Journal
//!
//! Ordered log of committed change batches.
//!
//! Responsibilities:
//! - Assign each committed batch a strictly increasing tick
//! - Keep a bounded window of recent batches
//! - Serve "everything after tick T" to resuming subscribers
//! - Report when a requested tick has already been truncated

mod entry;
mod error;
mod journal;

pub use entry::JournalRecord;
pub use error::{JournalError, JournalResult};
pub use journal::MemoryJournal;
