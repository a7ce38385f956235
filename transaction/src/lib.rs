//! Terra Transaction
//!
//! Optimistic transactions over a versioned world store.
//!
//! Responsibilities:
//! - Drive each event through `prepare_involves` → `prepare` → `involves` →
//!   `apply` against a consistent read
//! - Validate new-id requests before touching the store
//! - Submit staged changes as one Change-To-Apply guarded by iffs
//! - Retry conflicts and transient store errors from a fresh read, with
//!   bounded backoff
//! - Coalesce events sharing a merge key, with savepoints per event
//! - Deliver firehose events only after commit

mod backend;
mod backoff;
mod driver;
mod error;
mod outcome;

pub use backend::Backend;
pub use backoff::Backoff;
pub use driver::EventDriver;
pub use error::{TransactionError, TransactionResult};
pub use outcome::{AttemptState, EventOutcome};
