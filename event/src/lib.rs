//! Terra Event
//!
//! The handler side of the world-mutation engine.
//!
//! Responsibilities:
//! - The four-phase handler contract (`prepare_involves`, `prepare`,
//!   `involves`, `apply`) and a registry keyed by event kind
//! - Resolution of specifications into entities, fresh ids and checkers
//! - Queried entities with read-your-writes staged patches
//! - The event context: create, delete and publish
//! - The working set of one transaction and its Change-To-Apply
//! - Firehose sinks for side-channel events

mod context;
mod error;
mod event;
mod firehose;
mod handler;
mod queried;
mod resolved;
mod services;
mod working;

pub use context::EventContext;
pub use error::{EventError, EventResult};
pub use event::Event;
pub use firehose::{FirehoseError, FirehoseSink, MemoryFirehose, NullFirehose};
pub use handler::{DynHandler, EventHandler, HandlerRegistry};
pub use queried::QueriedEntity;
pub use resolved::{IdPool, InvolvedEntities, PreparedEntities, Resolved, ResolvedEntities};
pub use services::PrepareContext;
pub use working::{StagedChanges, WorkingSet};
