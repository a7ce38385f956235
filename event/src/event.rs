//! The event trait.

use std::fmt::Debug;
use terra_core::EntityId;

/// A dispatchable event. Usually implemented by one closed enum of payloads.
pub trait Event: Debug + Send + Sync + 'static {
    /// Name of the kind; selects exactly one handler.
    fn kind(&self) -> &'static str;

    /// The entity this event is about, if any. `delete(None)` removes it.
    fn target(&self) -> Option<EntityId> {
        None
    }
}
