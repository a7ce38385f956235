//! The handler contract and the registry that dispatches to it.
//!
//! A handler runs in four phases per attempt:
//!
//! 1. `prepare_involves`: a read-only first-pass specification
//! 2. `prepare`: pure computation over the first-pass entities
//! 3. `involves`: the authoritative specification of what the event touches
//! 4. `apply`: synchronous mutation of the resolved entities
//!
//! Every phase is re-run from scratch on retry; nothing derived in one
//! attempt survives into the next.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use terra_query::{InvolvedSpec, PrepareSpec};

use crate::context::EventContext;
use crate::error::{EventError, EventResult};
use crate::event::Event;
use crate::resolved::{InvolvedEntities, PreparedEntities};
use crate::services::PrepareContext;

/// Handles one event kind.
pub trait EventHandler<E: Event>: Send + Sync + 'static {
    /// Whatever `prepare` hands to `involves`.
    type Derived: Send + 'static;

    fn kind(&self) -> &'static str;

    /// Events of this kind sharing a key may be coalesced into one
    /// transaction.
    fn merge_key(&self, _event: &E) -> Option<String> {
        None
    }

    fn prepare_involves(&self, _event: &E) -> EventResult<PrepareSpec> {
        Ok(PrepareSpec::new())
    }

    fn prepare(
        &self,
        prepared: &PreparedEntities,
        event: &E,
        ctx: &PrepareContext,
    ) -> EventResult<Self::Derived>;

    fn involves(&self, event: &E, derived: &Self::Derived) -> EventResult<InvolvedSpec>;

    fn apply(
        &self,
        involved: &mut InvolvedEntities,
        event: &E,
        ctx: &mut EventContext<'_>,
    ) -> EventResult<()>;
}

/// Object-safe form of [`EventHandler`], with the derived value erased.
pub trait DynHandler<E: Event>: Send + Sync {
    fn kind(&self) -> &'static str;
    fn merge_key(&self, event: &E) -> Option<String>;
    fn prepare_involves(&self, event: &E) -> EventResult<PrepareSpec>;
    fn prepare(
        &self,
        prepared: &PreparedEntities,
        event: &E,
        ctx: &PrepareContext,
    ) -> EventResult<Box<dyn Any + Send>>;
    fn involves(&self, event: &E, derived: &(dyn Any + Send)) -> EventResult<InvolvedSpec>;
    fn apply(
        &self,
        involved: &mut InvolvedEntities,
        event: &E,
        ctx: &mut EventContext<'_>,
    ) -> EventResult<()>;
}

impl<E: Event, H: EventHandler<E>> DynHandler<E> for H {
    fn kind(&self) -> &'static str {
        <H as EventHandler<E>>::kind(self)
    }

    fn merge_key(&self, event: &E) -> Option<String> {
        <H as EventHandler<E>>::merge_key(self, event)
    }

    fn prepare_involves(&self, event: &E) -> EventResult<PrepareSpec> {
        <H as EventHandler<E>>::prepare_involves(self, event)
    }

    fn prepare(
        &self,
        prepared: &PreparedEntities,
        event: &E,
        ctx: &PrepareContext,
    ) -> EventResult<Box<dyn Any + Send>> {
        let derived = <H as EventHandler<E>>::prepare(self, prepared, event, ctx)?;
        Ok(Box::new(derived))
    }

    fn involves(&self, event: &E, derived: &(dyn Any + Send)) -> EventResult<InvolvedSpec> {
        let derived = derived.downcast_ref::<H::Derived>().ok_or_else(|| {
            EventError::invariant(format!(
                "derived value of '{}' has the wrong type",
                <H as EventHandler<E>>::kind(self)
            ))
        })?;
        <H as EventHandler<E>>::involves(self, event, derived)
    }

    fn apply(
        &self,
        involved: &mut InvolvedEntities,
        event: &E,
        ctx: &mut EventContext<'_>,
    ) -> EventResult<()> {
        <H as EventHandler<E>>::apply(self, involved, event, ctx)
    }
}

/// Handlers keyed by event kind. Exactly one handler per kind.
pub struct HandlerRegistry<E: Event> {
    handlers: HashMap<&'static str, Arc<dyn DynHandler<E>>>,
}

impl<E: Event> Default for HandlerRegistry<E> {
    fn default() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }
}

impl<E: Event> HandlerRegistry<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<H: EventHandler<E>>(&mut self, handler: H) -> EventResult<()> {
        let kind = <H as EventHandler<E>>::kind(&handler);
        if self.handlers.contains_key(kind) {
            return Err(EventError::duplicate_handler(kind));
        }
        self.handlers.insert(kind, Arc::new(handler));
        Ok(())
    }

    /// Builder form of [`register`](Self::register).
    pub fn with<H: EventHandler<E>>(mut self, handler: H) -> EventResult<Self> {
        self.register(handler)?;
        Ok(self)
    }

    pub fn get(&self, kind: &str) -> EventResult<Arc<dyn DynHandler<E>>> {
        self.handlers
            .get(kind)
            .cloned()
            .ok_or_else(|| EventError::no_handler(kind))
    }

    pub fn for_event(&self, event: &E) -> EventResult<Arc<dyn DynHandler<E>>> {
        self.get(event.kind())
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl<E: Event> std::fmt::Debug for HandlerRegistry<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut kinds: Vec<_> = self.handlers.keys().collect();
        kinds.sort();
        f.debug_struct("HandlerRegistry").field("kinds", &kinds).finish()
    }
}
