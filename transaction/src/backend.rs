//! The store-side services the driver talks to.

use std::sync::Arc;
use terra_event::{FirehoseSink, NullFirehose};
use terra_world::{IdAllocator, IndexSource, ProtectionSource, WorldStore};

/// Everything asynchronous an attempt needs.
///
/// The four store roles may be served by one object or by separate
/// services; the driver never assumes either.
#[derive(Clone)]
pub struct Backend {
    pub store: Arc<dyn WorldStore>,
    pub index: Arc<dyn IndexSource>,
    pub ids: Arc<dyn IdAllocator>,
    pub protections: Arc<dyn ProtectionSource>,
    pub firehose: Arc<dyn FirehoseSink>,
}

impl Backend {
    /// One object serving every store role, with no firehose.
    pub fn shared<S>(store: Arc<S>) -> Self
    where
        S: WorldStore + IndexSource + IdAllocator + ProtectionSource + 'static,
    {
        Self {
            store: store.clone(),
            index: store.clone(),
            ids: store.clone(),
            protections: store,
            firehose: Arc::new(NullFirehose),
        }
    }

    pub fn with_firehose(mut self, firehose: Arc<dyn FirehoseSink>) -> Self {
        self.firehose = firehose;
        self
    }

    pub fn with_store(mut self, store: Arc<dyn WorldStore>) -> Self {
        self.store = store;
        self
    }
}

impl std::fmt::Debug for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Backend").finish_non_exhaustive()
    }
}
