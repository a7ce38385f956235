//! Read-only services available to `prepare`.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

/// Auxiliary read-only services, looked up by type.
///
/// Registered once when the driver is built and shared by every attempt.
/// Nothing reachable from here may mutate the world.
#[derive(Default, Clone)]
pub struct PrepareContext {
    services: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl PrepareContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_service<T: Any + Send + Sync>(mut self, service: T) -> Self {
        self.services.insert(TypeId::of::<T>(), Arc::new(service));
        self
    }

    pub fn service<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.services
            .get(&TypeId::of::<T>())
            .and_then(|s| s.downcast_ref::<T>())
    }
}

impl std::fmt::Debug for PrepareContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrepareContext")
            .field("services", &self.services.len())
            .finish()
    }
}
