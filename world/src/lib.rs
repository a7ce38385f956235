//! Terra World
//!
//! The versioned entity store the engine runs against.
//!
//! Responsibilities:
//! - Define the store contract: versioned reads, atomic compare-and-set
//!   apply, resumable subscriptions and health
//! - Define the auxiliary read services: secondary indexes, ACL region scans
//!   and fresh id allocation
//! - Provide cancellation through abort signals
//! - Provide [`MemoryWorld`], the in-memory reference store, and [`Mirror`],
//!   a subscriber-side replica

mod error;
mod index;
mod memory;
mod mirror;
mod signal;
mod store;

pub use error::{StoreError, StoreResult};
pub use index::{IndexSpec, SecondaryIndex};
pub use memory::MemoryWorld;
pub use mirror::Mirror;
pub use signal::{AbortController, AbortSignal};
pub use store::{
    ApplyResult, IdAllocator, IndexSource, ProtectionSource, Subscription, SubscriptionConfig,
    UpdateBatch, UpdateKind, VersionedEntity, WorldStore,
};
