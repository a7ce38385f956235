//! Firehose sinks: side-channel events delivered after commit.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use terra_core::FirehoseEvent;
use thiserror::Error;
use tokio::sync::Mutex;

#[derive(Debug, Error)]
#[error("firehose delivery failed: {0}")]
pub struct FirehoseError(pub String);

/// Receives events of committed transactions. Delivery is best effort.
#[async_trait]
pub trait FirehoseSink: Send + Sync {
    async fn publish(&self, events: Vec<FirehoseEvent>) -> Result<(), FirehoseError>;
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullFirehose;

#[async_trait]
impl FirehoseSink for NullFirehose {
    async fn publish(&self, _events: Vec<FirehoseEvent>) -> Result<(), FirehoseError> {
        Ok(())
    }
}

/// Keeps delivered events in memory.
#[derive(Debug, Default)]
pub struct MemoryFirehose {
    events: Mutex<Vec<FirehoseEvent>>,
    failing: AtomicBool,
}

impl MemoryFirehose {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following delivery fail.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub async fn events(&self) -> Vec<FirehoseEvent> {
        self.events.lock().await.clone()
    }
}

#[async_trait]
impl FirehoseSink for MemoryFirehose {
    async fn publish(&self, events: Vec<FirehoseEvent>) -> Result<(), FirehoseError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(FirehoseError("sink is failing".into()));
        }
        self.events.lock().await.extend(events);
        Ok(())
    }
}
