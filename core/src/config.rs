//! Engine configuration.
//!
//! One immutable [`EngineConfig`] is built at startup and handed to every
//! component at construction time.

use serde::Deserialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Hard ceiling on ids a single `NewIds` request may reserve.
pub const MAX_NEW_IDS: usize = 100;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Attempts per event before giving up on conflicts or transient store errors.
    max_attempts: u32,
    backoff_base_ms: u64,
    backoff_max_ms: u64,
    /// Per-request `NewIds` cap, never above [`MAX_NEW_IDS`].
    max_new_ids: usize,
    /// Committed batches kept for resumable subscriptions.
    journal_retention: usize,
    health_poll_initial_ms: u64,
    health_poll_max_ms: u64,
    subscription_buffer: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff_base_ms: 10,
            backoff_max_ms: 1000,
            max_new_ids: MAX_NEW_IDS,
            journal_retention: 1024,
            health_poll_initial_ms: 10,
            health_poll_max_ms: 500,
            subscription_buffer: 256,
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::ReadFailed {
            path: path.to_path_buf(),
            source,
        })?;
        EngineConfig::from_json_str(&contents)
    }

    fn validate(self) -> Result<Self, ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::invalid("max_attempts must be at least 1"));
        }
        if self.max_new_ids > MAX_NEW_IDS {
            return Err(ConfigError::invalid(format!(
                "max_new_ids {} exceeds the hard cap of {}",
                self.max_new_ids, MAX_NEW_IDS
            )));
        }
        if self.backoff_base_ms > self.backoff_max_ms {
            return Err(ConfigError::invalid("backoff_base_ms exceeds backoff_max_ms"));
        }
        Ok(self)
    }

    // Builder-style overrides, mostly for tests and embedding.

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn with_backoff_ms(mut self, base: u64, max: u64) -> Self {
        self.backoff_base_ms = base;
        self.backoff_max_ms = max.max(base);
        self
    }

    pub fn with_journal_retention(mut self, retention: usize) -> Self {
        self.journal_retention = retention;
        self
    }

    pub fn with_max_new_ids(mut self, max: usize) -> Self {
        self.max_new_ids = max.min(MAX_NEW_IDS);
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_base_ms)
    }

    pub fn backoff_max(&self) -> Duration {
        Duration::from_millis(self.backoff_max_ms)
    }

    pub fn max_new_ids(&self) -> usize {
        self.max_new_ids
    }

    pub fn journal_retention(&self) -> usize {
        self.journal_retention
    }

    pub fn health_poll_initial(&self) -> Duration {
        Duration::from_millis(self.health_poll_initial_ms)
    }

    pub fn health_poll_max(&self) -> Duration {
        Duration::from_millis(self.health_poll_max_ms)
    }

    pub fn subscription_buffer(&self) -> usize {
        self.subscription_buffer.max(1)
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse engine config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to read engine config from {path:?}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid engine config: {0}")]
    Invalid(String),
}

impl ConfigError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid(message.into())
    }
}
