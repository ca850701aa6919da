//! Sync layer configuration.

use coursetrack_core::EngineConfig;

/// Default watched seconds between two video progress writes.
pub const DEFAULT_PERSIST_INTERVAL_SECONDS: f64 = 10.0;

/// Default capacity of the change notification channel.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Configuration for loading and learner event handling.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncConfig {
    /// Reconciliation engine settings.
    pub engine: EngineConfig,
    /// Only list published items.
    pub published_only: bool,
    /// Watched seconds that must accumulate before video progress is written.
    pub persist_interval_seconds: f64,
    /// Capacity of the change notification channel.
    pub event_capacity: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            published_only: true,
            persist_interval_seconds: DEFAULT_PERSIST_INTERVAL_SECONDS,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl SyncConfig {
    /// Creates a new config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the engine configuration.
    pub fn with_engine(mut self, engine: EngineConfig) -> Self {
        self.engine = engine;
        self
    }

    /// Sets whether unpublished items are listed.
    pub fn with_published_only(mut self, published_only: bool) -> Self {
        self.published_only = published_only;
        self
    }

    /// Sets the video persist interval. Negative or non-finite values are ignored.
    pub fn with_persist_interval(mut self, seconds: f64) -> Self {
        if seconds.is_finite() && seconds >= 0.0 {
            self.persist_interval_seconds = seconds;
        }
        self
    }

    /// Sets the event channel capacity (at least 1).
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity.max(1);
        self
    }
}
