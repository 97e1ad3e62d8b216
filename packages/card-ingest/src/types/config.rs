//! Tunables for the pipeline and the batch orchestrator.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Largest batch accepted in one call.
pub const DEFAULT_MAX_BATCH_SIZE: usize = 12;

/// Minimum spacing between extraction calls within a batch.
pub const DEFAULT_THROTTLE_INTERVAL: Duration = Duration::from_millis(6000);

/// Options for a single pipeline run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineOptions {
    /// Delete the stored photo when no card metadata could be read.
    ///
    /// Default: false (photos are kept for manual review).
    pub discard_unreadable: bool,
}

impl PipelineOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_discard_unreadable(mut self, discard: bool) -> Self {
        self.discard_unreadable = discard;
        self
    }
}

/// Configuration for the batch orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Batches longer than this are refused outright. Default: 12.
    pub max_batch_size: usize,

    /// Each item occupies at least this much wall time. Default: 6s.
    pub throttle_interval: Duration,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
            throttle_interval: DEFAULT_THROTTLE_INTERVAL,
        }
    }
}

impl BatchConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_batch_size(mut self, max: usize) -> Self {
        self.max_batch_size = max;
        self
    }

    pub fn with_throttle_interval(mut self, interval: Duration) -> Self {
        self.throttle_interval = interval;
        self
    }
}
