//! Sequential batch orchestration with a fixed extraction cadence.
//!
//! The extraction service enforces an undisclosed rate limit, so each item
//! occupies at least `throttle_interval` of wall time: whatever is left of
//! the interval after an item finishes is slept away before moving on.
//! Items never run concurrently and results keep input order.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::pipeline::ingest::CardIngestionPipeline;
use crate::traits::{
    asset_store::AssetStore, catalog::CatalogStore, clock::Clock, extractor::CardExtractor,
};
use crate::types::{
    config::BatchConfig,
    result::{BatchSummary, PipelineResult},
    upload::ImageUpload,
};

/// Enforces a minimum wall time per item.
pub struct Throttle {
    clock: Arc<dyn Clock>,
    interval: Duration,
}

impl Throttle {
    pub fn new(clock: Arc<dyn Clock>, interval: Duration) -> Self {
        Self { clock, interval }
    }

    /// Time left of the interval for an item that started at `started`.
    pub fn remaining(&self, started: DateTime<Utc>) -> Duration {
        let elapsed = (self.clock.now() - started).to_std().unwrap_or_default();
        self.interval.saturating_sub(elapsed)
    }

    /// Sleep out the rest of the interval, if any. Returns the wait.
    pub async fn pace(&self, started: DateTime<Utc>) -> Duration {
        let wait = self.remaining(started);
        if !wait.is_zero() {
            debug!("Waiting {}ms for rate limit", wait.as_millis());
            self.clock.sleep(wait).await;
        }
        wait
    }
}

/// Runs the pipeline over an ordered list of images.
pub struct BatchOrchestrator<E, A, C> {
    pipeline: CardIngestionPipeline<E, A, C>,
    config: BatchConfig,
}

impl<E, A, C> BatchOrchestrator<E, A, C>
where
    E: CardExtractor,
    A: AssetStore,
    C: CatalogStore,
{
    /// Create an orchestrator sharing the pipeline's clock.
    pub fn new(pipeline: CardIngestionPipeline<E, A, C>) -> Self {
        Self {
            pipeline,
            config: BatchConfig::default(),
        }
    }

    pub fn with_config(mut self, config: BatchConfig) -> Self {
        self.config = config;
        self
    }

    pub fn pipeline(&self) -> &CardIngestionPipeline<E, A, C> {
        &self.pipeline
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Ingest every image in order, one result per image.
    ///
    /// A batch longer than `max_batch_size` is refused as a whole with a
    /// single error element and no pipeline work. A failing item never
    /// stops the batch.
    pub async fn run_batch(&self, items: &[ImageUpload]) -> Vec<PipelineResult> {
        if items.is_empty() {
            return Vec::new();
        }

        if items.len() > self.config.max_batch_size {
            warn!(
                "Refusing batch of {} images (limit {})",
                items.len(),
                self.config.max_batch_size
            );
            return vec![PipelineResult::rejected(format!(
                "At most {} images can be processed at once (received {}).",
                self.config.max_batch_size,
                items.len()
            ))];
        }

        info!("Processing {} images sequentially", items.len());
        let clock = self.pipeline.clock().clone();
        let throttle = Throttle::new(clock.clone(), self.config.throttle_interval);
        let mut results = Vec::with_capacity(items.len());

        for (index, item) in items.iter().enumerate() {
            let started = clock.now();
            info!("[{}/{}] Processing {}", index + 1, items.len(), item.file_name);

            let result = self.pipeline.ingest(item).await;
            let elapsed = (clock.now() - started).num_milliseconds();
            info!(
                "[{}/{}] {}: {:?} ({} ms)",
                index + 1,
                items.len(),
                item.file_name,
                result.status(),
                elapsed
            );
            results.push(result);

            throttle.pace(started).await;
        }

        let summary = BatchSummary::from_results(&results);
        info!(
            "Batch complete: {} registered, {} duplicates, {} failed",
            summary.succeeded, summary.duplicates, summary.failed
        );

        results
    }
}
