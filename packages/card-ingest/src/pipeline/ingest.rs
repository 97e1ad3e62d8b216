//! Ingestion pipeline - store, extract, name, dedup, register.
//!
//! One image moves through `Stored → Extracted → {Duplicate | Registered |
//! Failed}`. Every terminal state becomes a [`PipelineResult`]; nothing
//! here returns an error to the caller.
//!
//! The duplicate check and the append are two separate catalog calls, so
//! two overlapping runs for the same new card id can both register it.
//! Callers that need stronger guarantees must serialize ingestion.

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::pipeline::naming;
use crate::traits::{
    asset_store::AssetStore,
    catalog::CatalogStore,
    clock::{Clock, SystemClock},
    extractor::{CardExtractor, Extracted},
};
use crate::types::{
    card::CardInfo,
    catalog::{CatalogEntry, CatalogListing},
    config::PipelineOptions,
    result::{FailureStage, PipelineResult},
    upload::ImageUpload,
};

/// A pipeline step either yields a value or ends the run with a result.
type Step<T> = std::result::Result<T, PipelineResult>;

/// Runs single images through the ingestion state machine.
pub struct CardIngestionPipeline<E, A, C> {
    extractor: E,
    assets: A,
    catalog: C,
    clock: Arc<dyn Clock>,
    options: PipelineOptions,
}

impl<E, A, C> CardIngestionPipeline<E, A, C>
where
    E: CardExtractor,
    A: AssetStore,
    C: CatalogStore,
{
    /// Create a pipeline on the system clock with default options.
    pub fn new(extractor: E, assets: A, catalog: C) -> Self {
        Self {
            extractor,
            assets,
            catalog,
            clock: Arc::new(SystemClock),
            options: PipelineOptions::default(),
        }
    }

    /// Use a different clock for timestamps.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_options(mut self, options: PipelineOptions) -> Self {
        self.options = options;
        self
    }

    pub fn extractor(&self) -> &E {
        &self.extractor
    }

    pub fn assets(&self) -> &A {
        &self.assets
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Ingest one image.
    pub async fn ingest(&self, upload: &ImageUpload) -> PipelineResult {
        match self.run(upload).await {
            Ok(result) | Err(result) => result,
        }
    }

    /// Current catalog contents for display.
    pub async fn list_catalog(&self) -> crate::error::CatalogResult<CatalogListing> {
        super::list_catalog(&self.catalog).await
    }

    async fn run(&self, upload: &ImageUpload) -> Step<PipelineResult> {
        let original = upload.file_name.as_str();

        if let Some(reason) = upload.validate() {
            warn!("Rejected upload {:?}: {}", original, reason);
            return Err(PipelineResult::failed(original, FailureStage::Validation, reason));
        }

        let asset_id = self.store(upload).await?;
        let card = self.extract(upload, &asset_id).await?;

        let extension = naming::file_extension(original);
        let existing = self
            .catalog
            .find_by_id(&card.card_id)
            .await
            .map_err(|e| {
                warn!("Catalog lookup failed for {}: {}", card.card_id, e);
                PipelineResult::failed(
                    original,
                    FailureStage::Lookup,
                    format!("Catalog lookup failed: {}", e),
                )
                .with_card_id(&card.card_id)
                .with_asset_id(&asset_id)
            })?;

        match existing {
            Some(entry) => {
                info!(
                    "Duplicate card {} (registered {} as {})",
                    card.card_id, entry.registered_at, entry.file_name
                );
                Ok(self.mark_duplicate(original, &card, &asset_id, extension).await)
            }
            None => {
                info!("New card {}, registering", card.card_id);
                self.register(original, &card, &asset_id, extension).await
            }
        }
    }

    /// Stored: save under the original name.
    async fn store(&self, upload: &ImageUpload) -> Step<String> {
        let original = upload.file_name.as_str();

        match self.assets.save(&upload.bytes, original).await {
            Ok(asset_id) => {
                info!("Stored {} as asset {}", original, asset_id);
                Ok(asset_id)
            }
            Err(e) => {
                warn!("Failed to store {}: {}", original, e);
                Err(PipelineResult::failed(
                    original,
                    FailureStage::Storage,
                    format!("Failed to store image: {}", e),
                ))
            }
        }
    }

    /// Extracted: ask the service for card metadata.
    async fn extract(&self, upload: &ImageUpload, asset_id: &str) -> Step<CardInfo> {
        let original = upload.file_name.as_str();
        let mime_type = upload.mime_type();
        debug!("Extracting card info from {} ({})", original, mime_type);

        let failure = match self.extractor.extract(&upload.bytes, &mime_type).await {
            Ok(Extracted::Card(card)) => {
                if !card.has_canonical_id() {
                    warn!("Card id {:?} does not look like PREFIX-NN-NNN", card.card_id);
                }
                return Ok(card);
            }
            Ok(Extracted::Incomplete { missing }) => {
                warn!("No usable card info in {} (missing: {:?})", original, missing);
                PipelineResult::failed(
                    original,
                    FailureStage::Unreadable,
                    format!(
                        "Could not read card information (missing: {}). File name was not changed.",
                        missing.join(", ")
                    ),
                )
            }
            Err(e) => {
                warn!("Extraction failed for {}: {}", original, e);
                PipelineResult::failed(
                    original,
                    FailureStage::Extraction,
                    format!("Card extraction failed: {}", e),
                )
            }
        };

        Err(self.discard_if_configured(failure, asset_id).await)
    }

    /// Duplicate: keep the photo under a timestamped name, no catalog write.
    async fn mark_duplicate(
        &self,
        original: &str,
        card: &CardInfo,
        asset_id: &str,
        extension: &str,
    ) -> PipelineResult {
        let target = naming::duplicate_file_name(&card.card_id, extension, self.clock.now());
        let file_name = self.rename_or_keep(asset_id, &target, original).await;
        PipelineResult::duplicate(original, &card.card_id, file_name, asset_id)
    }

    /// Registered: canonical name, then append to the catalog.
    ///
    /// If the append fails the asset keeps its new name; the catalog and
    /// the asset store then disagree until someone intervenes.
    async fn register(
        &self,
        original: &str,
        card: &CardInfo,
        asset_id: &str,
        extension: &str,
    ) -> Step<PipelineResult> {
        let target = naming::canonical_file_name(&card.card_id, extension);
        let file_name = self.rename_or_keep(asset_id, &target, original).await;

        let entry = CatalogEntry::register(card, asset_id, &file_name, self.clock.now());
        if let Err(e) = self.catalog.append(&entry).await {
            warn!(
                "Catalog registration failed for {} (asset {} is now named {}): {}",
                card.card_id, asset_id, file_name, e
            );
            return Err(PipelineResult::failed(
                original,
                FailureStage::Registration,
                format!("Catalog registration failed: {}", e),
            )
            .with_card_id(&card.card_id)
            .with_asset_id(asset_id)
            .with_file_name(file_name));
        }

        info!("Registered {} as {}", card.card_id, file_name);
        Ok(PipelineResult::success(original, &card.card_id, file_name, asset_id))
    }

    /// Rename, falling back to `fallback` when the store refuses.
    async fn rename_or_keep(&self, asset_id: &str, target: &str, fallback: &str) -> String {
        if self.assets.rename(asset_id, target).await {
            debug!("Renamed asset {} to {}", asset_id, target);
            target.to_string()
        } else {
            warn!(
                "Rename of asset {} to {} failed, keeping {}",
                asset_id, target, fallback
            );
            fallback.to_string()
        }
    }

    async fn discard_if_configured(&self, failure: PipelineResult, asset_id: &str) -> PipelineResult {
        if !self.options.discard_unreadable {
            return failure.with_asset_id(asset_id);
        }

        match self.assets.delete(asset_id).await {
            Ok(()) => {
                info!("Discarded unreadable asset {}", asset_id);
                failure
            }
            Err(e) => {
                warn!("Failed to discard asset {}: {}", asset_id, e);
                failure.with_asset_id(asset_id)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExtractionFailure;
    use crate::stores::{MemoryAssetStore, MemoryCatalog};
    use crate::testing::{MockClock, MockExtractor};
    use crate::types::card::{CardType, Rarity};
    use crate::types::result::Status;

    fn card(id: &str) -> CardInfo {
        CardInfo::new(Rarity::SR, CardType::Costume, id).with_card_name("Stage Dress")
    }

    fn pipeline(
        extractor: MockExtractor,
    ) -> (
        CardIngestionPipeline<MockExtractor, MemoryAssetStore, MemoryCatalog>,
        Arc<MockClock>,
    ) {
        let clock = Arc::new(MockClock::new());
        let pipeline = CardIngestionPipeline::new(
            extractor,
            MemoryAssetStore::new(),
            MemoryCatalog::new(),
        )
        .with_clock(clock.clone());
        (pipeline, clock)
    }

    #[tokio::test]
    async fn test_new_card_is_registered_under_canonical_name() {
        let extractor = MockExtractor::new().with_card(b"front", card("IMT-01-069"));
        let (pipeline, _) = pipeline(extractor);

        let result = pipeline.ingest(&ImageUpload::new(b"front".to_vec(), "IMG_0001.jpg")).await;

        assert_eq!(result.status(), Status::Success);
        assert_eq!(result.card_id(), Some("IMT-01-069"));
        assert_eq!(result.registered_file_name(), Some("IMT-01-069.jpg"));
        assert_eq!(result.original_file_name.as_deref(), Some("IMG_0001.jpg"));

        let entries = pipeline.catalog().list_all().await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].card_id, "IMT-01-069");
        assert_eq!(entries[0].file_name, "IMT-01-069.jpg");
        assert_eq!(entries[0].card_name.as_deref(), Some("Stage Dress"));

        let asset_id = result.asset_id().unwrap();
        assert_eq!(entries[0].asset_id, asset_id);
        assert_eq!(
            pipeline.assets().name_of(asset_id).await.unwrap().as_deref(),
            Some("IMT-01-069.jpg")
        );
    }

    #[tokio::test]
    async fn test_duplicate_gets_timestamped_name_and_no_entry() {
        let extractor = MockExtractor::new()
            .with_card(b"first", card("IMT-01-069"))
            .with_card(b"second", card("IMT-01-069"))
            .with_card(b"third", card("IMT-01-069"));
        let (pipeline, clock) = pipeline(extractor);

        pipeline.ingest(&ImageUpload::new(b"first".to_vec(), "a.png")).await;
        clock.advance(std::time::Duration::from_millis(1500));
        let second = pipeline.ingest(&ImageUpload::new(b"second".to_vec(), "b.png")).await;
        clock.advance(std::time::Duration::from_millis(1500));
        let third = pipeline.ingest(&ImageUpload::new(b"third".to_vec(), "c.png")).await;

        assert_eq!(second.status(), Status::Duplicate);
        assert_eq!(third.status(), Status::Duplicate);

        let second_name = second.registered_file_name().unwrap();
        let third_name = third.registered_file_name().unwrap();
        assert!(second_name.starts_with("IMT-01-069_"));
        assert!(second_name.ends_with(".png"));
        assert_ne!(second_name, third_name);
        assert_eq!(
            second_name,
            naming::duplicate_file_name("IMT-01-069", ".png", clock.now() - chrono::Duration::milliseconds(1500))
        );

        assert_eq!(pipeline.catalog().count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_incomplete_extraction_changes_nothing() {
        let extractor =
            MockExtractor::new().with_incomplete(b"blurry", ["cardId", "rarity"]);
        let (pipeline, _) = pipeline(extractor);

        let result = pipeline.ingest(&ImageUpload::new(b"blurry".to_vec(), "blurry.jpg")).await;

        assert_eq!(result.status(), Status::Error);
        assert_eq!(result.failure_stage(), Some(FailureStage::Unreadable));
        assert!(result.message.contains("cardId"));
        assert!(pipeline.assets().rename_calls().is_empty());
        assert_eq!(pipeline.catalog().count().await.unwrap(), 0);

        let asset_id = result.asset_id().expect("asset kept for review");
        assert_eq!(
            pipeline.assets().name_of(asset_id).await.unwrap().as_deref(),
            Some("blurry.jpg")
        );
    }

    #[tokio::test]
    async fn test_typed_extraction_failure_is_surfaced() {
        let extractor = MockExtractor::new().with_failure(
            b"nsfw",
            ExtractionFailure::Blocked {
                reason: "SAFETY".into(),
            },
        );
        let (pipeline, _) = pipeline(extractor);

        let result = pipeline.ingest(&ImageUpload::new(b"nsfw".to_vec(), "x.jpg")).await;

        assert_eq!(result.failure_stage(), Some(FailureStage::Extraction));
        assert!(result.message.contains("blocked"));
        assert_eq!(pipeline.catalog().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_save_failure_stops_before_extraction() {
        let extractor = MockExtractor::new().with_card(b"img", card("IMT-01-001"));
        let (pipeline, _) = pipeline(extractor);
        pipeline.assets().fail_saves(true);

        let result = pipeline.ingest(&ImageUpload::new(b"img".to_vec(), "img.jpg")).await;

        assert_eq!(result.failure_stage(), Some(FailureStage::Storage));
        assert!(result.asset_id().is_none());
        assert!(pipeline.extractor().calls().is_empty());
    }

    #[tokio::test]
    async fn test_rename_failure_falls_back_to_original_name() {
        let extractor = MockExtractor::new().with_card(b"img", card("IMT-01-002"));
        let (pipeline, _) = pipeline(extractor);
        pipeline.assets().fail_renames(true);

        let result = pipeline.ingest(&ImageUpload::new(b"img".to_vec(), "IMG_7.jpg")).await;

        assert_eq!(result.status(), Status::Success);
        assert_eq!(result.registered_file_name(), Some("IMG_7.jpg"));

        let entry = pipeline.catalog().find_by_id("IMT-01-002").await.unwrap().unwrap();
        assert_eq!(entry.file_name, "IMG_7.jpg");
    }

    #[tokio::test]
    async fn test_duplicate_rename_failure_keeps_original_name() {
        let extractor = MockExtractor::new()
            .with_card(b"one", card("IMT-01-003"))
            .with_card(b"two", card("IMT-01-003"));
        let (pipeline, _) = pipeline(extractor);

        pipeline.ingest(&ImageUpload::new(b"one".to_vec(), "one.jpg")).await;
        pipeline.assets().fail_renames(true);
        let result = pipeline.ingest(&ImageUpload::new(b"two".to_vec(), "two.jpg")).await;

        assert_eq!(result.status(), Status::Duplicate);
        assert_eq!(result.registered_file_name(), Some("two.jpg"));
    }

    #[tokio::test]
    async fn test_append_failure_leaves_asset_renamed() {
        let extractor = MockExtractor::new().with_card(b"img", card("IMT-01-004"));
        let (pipeline, _) = pipeline(extractor);
        pipeline.catalog().fail_appends(true);

        let result = pipeline.ingest(&ImageUpload::new(b"img".to_vec(), "img.jpg")).await;

        assert_eq!(result.failure_stage(), Some(FailureStage::Registration));
        assert_eq!(result.card_id(), Some("IMT-01-004"));
        assert_eq!(result.registered_file_name(), Some("IMT-01-004.jpg"));

        let asset_id = result.asset_id().unwrap();
        assert_eq!(
            pipeline.assets().name_of(asset_id).await.unwrap().as_deref(),
            Some("IMT-01-004.jpg")
        );
    }

    #[tokio::test]
    async fn test_lookup_failure_is_per_item() {
        let extractor = MockExtractor::new().with_card(b"img", card("IMT-01-005"));
        let (pipeline, _) = pipeline(extractor);
        pipeline.catalog().fail_reads(true);

        let result = pipeline.ingest(&ImageUpload::new(b"img".to_vec(), "img.jpg")).await;

        assert_eq!(result.failure_stage(), Some(FailureStage::Lookup));
        assert!(pipeline.assets().rename_calls().is_empty());
    }

    #[tokio::test]
    async fn test_empty_upload_touches_nothing() {
        let (pipeline, _) = pipeline(MockExtractor::new());

        let result = pipeline.ingest(&ImageUpload::new(Vec::new(), "empty.jpg")).await;

        assert_eq!(result.failure_stage(), Some(FailureStage::Validation));
        assert_eq!(pipeline.assets().asset_count(), 0);
        assert!(pipeline.extractor().calls().is_empty());
    }

    #[tokio::test]
    async fn test_discard_unreadable_deletes_asset() {
        let extractor = MockExtractor::new().with_incomplete(b"blank", ["cardId"]);
        let (pipeline, _) = pipeline(extractor);
        let pipeline = pipeline.with_options(PipelineOptions::new().with_discard_unreadable(true));

        let result = pipeline.ingest(&ImageUpload::new(b"blank".to_vec(), "blank.jpg")).await;

        assert_eq!(result.failure_stage(), Some(FailureStage::Unreadable));
        assert!(result.asset_id().is_none());
        assert_eq!(pipeline.assets().asset_count(), 0);
    }

    #[tokio::test]
    async fn test_mime_type_follows_extension() {
        let extractor = MockExtractor::new().with_card(b"img", card("IMT-01-006"));
        let (pipeline, _) = pipeline(extractor);

        pipeline.ingest(&ImageUpload::new(b"img".to_vec(), "card.PNG")).await;

        let calls = pipeline.extractor().calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].mime_type, "image/png");
    }
}
