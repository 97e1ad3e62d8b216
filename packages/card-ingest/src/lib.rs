//! Trading card photo ingestion.
//!
//! Takes photos of physical trading cards, asks a multimodal extraction
//! service for the card's metadata, renames the stored photo after the
//! card's printed id and records new cards in an append-only catalog.
//!
//! # Pipeline
//!
//! ```text
//! upload → store → extract → lookup ─┬─ new       → rename {id}{ext}        → append → Success
//!                                    └─ duplicate → rename {id}_{stamp}{ext}          → Duplicate
//! ```
//!
//! Every failure along the way becomes a per-image [`PipelineResult`];
//! a batch never aborts because one image failed.
//!
//! # Usage
//!
//! ```rust,ignore
//! use card_ingest::{BatchOrchestrator, CardIngestionPipeline, ImageUpload};
//! use card_ingest::stores::{MemoryAssetStore, MemoryCatalog};
//! use card_ingest::testing::MockExtractor;
//!
//! let pipeline = CardIngestionPipeline::new(
//!     MockExtractor::new(),
//!     MemoryAssetStore::new(),
//!     MemoryCatalog::new(),
//! );
//! let batch = BatchOrchestrator::new(pipeline);
//!
//! let results = batch
//!     .run_batch(&[ImageUpload::new(bytes, "IMG_0001.jpg")])
//!     .await;
//! ```
//!
//! # Modules
//!
//! - [`traits`] - Collaborator abstractions (CardExtractor, AssetStore, CatalogStore, Clock)
//! - [`types`] - Card metadata, catalog entries, results
//! - [`pipeline`] - Naming policy, single-image pipeline, batch orchestration
//! - [`stores`] - Asset store and catalog implementations
//! - [`ai`] - Extraction service clients (feature `gemini`)
//! - [`security`] - Credential handling
//! - [`testing`] - Mock implementations for testing

pub mod ai;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod security;
pub mod stores;
pub mod testing;
pub mod traits;
pub mod types;

pub use config::Config;
pub use error::{CatalogError, ConfigError, ExtractionFailure, IngestError, StorageError};
pub use traits::{
    asset_store::AssetStore,
    catalog::CatalogStore,
    clock::{Clock, SystemClock},
    extractor::{CardExtractor, Extracted},
};
pub use types::{
    card::{CardInfo, CardType, Rarity},
    catalog::{CatalogEntry, CatalogListing, ERROR_PLACEHOLDER_URL},
    config::{BatchConfig, PipelineOptions},
    result::{BatchSummary, FailureStage, Outcome, PipelineResult, Status},
    upload::ImageUpload,
};

pub use pipeline::{list_catalog, BatchOrchestrator, CardIngestionPipeline, Throttle};

pub use stores::{FsAssetStore, MemoryAssetStore, MemoryCatalog};

#[cfg(feature = "sqlite")]
pub use stores::SqliteCatalog;

#[cfg(feature = "gemini")]
pub use ai::GeminiExtractor;

pub use security::{ExtractorCredentials, SecretString};
