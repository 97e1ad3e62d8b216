//! Ingestion pipeline - the core of the library.
//!
//! - Naming policy for stored photos
//! - Single-image state machine (store → extract → name → dedup → register)
//! - Sequential, throttled batch orchestration
//! - Catalog listing

pub mod batch;
pub mod ingest;
pub mod listing;
pub mod naming;
pub mod prompts;

pub use batch::{BatchOrchestrator, Throttle};
pub use ingest::CardIngestionPipeline;
pub use listing::list_catalog;
pub use prompts::{extraction_schema, EXTRACTION_INSTRUCTION, EXTRACTION_PROMPT, REQUIRED_FIELDS};
