//! Core trait abstractions for card ingestion.
//!
//! The pipeline only talks to its collaborators through these traits, so
//! storage, ledger and extraction backends are swappable.

pub mod asset_store;
pub mod catalog;
pub mod clock;
pub mod extractor;
