//! Data types for card ingestion.

pub mod card;
pub mod catalog;
pub mod config;
pub mod result;
pub mod upload;
