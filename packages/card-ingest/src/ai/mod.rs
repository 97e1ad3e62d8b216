//! Extraction service clients.
//!
//! This module provides reference implementations of the `CardExtractor`
//! trait. Users can use these directly or implement their own.

#[cfg(feature = "gemini")]
mod gemini;

#[cfg(feature = "gemini")]
pub use gemini::{interpret_response, parse_card_fields, request_body, GeminiExtractor};
