//! Card metadata extraction trait.
//!
//! Abstracts the multimodal service that reads a card photo and returns
//! its rarity, type, id, name and character.

use async_trait::async_trait;

use crate::error::ExtractionFailure;
use crate::types::card::CardInfo;

/// What a successful call to the extraction service produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extracted {
    /// All mandatory fields were present.
    Card(CardInfo),

    /// The service answered, but without usable metadata.
    ///
    /// `missing` names the mandatory fields that were absent or empty.
    Incomplete { missing: Vec<String> },
}

impl Extracted {
    pub fn incomplete(missing: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self::Incomplete {
            missing: missing.into_iter().map(Into::into).collect(),
        }
    }

    pub fn into_card(self) -> Option<CardInfo> {
        match self {
            Self::Card(card) => Some(card),
            Self::Incomplete { .. } => None,
        }
    }
}

/// Extraction service client.
///
/// Implementations make exactly one attempt per call; retry policy, if
/// any, belongs to the caller.
#[async_trait]
pub trait CardExtractor: Send + Sync {
    /// Read card metadata from image bytes of the given MIME type.
    async fn extract(
        &self,
        image: &[u8],
        mime_type: &str,
    ) -> std::result::Result<Extracted, ExtractionFailure>;
}
