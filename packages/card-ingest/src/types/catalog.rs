//! Catalog (ledger) entries and the listing view.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::card::{CardInfo, CardType, Rarity};

/// Image shown by display sinks when a card thumbnail cannot be loaded.
pub const ERROR_PLACEHOLDER_URL: &str =
    "https://via.placeholder.com/300x420/f8d7da/721c24?text=Load%20Error";

/// One registered card. Created once per unique `card_id`, never updated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    pub card_id: String,
    pub rarity: Rarity,
    pub card_type: CardType,
    pub card_name: Option<String>,
    pub character_name: Option<String>,
    /// Identity of the stored photo, independent of its display name
    pub asset_id: String,
    /// Display name of the photo at registration time
    pub file_name: String,
    pub registered_at: DateTime<Utc>,
}

impl CatalogEntry {
    /// Build an entry for freshly extracted metadata.
    pub fn register(
        card: &CardInfo,
        asset_id: impl Into<String>,
        file_name: impl Into<String>,
        registered_at: DateTime<Utc>,
    ) -> Self {
        Self {
            card_id: card.card_id.clone(),
            rarity: card.rarity,
            card_type: card.card_type,
            card_name: card.card_name.clone(),
            character_name: card.character_name.clone(),
            asset_id: asset_id.into(),
            file_name: file_name.into(),
            registered_at,
        }
    }
}

/// Catalog contents as handed to display sinks.
///
/// Entries are in storage order (oldest first); sorting and thumbnail
/// augmentation belong to the consumer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogListing {
    pub entries: Vec<CatalogEntry>,
    pub count: usize,
    pub error_placeholder_url: &'static str,
}

impl CatalogListing {
    pub fn new(entries: Vec<CatalogEntry>) -> Self {
        Self {
            count: entries.len(),
            entries,
            error_placeholder_url: ERROR_PLACEHOLDER_URL,
        }
    }
}
