//! Catalog (ledger) of registered cards.

use async_trait::async_trait;

use crate::error::CatalogResult;
use crate::types::catalog::CatalogEntry;

/// Append-only ledger keyed by card id.
///
/// The ledger itself does not enforce uniqueness; the pipeline checks
/// before appending and is the only writer.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// First entry whose id equals `card_id` exactly.
    async fn find_by_id(&self, card_id: &str) -> CatalogResult<Option<CatalogEntry>>;

    /// Append a new entry. Failure is an error, never silent.
    async fn append(&self, entry: &CatalogEntry) -> CatalogResult<()>;

    /// All entries in storage order, oldest first. No sorting, no dedup.
    async fn list_all(&self) -> CatalogResult<Vec<CatalogEntry>>;

    /// Number of entries.
    async fn count(&self) -> CatalogResult<usize> {
        Ok(self.list_all().await?.len())
    }
}
