//! Catalog listing for display sinks.

use tracing::info;

use crate::error::CatalogResult;
use crate::traits::catalog::CatalogStore;
use crate::types::catalog::CatalogListing;

/// Every registered card in storage order, with the count and the shared
/// error-image reference.
///
/// Read failures propagate to the caller.
pub async fn list_catalog<C: CatalogStore + ?Sized>(catalog: &C) -> CatalogResult<CatalogListing> {
    let entries = catalog.list_all().await?;
    info!("Listed {} catalog entries", entries.len());
    Ok(CatalogListing::new(entries))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stores::MemoryCatalog;
    use crate::types::card::{CardInfo, CardType, Rarity};
    use crate::types::catalog::{CatalogEntry, ERROR_PLACEHOLDER_URL};
    use chrono::Utc;

    #[tokio::test]
    async fn test_listing_is_stable_and_unsorted() {
        let catalog = MemoryCatalog::new();
        for (id, rarity) in [("IMT-09-003", Rarity::SSR), ("IMT-01-001", Rarity::N)] {
            let card = CardInfo::new(rarity, CardType::Accessory, id);
            let entry = CatalogEntry::register(&card, format!("asset-{}", id), format!("{}.jpg", id), Utc::now());
            catalog.append(&entry).await.unwrap();
        }

        let first = list_catalog(&catalog).await.unwrap();
        let second = list_catalog(&catalog).await.unwrap();

        assert_eq!(first.count, 2);
        assert_eq!(first.entries, second.entries);
        assert_eq!(first.entries[0].card_id, "IMT-09-003");
        assert_eq!(first.error_placeholder_url, ERROR_PLACEHOLDER_URL);
    }

    #[tokio::test]
    async fn test_read_failure_propagates() {
        let catalog = MemoryCatalog::new();
        catalog.fail_reads(true);

        assert!(list_catalog(&catalog).await.is_err());
    }
}
