//! In-memory storage implementations for testing and development.
//!
//! Both stores carry failure switches so tests can exercise every
//! degraded path of the pipeline.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;
use tracing::warn;
use uuid::Uuid;

use crate::error::{CatalogError, CatalogResult, StorageError, StorageResult};
use crate::pipeline::naming;
use crate::traits::{asset_store::AssetStore, catalog::CatalogStore};
use crate::types::catalog::CatalogEntry;

struct StoredAsset {
    name: String,
    bytes: Vec<u8>,
}

/// In-memory photo storage.
///
/// Not suitable for production as data is lost on restart.
#[derive(Default)]
pub struct MemoryAssetStore {
    assets: RwLock<HashMap<String, StoredAsset>>,
    rename_calls: RwLock<Vec<(String, String)>>,
    fail_saves: AtomicBool,
    fail_renames: AtomicBool,
}

impl MemoryAssetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `save` fail.
    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent `rename` report failure.
    pub fn fail_renames(&self, fail: bool) {
        self.fail_renames.store(fail, Ordering::SeqCst);
    }

    /// Every `(asset_id, new_name)` passed to `rename`, including refused ones.
    pub fn rename_calls(&self) -> Vec<(String, String)> {
        self.rename_calls.read().unwrap().clone()
    }

    /// Get the number of stored assets.
    pub fn asset_count(&self) -> usize {
        self.assets.read().unwrap().len()
    }

    /// Bytes of an asset, if present.
    pub fn bytes_of(&self, asset_id: &str) -> Option<Vec<u8>> {
        self.assets
            .read()
            .unwrap()
            .get(asset_id)
            .map(|a| a.bytes.clone())
    }

    fn name_taken(assets: &HashMap<String, StoredAsset>, name: &str) -> bool {
        assets.values().any(|a| a.name == name)
    }
}

#[async_trait]
impl AssetStore for MemoryAssetStore {
    async fn save(&self, bytes: &[u8], name: &str) -> StorageResult<String> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(StorageError::save(name, "memory store is failing saves"));
        }

        let mut assets = self.assets.write().unwrap();
        let name = if Self::name_taken(&assets, name) {
            naming::disambiguated_file_name(name, Utc::now())
        } else {
            name.to_string()
        };

        let id = Uuid::new_v4().to_string();
        assets.insert(
            id.clone(),
            StoredAsset {
                name,
                bytes: bytes.to_vec(),
            },
        );
        Ok(id)
    }

    async fn rename(&self, asset_id: &str, new_name: &str) -> bool {
        self.rename_calls
            .write()
            .unwrap()
            .push((asset_id.to_string(), new_name.to_string()));

        if self.fail_renames.load(Ordering::SeqCst) {
            warn!("Refusing rename of {} (failure injected)", asset_id);
            return false;
        }

        match self.assets.write().unwrap().get_mut(asset_id) {
            Some(asset) => {
                asset.name = new_name.to_string();
                true
            }
            None => false,
        }
    }

    async fn delete(&self, asset_id: &str) -> StorageResult<()> {
        self.assets
            .write()
            .unwrap()
            .remove(asset_id)
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound {
                asset_id: asset_id.to_string(),
            })
    }

    async fn name_of(&self, asset_id: &str) -> StorageResult<Option<String>> {
        Ok(self
            .assets
            .read()
            .unwrap()
            .get(asset_id)
            .map(|a| a.name.clone()))
    }
}

/// In-memory catalog, kept in append order.
#[derive(Default)]
pub struct MemoryCatalog {
    entries: RwLock<Vec<CatalogEntry>>,
    fail_appends: AtomicBool,
    fail_reads: AtomicBool,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the catalog with existing entries.
    pub fn with_entries(entries: impl IntoIterator<Item = CatalogEntry>) -> Self {
        let catalog = Self::new();
        catalog.entries.write().unwrap().extend(entries);
        catalog
    }

    /// Make every subsequent `append` fail.
    pub fn fail_appends(&self, fail: bool) {
        self.fail_appends.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent lookup and listing fail.
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    fn check_reads(&self) -> CatalogResult<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(CatalogError::Read("memory catalog is failing reads".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl CatalogStore for MemoryCatalog {
    async fn find_by_id(&self, card_id: &str) -> CatalogResult<Option<CatalogEntry>> {
        self.check_reads()?;
        Ok(self
            .entries
            .read()
            .unwrap()
            .iter()
            .find(|e| e.card_id == card_id)
            .cloned())
    }

    async fn append(&self, entry: &CatalogEntry) -> CatalogResult<()> {
        if self.fail_appends.load(Ordering::SeqCst) {
            return Err(CatalogError::Write("memory catalog is failing appends".into()));
        }
        self.entries.write().unwrap().push(entry.clone());
        Ok(())
    }

    async fn list_all(&self) -> CatalogResult<Vec<CatalogEntry>> {
        self.check_reads()?;
        Ok(self.entries.read().unwrap().clone())
    }

    async fn count(&self) -> CatalogResult<usize> {
        self.check_reads()?;
        Ok(self.entries.read().unwrap().len())
    }
}
