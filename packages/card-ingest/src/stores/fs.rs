//! Local folder asset store.
//!
//! Each photo is a file named by its display name. Identity lives in a
//! JSON manifest (`.assets.json`) mapping asset id to current file name,
//! so a rename never changes the id.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{StorageError, StorageResult};
use crate::pipeline::naming;
use crate::traits::asset_store::AssetStore;

const MANIFEST_FILE: &str = ".assets.json";

type Manifest = BTreeMap<String, String>;

/// Asset store backed by a directory.
pub struct FsAssetStore {
    root: PathBuf,
    /// Serializes manifest read-modify-write cycles.
    lock: Mutex<()>,
}

impl FsAssetStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    pub async fn new(root: impl Into<PathBuf>) -> StorageResult<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        Ok(Self {
            root,
            lock: Mutex::new(()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of an asset's file, if the asset exists.
    pub async fn path_of(&self, asset_id: &str) -> StorageResult<Option<PathBuf>> {
        let manifest = self.load_manifest().await?;
        Ok(manifest.get(asset_id).map(|name| self.root.join(name)))
    }

    fn is_valid_name(name: &str) -> bool {
        !name.trim().is_empty()
            && name != "."
            && !name.starts_with(MANIFEST_FILE)
            && !name.contains("..")
            && !name.contains('/')
            && !name.contains('\\')
    }

    async fn load_manifest(&self) -> StorageResult<Manifest> {
        match tokio::fs::read(self.root.join(MANIFEST_FILE)).await {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| StorageError::Io(io::Error::new(io::ErrorKind::InvalidData, e))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Manifest::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_manifest(&self, manifest: &Manifest) -> StorageResult<()> {
        let json = serde_json::to_vec_pretty(manifest)
            .map_err(|e| StorageError::Io(io::Error::new(io::ErrorKind::InvalidData, e)))?;
        let tmp = self.root.join(format!("{}.tmp", MANIFEST_FILE));
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, self.root.join(MANIFEST_FILE)).await?;
        Ok(())
    }

    async fn try_rename(&self, asset_id: &str, new_name: &str) -> StorageResult<bool> {
        let _guard = self.lock.lock().await;
        let mut manifest = self.load_manifest().await?;

        let Some(current) = manifest.get(asset_id).cloned() else {
            warn!("Rename of unknown asset {}", asset_id);
            return Ok(false);
        };
        if current == new_name {
            return Ok(true);
        }

        let target = self.root.join(new_name);
        if tokio::fs::try_exists(&target).await? {
            warn!("Rename target {} already exists", new_name);
            return Ok(false);
        }

        let source = self.root.join(&current);
        tokio::fs::rename(&source, &target).await?;
        manifest.insert(asset_id.to_string(), new_name.to_string());
        if let Err(e) = self.write_manifest(&manifest).await {
            if let Err(undo) = tokio::fs::rename(&target, &source).await {
                warn!(
                    "Could not move {} back to {} after manifest failure: {}",
                    new_name, current, undo
                );
            }
            return Err(e);
        }
        Ok(true)
    }

    /// Write `bytes` under `name`, or under the first free disambiguated
    /// name. Files are created exclusively, so an existing file is never
    /// overwritten.
    async fn create_unique(
        &self,
        bytes: &[u8],
        name: &str,
        at: DateTime<Utc>,
    ) -> StorageResult<String> {
        let stamped = naming::disambiguated_file_name(name, at);
        let mut attempt = 0u32;
        loop {
            let candidate = match attempt {
                0 => name.to_string(),
                1 => stamped.clone(),
                n => naming::numbered_file_name(&stamped, n - 1),
            };
            attempt += 1;

            let path = self.root.join(&candidate);
            let mut file = match tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => file,
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    debug!("{} exists, trying next name", candidate);
                    continue;
                }
                Err(e) => return Err(StorageError::save(&candidate, e)),
            };

            let written = match file.write_all(bytes).await {
                Ok(()) => file.flush().await,
                Err(e) => Err(e),
            };
            if let Err(e) = written {
                let _ = tokio::fs::remove_file(&path).await;
                return Err(StorageError::save(&candidate, e));
            }
            return Ok(candidate);
        }
    }

    async fn save_at(&self, bytes: &[u8], name: &str, at: DateTime<Utc>) -> StorageResult<String> {
        if !Self::is_valid_name(name) {
            return Err(StorageError::InvalidName {
                name: name.to_string(),
            });
        }

        let _guard = self.lock.lock().await;
        let mut manifest = self.load_manifest().await?;

        let file_name = self.create_unique(bytes, name, at).await?;
        if file_name != name {
            debug!("{} exists, saved as {}", name, file_name);
        }

        let id = Uuid::new_v4().to_string();
        manifest.insert(id.clone(), file_name.clone());
        if let Err(e) = self.write_manifest(&manifest).await {
            let _ = tokio::fs::remove_file(self.root.join(&file_name)).await;
            return Err(e);
        }
        Ok(id)
    }
}

#[async_trait]
impl AssetStore for FsAssetStore {
    async fn save(&self, bytes: &[u8], name: &str) -> StorageResult<String> {
        self.save_at(bytes, name, Utc::now()).await
    }

    async fn rename(&self, asset_id: &str, new_name: &str) -> bool {
        if !Self::is_valid_name(new_name) {
            warn!("Refusing rename of {} to invalid name {:?}", asset_id, new_name);
            return false;
        }

        match self.try_rename(asset_id, new_name).await {
            Ok(renamed) => renamed,
            Err(e) => {
                warn!("Rename of {} to {} failed: {}", asset_id, new_name, e);
                false
            }
        }
    }

    async fn delete(&self, asset_id: &str) -> StorageResult<()> {
        let _guard = self.lock.lock().await;
        let mut manifest = self.load_manifest().await?;

        let name = manifest
            .remove(asset_id)
            .ok_or_else(|| StorageError::NotFound {
                asset_id: asset_id.to_string(),
            })?;

        match tokio::fs::remove_file(self.root.join(&name)).await {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!("File for asset {} was already gone", asset_id);
            }
            Err(e) => return Err(e.into()),
        }

        self.write_manifest(&manifest).await
    }

    async fn name_of(&self, asset_id: &str) -> StorageResult<Option<String>> {
        Ok(self.load_manifest().await?.get(asset_id).cloned())
    }
}
