//! Blob storage for card photos.

use async_trait::async_trait;

use crate::error::StorageResult;

/// Persists photo bytes under a display name.
///
/// Assets are addressed by an opaque id returned from [`save`](Self::save);
/// renaming changes the display name only, never the id.
#[async_trait]
pub trait AssetStore: Send + Sync {
    /// Store bytes under `name` and return the new asset id.
    ///
    /// If an asset with the same name already exists, the new one is saved
    /// under the name with a millisecond timestamp appended to the base
    /// name instead of overwriting.
    async fn save(&self, bytes: &[u8], name: &str) -> StorageResult<String>;

    /// Change the display name of an asset.
    ///
    /// Never fails loudly: any underlying error is logged and reported as
    /// `false` so callers can keep the previous name.
    async fn rename(&self, asset_id: &str, new_name: &str) -> bool;

    /// Remove an asset.
    async fn delete(&self, asset_id: &str) -> StorageResult<()>;

    /// Current display name of an asset.
    async fn name_of(&self, asset_id: &str) -> StorageResult<Option<String>>;
}
