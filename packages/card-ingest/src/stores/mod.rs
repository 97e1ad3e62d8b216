//! Storage implementations for the ingestion library.
//!
//! Available backends:
//! - `MemoryAssetStore` / `MemoryCatalog` - In-memory storage (always available)
//! - `FsAssetStore` - Photos in a local folder (always available)
//! - `SqliteCatalog` - SQLite ledger (requires `sqlite` feature)

pub mod fs;
pub mod memory;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use fs::FsAssetStore;
pub use memory::{MemoryAssetStore, MemoryCatalog};

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteCatalog;
