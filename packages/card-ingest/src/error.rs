//! Typed errors for the card ingestion library.
//!
//! Uses `thiserror` for library errors (not `anyhow`) so callers can tell
//! a blocked image from an exhausted quota, or a lost registration from a
//! failed rename.

use thiserror::Error;

/// Errors that may escape to the top of the process.
///
/// Per-image problems never show up here: the pipeline converts them into a
/// [`PipelineResult`](crate::types::result::PipelineResult).
#[derive(Debug, Error)]
pub enum IngestError {
    /// A required setting is missing or unusable
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The catalog could not be read
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Extraction client could not be constructed
    #[error("extraction client error: {0}")]
    Extraction(#[from] ExtractionFailure),
}

/// Configuration errors, raised once at start before any pipeline work.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Required key absent or empty
    #[error("{key} must be set")]
    Missing { key: String },

    /// Key present but its value is unusable
    #[error("{key} is invalid: {reason}")]
    Invalid { key: String, reason: String },
}

impl ConfigError {
    pub fn missing(key: impl Into<String>) -> Self {
        Self::Missing { key: key.into() }
    }

    pub fn invalid(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key: key.into(),
            reason: reason.into(),
        }
    }
}

/// Asset store failures.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Saving image bytes failed
    #[error("failed to save {name}: {source}")]
    Save {
        name: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Name cannot be used as a display name in this store
    #[error("invalid asset name: {name:?}")]
    InvalidName { name: String },

    /// No asset with this identifier
    #[error("asset not found: {asset_id}")]
    NotFound { asset_id: String },

    /// Underlying filesystem error
    #[error("asset store I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StorageError {
    pub fn save(
        name: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Save {
            name: name.into(),
            source: source.into(),
        }
    }
}

/// Catalog (ledger) failures.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Lookup or listing failed
    #[error("catalog read failed: {0}")]
    Read(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Appending a row failed
    #[error("catalog write failed: {0}")]
    Write(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// A stored row could not be decoded
    #[error("corrupt catalog row for {card_id}: {reason}")]
    Corrupt { card_id: String, reason: String },
}

/// Typed failures of the extraction service.
///
/// Distinguished because callers must not treat "blocked" like "try again".
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractionFailure {
    /// No API key configured
    #[error("extraction API key is not configured")]
    MissingCredentials,

    /// The service rejected the API key
    #[error("extraction API key was rejected")]
    InvalidCredentials,

    /// Content blocked by safety filtering
    #[error("request blocked by content filter ({reason})")]
    Blocked { reason: String },

    /// Usage quota exhausted
    #[error("extraction quota exceeded, try again later")]
    QuotaExceeded,

    /// The service refused the request as malformed
    #[error("extraction request rejected (400): {detail}")]
    BadRequest { detail: String },

    /// Server-side failure or unexpected status
    #[error("extraction service error ({status}): {detail}")]
    Server { status: u16, detail: String },

    /// Network failure or timeout
    #[error("extraction transport error: {0}")]
    Transport(String),

    /// Response envelope did not have the expected shape
    #[error("malformed extraction response: {0}")]
    Malformed(String),
}

impl ExtractionFailure {
    /// Whether the same request might succeed later.
    ///
    /// Informational only: the pipeline makes a single attempt per image.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::QuotaExceeded | Self::Server { .. } | Self::Transport(_)
        )
    }
}

/// Result type alias for asset store operations.
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Result type alias for catalog operations.
pub type CatalogResult<T> = std::result::Result<T, CatalogError>;
