//! SQLite catalog implementation.
//!
//! A file-based ledger of registered cards. Good for:
//! - Local collections
//! - Single-process deployments
//! - Testing with persistent data
//!
//! `card_id` is deliberately not unique: the pipeline checks before it
//! appends, and the ledger keeps whatever it is given.

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::FromRow;
use std::str::FromStr;

use crate::error::{CatalogError, CatalogResult};
use crate::traits::catalog::CatalogStore;
use crate::types::{
    card::{CardType, Rarity},
    catalog::CatalogEntry,
};

const SELECT_COLUMNS: &str = "SELECT card_id, rarity, card_type, card_name, character_name, \
    asset_id, file_name, registered_at FROM cards";

/// SQLite-based card catalog.
pub struct SqliteCatalog {
    pool: SqlitePool,
}

impl SqliteCatalog {
    /// Open (creating if needed) the catalog at the given connection URL.
    ///
    /// # Example URLs
    /// - `sqlite://./catalog.db` - File-based database
    /// - `sqlite::memory:` - In-memory database (ephemeral, see [`in_memory`](Self::in_memory))
    pub async fn new(database_url: &str) -> CatalogResult<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| CatalogError::Read(e.into()))?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| CatalogError::Read(e.into()))?;

        Self::with_pool(pool).await
    }

    /// Create an in-memory catalog (for testing).
    ///
    /// Uses a single connection that never expires, since every new
    /// in-memory connection would see an empty database.
    pub async fn in_memory() -> CatalogResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| CatalogError::Read(e.into()))?;

        Self::with_pool(pool).await
    }

    /// Use an existing pool, creating the table if needed.
    pub async fn with_pool(pool: SqlitePool) -> CatalogResult<Self> {
        let catalog = Self { pool };
        catalog.run_migrations().await?;
        Ok(catalog)
    }

    async fn run_migrations(&self) -> CatalogResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS cards (
                card_id TEXT NOT NULL,
                rarity TEXT NOT NULL,
                card_type TEXT NOT NULL,
                card_name TEXT,
                character_name TEXT,
                asset_id TEXT NOT NULL,
                file_name TEXT NOT NULL,
                registered_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_cards_card_id ON cards(card_id);
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| CatalogError::Write(e.into()))?;

        Ok(())
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[derive(Debug, FromRow)]
struct CardRow {
    card_id: String,
    rarity: String,
    card_type: String,
    card_name: Option<String>,
    character_name: Option<String>,
    asset_id: String,
    file_name: String,
    registered_at: String,
}

impl CardRow {
    fn into_entry(self) -> CatalogResult<CatalogEntry> {
        let corrupt = |reason: String| CatalogError::Corrupt {
            card_id: self.card_id.clone(),
            reason,
        };

        let rarity = Rarity::from_str(&self.rarity).map_err(|e| corrupt(e.to_string()))?;
        let card_type = CardType::from_str(&self.card_type).map_err(|e| corrupt(e.to_string()))?;
        let registered_at = chrono::DateTime::parse_from_rfc3339(&self.registered_at)
            .map_err(|e| corrupt(format!("invalid date: {}", e)))?
            .with_timezone(&chrono::Utc);

        Ok(CatalogEntry {
            card_id: self.card_id,
            rarity,
            card_type,
            card_name: self.card_name,
            character_name: self.character_name,
            asset_id: self.asset_id,
            file_name: self.file_name,
            registered_at,
        })
    }
}

#[async_trait]
impl CatalogStore for SqliteCatalog {
    async fn find_by_id(&self, card_id: &str) -> CatalogResult<Option<CatalogEntry>> {
        let row = sqlx::query_as::<_, CardRow>(&format!(
            "{} WHERE card_id = ? ORDER BY rowid LIMIT 1",
            SELECT_COLUMNS
        ))
        .bind(card_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| CatalogError::Read(e.into()))?;

        row.map(CardRow::into_entry).transpose()
    }

    async fn append(&self, entry: &CatalogEntry) -> CatalogResult<()> {
        sqlx::query(
            r#"
            INSERT INTO cards (card_id, rarity, card_type, card_name, character_name, asset_id, file_name, registered_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&entry.card_id)
        .bind(entry.rarity.as_str())
        .bind(entry.card_type.as_str())
        .bind(&entry.card_name)
        .bind(&entry.character_name)
        .bind(&entry.asset_id)
        .bind(&entry.file_name)
        .bind(entry.registered_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| CatalogError::Write(e.into()))?;

        Ok(())
    }

    async fn list_all(&self) -> CatalogResult<Vec<CatalogEntry>> {
        let rows = sqlx::query_as::<_, CardRow>(&format!("{} ORDER BY rowid", SELECT_COLUMNS))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| CatalogError::Read(e.into()))?;

        rows.into_iter().map(CardRow::into_entry).collect()
    }

    async fn count(&self) -> CatalogResult<usize> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM cards")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| CatalogError::Read(e.into()))?;

        Ok(count as usize)
    }
}
