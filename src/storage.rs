//! Key-value cache store for the last known-good alert batch.
//!
//! The store is a plain byte map. [`load_batch`] and [`store_batch`] layer the
//! single-slot alert cache on top of it: one fixed key, no TTL, JSON values.
//!
//! Two implementations are provided: [`Storage`] on SQLite and
//! [`MemoryStore`] for tests and ephemeral runs.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use tokio::sync::RwLock;
use tracing::warn;

use crate::error::CacheError;
use crate::model::AlertBatch;

/// Key under which the last successfully fetched batch is kept.
pub const LAST_VALID_ALERTS_KEY: &str = "last_valid_generated_alerts";

/// A byte-valued key-value store.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    async fn set(&self, key: &str, value: &[u8]) -> Result<(), CacheError>;
}

/// Read the cached batch.
///
/// Read and decode failures are logged and reported as a miss: a broken cache
/// must never turn a recoverable fetch failure into an error.
pub async fn load_batch(store: &dyn KeyValueStore) -> Option<AlertBatch> {
    let bytes = match store.get(LAST_VALID_ALERTS_KEY).await {
        Ok(Some(bytes)) => bytes,
        Ok(None) => return None,
        Err(e) => {
            warn!(error = %e, "Failed to read alert cache");
            return None;
        }
    };

    match serde_json::from_slice(&bytes) {
        Ok(batch) => Some(batch),
        Err(e) => {
            warn!(error = %e, "Discarding undecodable alert cache entry");
            None
        }
    }
}

/// Replace the cached batch.
pub async fn store_batch(store: &dyn KeyValueStore, batch: &AlertBatch) -> Result<(), CacheError> {
    let bytes = serde_json::to_vec(batch)?;
    store.set(LAST_VALID_ALERTS_KEY, &bytes).await
}

/// SQLite-backed store.
#[derive(Clone)]
pub struct Storage {
    pool: SqlitePool,
}

impl Storage {
    /// Create a new storage instance and initialize the schema.
    ///
    /// # Arguments
    ///
    /// * `database_url` - SQLite connection string (e.g., "sqlite:cropwatch.db" or "sqlite::memory:")
    pub async fn new(database_url: &str) -> Result<Self, CacheError> {
        // Every connection to an in-memory database is a separate database.
        let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        let storage = Self { pool };
        storage.initialize_schema().await?;

        Ok(storage)
    }

    async fn initialize_schema(&self) -> Result<(), CacheError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS kv_cache (
                key TEXT PRIMARY KEY,
                value BLOB NOT NULL,
                updated_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for Storage {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let row = sqlx::query(
            r#"
            SELECT value FROM kv_cache WHERE key = ?
            "#,
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.get("value")))
    }

    async fn set(&self, key: &str, value: &[u8]) -> Result<(), CacheError> {
        sqlx::query(
            r#"
            INSERT INTO kv_cache (key, value, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now().timestamp())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

/// Process-local store. Contents are lost on exit.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &[u8]) -> Result<(), CacheError> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Alert, AlertId, AlertStatus, FarmContext, Severity};

    fn sample_batch() -> AlertBatch {
        AlertBatch::new(
            FarmContext {
                city: "Nashik".to_string(),
                state: "Maharashtra".to_string(),
                crop_name: "Basil".to_string(),
                farm_type: "Aeroponics".to_string(),
            },
            vec![Alert {
                id: AlertId::new("a3"),
                severity: Severity::Warning,
                component: "Misting Nozzle 7".to_string(),
                message: "Nozzle clog suspected".to_string(),
                timestamp: "12m ago".to_string(),
                status: AlertStatus::Active,
            }],
        )
    }

    #[tokio::test]
    async fn test_sqlite_set_and_get() {
        let storage = Storage::new("sqlite::memory:").await.unwrap();

        assert!(storage.get("missing").await.unwrap().is_none());

        storage.set("k", b"first").await.unwrap();
        storage.set("k", b"second").await.unwrap();

        assert_eq!(storage.get("k").await.unwrap(), Some(b"second".to_vec()));
    }

    #[tokio::test]
    async fn test_batch_round_trip_through_sqlite() {
        let storage = Storage::new("sqlite::memory:").await.unwrap();
        let batch = sample_batch();

        assert!(load_batch(&storage).await.is_none());

        store_batch(&storage, &batch).await.unwrap();

        assert_eq!(load_batch(&storage).await, Some(batch));
    }

    #[tokio::test]
    async fn test_store_keeps_only_the_latest_batch() {
        let store = MemoryStore::new();
        let first = sample_batch();
        let mut second = sample_batch();
        second.alerts.clear();

        store_batch(&store, &first).await.unwrap();
        store_batch(&store, &second).await.unwrap();

        let loaded = load_batch(&store).await.unwrap();
        assert!(loaded.alerts.is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_entry_is_a_miss() {
        let store = MemoryStore::new();
        store
            .set(LAST_VALID_ALERTS_KEY, b"{not json")
            .await
            .unwrap();

        assert!(load_batch(&store).await.is_none());
    }
}
