//! Durable key-value cache with per-entry expiry.
//!
//! Entries are persisted under `cache_<key>` and lazily evicted: an expired
//! entry is deleted on the read that finds it. There is no background
//! sweep. A miss or an expired entry is a normal empty state, never an
//! error.

use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::storage::{Storage, StorageError};

/// Errors writing to the cache. Reads never fail.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Underlying storage failed.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Value could not be serialized.
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Persisted envelope around a cached value.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    /// The cached value.
    pub data: serde_json::Value,
    /// When the entry was written.
    pub stored_at: DateTime<Utc>,
    /// When the entry stops being valid; `None` means it never expires.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl CacheEntry {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

/// Typed cache over opaque durable storage.
#[derive(Debug)]
pub struct CacheStore<S> {
    storage: S,
}

impl<S: Storage> CacheStore<S> {
    /// Create a cache over the given storage.
    #[must_use]
    pub const fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Write a value, optionally expiring after `expiry_minutes`.
    ///
    /// An expiry of zero minutes produces an entry that is already expired
    /// on the next read.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the storage write fails.
    pub async fn set<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        expiry_minutes: Option<i64>,
    ) -> Result<(), CacheError> {
        let stored_at = Utc::now();
        let entry = CacheEntry {
            data: serde_json::to_value(value)?,
            stored_at,
            expires_at: expiry_minutes.map(|minutes| stored_at + Duration::minutes(minutes)),
        };

        let json = serde_json::to_string(&entry)?;
        self.storage.set(&storage_key(key), &json).await?;
        Ok(())
    }

    /// Read a value. Returns `None` on a miss, on expiry (deleting the
    /// stale entry), or when the stored payload fails to decode.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let storage_key = storage_key(key);
        let raw = match self.storage.get(&storage_key).await {
            Ok(raw) => raw?,
            Err(e) => {
                warn!(error = %e, key, "Cache read failed");
                return None;
            }
        };

        let entry: CacheEntry = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, key, "Discarding undecodable cache entry");
                let _ = self.storage.remove(&storage_key).await;
                return None;
            }
        };

        if entry.is_expired(Utc::now()) {
            debug!(key, "Cache entry expired, evicting");
            let _ = self.storage.remove(&storage_key).await;
            return None;
        }

        match serde_json::from_value(entry.data) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(error = %e, key, "Cached value has wrong shape");
                None
            }
        }
    }

    /// Delete an entry. Deleting a missing entry is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage delete fails.
    pub async fn remove(&self, key: &str) -> Result<(), CacheError> {
        self.storage.remove(&storage_key(key)).await?;
        Ok(())
    }
}

fn storage_key(key: &str) -> String {
    format!("cache_{key}")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    #[tokio::test]
    async fn test_roundtrip_without_expiry() {
        let cache = CacheStore::new(MemoryStorage::new());

        cache.set("feed", &vec![1, 2, 3], None).await.unwrap();
        let value: Option<Vec<i32>> = cache.get("feed").await;
        assert_eq!(value, Some(vec![1, 2, 3]));
    }

    #[tokio::test]
    async fn test_zero_minute_expiry_evicts_on_next_read() {
        let storage = std::sync::Arc::new(MemoryStorage::new());
        let cache = CacheStore::new(std::sync::Arc::clone(&storage));

        cache.set("feed", &"stale", Some(0)).await.unwrap();

        let value: Option<String> = cache.get("feed").await;
        assert_eq!(value, None);

        // The entry was deleted, not just filtered: a raw read misses too.
        assert!(storage.get("cache_feed").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_miss_is_not_an_error() {
        let cache = CacheStore::new(MemoryStorage::new());
        let value: Option<String> = cache.get("absent").await;
        assert_eq!(value, None);
    }

    #[tokio::test]
    async fn test_remove_only_touches_named_entry() {
        let cache = CacheStore::new(MemoryStorage::new());
        cache.set("a", &1, None).await.unwrap();
        cache.set("b", &2, None).await.unwrap();

        cache.remove("a").await.unwrap();
        assert_eq!(cache.get::<i32>("a").await, None);
        assert_eq!(cache.get::<i32>("b").await, Some(2));
    }
}
