//! TTL cache for anonymous-viewer query results.
//!
//! Only raw rows are cached, serialized as JSON, never hydrated items.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use std::time::{Duration, Instant};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

/// Deterministic cache keys.
pub mod keys {
    #[must_use]
    pub fn global_feed(page: i64, size: i64) -> String {
        format!("cache:global_feed:page:{page}:size:{size}")
    }

    #[must_use]
    pub fn trending_hashtags(limit: i64) -> String {
        format!("cache:trending_hashtags:limit:{limit}")
    }
}

#[derive(Debug)]
struct CacheEntry {
    json: String,
    cached_at: Instant,
    ttl: Duration,
}

impl CacheEntry {
    fn is_valid(&self) -> bool {
        self.cached_at.elapsed() < self.ttl
    }
}

/// In-memory keyed cache with per-entry expiry.
#[derive(Debug, Default)]
pub struct ResponseCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl ResponseCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a live entry. Expired or undecodable entries are misses.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let entry = entries.get(key).filter(|entry| entry.is_valid())?;

        match serde_json::from_str(&entry.json) {
            Ok(value) => {
                debug!(key, "Cache hit");
                Some(value)
            }
            Err(e) => {
                warn!(key, "Discarding undecodable cache entry: {e}");
                None
            }
        }
    }

    /// Store `value` under `key` for `ttl`.
    ///
    /// Serialization failures are logged and the value is not cached.
    pub fn put<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        let json = match serde_json::to_string(value) {
            Ok(json) => json,
            Err(e) => {
                warn!(key, "Failed to serialize cache entry: {e}");
                return;
            }
        };

        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.insert(
            key.to_string(),
            CacheEntry {
                json,
                cached_at: Instant::now(),
                ttl,
            },
        );
    }

    /// Drop every expired entry, returning how many were removed.
    pub fn purge_expired(&self) -> usize {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|_, entry| entry.is_valid());
        before - entries.len()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
