// Result cache for computed listing pages and single-property lookups.
// Writes to the property collection invalidate the whole cache; the cache
// is an optimization only and its absence must not change any result.

use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use lru::LruCache;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::Mutex;

use crate::error::{AppError, AppResult};

pub const DEFAULT_TTL: Duration = Duration::from_secs(60);

/// Injected cache seam. Handed around as `Arc<dyn ResultCache>` so tests
/// can substitute [`NoopCache`].
#[async_trait]
pub trait ResultCache: Send + Sync {
    async fn get(&self, key: &str) -> Option<Vec<u8>>;
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration);
    async fn flush(&self);
}

#[derive(Debug, Clone)]
struct CacheEntry {
    data: Vec<u8>,
    inserted_at: Instant,
    ttl: Duration,
}

impl CacheEntry {
    fn new(data: Vec<u8>, ttl: Duration) -> Self {
        Self {
            data,
            inserted_at: Instant::now(),
            ttl,
        }
    }

    fn is_expired(&self) -> bool {
        self.inserted_at.elapsed() > self.ttl
    }
}

/// In-memory LRU cache with per-entry TTL.
pub struct MemoryCache {
    entries: Mutex<LruCache<String, CacheEntry>>,
}

impl MemoryCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).expect("nonzero cache capacity");
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }
}

#[async_trait]
impl ResultCache for MemoryCache {
    async fn get(&self, key: &str) -> Option<Vec<u8>> {
        let mut entries = self.entries.lock().await;
        match entries.get(key) {
            Some(entry) if entry.is_expired() => {
                entries.pop(key);
                None
            }
            Some(entry) => Some(entry.data.clone()),
            None => None,
        }
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) {
        let mut entries = self.entries.lock().await;
        entries.put(key.to_string(), CacheEntry::new(value, ttl));
    }

    async fn flush(&self) {
        self.entries.lock().await.clear();
    }
}

/// Cache that stores nothing. Every read misses, so callers always hit the
/// repository; used in tests and wherever caching is unwanted.
pub struct NoopCache;

#[async_trait]
impl ResultCache for NoopCache {
    async fn get(&self, _key: &str) -> Option<Vec<u8>> {
        None
    }

    async fn set(&self, _key: &str, _value: Vec<u8>, _ttl: Duration) {}

    async fn flush(&self) {}
}

/// Serialization at the cache boundary. Cached values are JSON-shaped
/// documents, so they round-trip through serde_json.
pub fn encode<T: Serialize>(value: &T) -> AppResult<Vec<u8>> {
    serde_json::to_vec(value)
        .map_err(|e| AppError::Internal(format!("Failed to serialize cache entry: {}", e)))
}

pub fn decode<T: DeserializeOwned>(data: &[u8]) -> AppResult<T> {
    serde_json::from_slice(data)
        .map_err(|e| AppError::Internal(format!("Failed to deserialize cache entry: {}", e)))
}

pub fn property_key(id: i64) -> String {
    format!("prop:{}", id)
}
