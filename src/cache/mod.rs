//! Best-effort byte cache.
//!
//! Backends implement [`Cache`]; the rest of the crate talks to them through
//! [`PermissionCache`], which turns every backend failure into a miss.

mod invalidation;
mod permission_cache;

pub use invalidation::InvalidationQueue;
pub use permission_cache::{keys, PermissionCache};

use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;

#[derive(thiserror::Error, Debug)]
pub enum CacheError {
    #[error("cache unavailable: {0}")]
    Unavailable(String),
    #[error("cache operation failed: {0}")]
    Operation(String),
}

/// Key/value store for serialized blobs. `Ok(None)` from `get` is a miss.
#[async_trait]
pub trait Cache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError>;
    async fn delete(&self, key: &str) -> Result<(), CacheError>;
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: Vec<u8>,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// In-process cache with per-entry TTL. Values are replaced whole, so a
/// reader sees either the old blob, the new blob, or nothing.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: DashMap<String, CacheEntry>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries
            .get(key)
            .map(|entry| !entry.is_expired(Instant::now()))
            .unwrap_or(false)
    }

    /// Drops every expired entry.
    pub fn purge_expired(&self) {
        let now = Instant::now();
        self.entries.retain(|_, entry| !entry.is_expired(now));
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let now = Instant::now();
        if let Some(entry) = self.entries.get(key) {
            if !entry.is_expired(now) {
                return Ok(Some(entry.value.clone()));
            }
        } else {
            return Ok(None);
        }

        // Expired: the read guard is released above before removing.
        self.entries.remove_if(key, |_, entry| entry.is_expired(now));
        Ok(None)
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
        let expires_at = Instant::now()
            .checked_add(ttl)
            .ok_or_else(|| CacheError::Operation(format!("ttl out of range: {:?}", ttl)))?;
        self.entries
            .insert(key.to_string(), CacheEntry { value, expires_at });
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn get_returns_what_was_set() {
        let cache = MemoryCache::new();
        cache.set("a", b"one".to_vec(), Duration::from_secs(60)).await.unwrap();

        assert_eq!(cache.get("a").await.unwrap(), Some(b"one".to_vec()));
        assert_eq!(cache.get("b").await.unwrap(), None);
    }

    #[tokio::test]
    async fn expired_entries_are_misses() {
        let cache = MemoryCache::new();
        cache.set("a", b"one".to_vec(), Duration::ZERO).await.unwrap();

        assert_eq!(cache.get("a").await.unwrap(), None);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn delete_removes_entry() {
        let cache = MemoryCache::new();
        cache.set("a", b"one".to_vec(), Duration::from_secs(60)).await.unwrap();
        cache.delete("a").await.unwrap();
        cache.delete("missing").await.unwrap();

        assert!(!cache.contains_key("a"));
    }

    #[tokio::test]
    async fn purge_keeps_live_entries() {
        let cache = MemoryCache::new();
        cache.set("live", vec![1], Duration::from_secs(60)).await.unwrap();
        cache.set("dead", vec![2], Duration::ZERO).await.unwrap();
        cache.purge_expired();

        assert_eq!(cache.len(), 1);
        assert!(cache.contains_key("live"));
    }
}
