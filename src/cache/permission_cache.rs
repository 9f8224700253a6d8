use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::Cache;
use crate::config::CacheTtls;

pub mod keys {
    use uuid::Uuid;

    pub const CATALOG: &str = "permission_catalog";

    pub fn role_permissions(role_id: Uuid) -> String {
        format!("role_permissions:{}", role_id)
    }

    pub fn company_members(company_id: Uuid) -> String {
        format!("company_members:{}", company_id)
    }
}

/// Error-swallowing front for an optional [`Cache`] backend.
///
/// Every failure is logged and reported to the caller as a miss (for reads)
/// or silently dropped (for writes and deletes).
#[derive(Clone)]
pub struct PermissionCache {
    backend: Option<Arc<dyn Cache>>,
    ttls: CacheTtls,
}

impl PermissionCache {
    pub fn new(backend: Arc<dyn Cache>, ttls: CacheTtls) -> Self {
        Self {
            backend: Some(backend),
            ttls,
        }
    }

    pub fn disabled() -> Self {
        Self {
            backend: None,
            ttls: CacheTtls::default(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.backend.is_some()
    }

    pub fn ttls(&self) -> CacheTtls {
        self.ttls
    }

    pub async fn get(&self, key: &str) -> Option<Vec<u8>> {
        let backend = self.backend.as_ref()?;
        match backend.get(key).await {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!(key = %key, error = %err, "cache read failed, treating as miss");
                None
            }
        }
    }

    pub async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) {
        let Some(backend) = self.backend.as_ref() else {
            return;
        };
        if let Err(err) = backend.set(key, value, ttl).await {
            tracing::warn!(key = %key, error = %err, "cache write failed");
        }
    }

    pub async fn delete(&self, key: &str) {
        let Some(backend) = self.backend.as_ref() else {
            return;
        };
        if let Err(err) = backend.delete(key).await {
            tracing::warn!(key = %key, error = %err, "cache delete failed");
        }
    }

    /// Reads and decodes a JSON value. An undecodable entry is evicted and
    /// reported as a miss.
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let bytes = self.get(key).await?;
        match serde_json::from_slice(&bytes) {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::warn!(key = %key, error = %err, "evicting undecodable cache entry");
                self.delete(key).await;
                None
            }
        }
    }

    pub async fn set_json<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        if !self.is_enabled() {
            return;
        }
        match serde_json::to_vec(value) {
            Ok(bytes) => self.set(key, bytes, ttl).await,
            Err(err) => tracing::warn!(key = %key, error = %err, "failed to encode cache entry"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheError, MemoryCache};
    use async_trait::async_trait;

    struct BrokenCache;

    #[async_trait]
    impl Cache for BrokenCache {
        async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, CacheError> {
            Err(CacheError::Unavailable("connection refused".into()))
        }
        async fn set(&self, _key: &str, _value: Vec<u8>, _ttl: Duration) -> Result<(), CacheError> {
            Err(CacheError::Unavailable("connection refused".into()))
        }
        async fn delete(&self, _key: &str) -> Result<(), CacheError> {
            Err(CacheError::Unavailable("connection refused".into()))
        }
    }

    #[tokio::test]
    async fn backend_failures_look_like_misses() {
        let cache = PermissionCache::new(Arc::new(BrokenCache), CacheTtls::default());
        cache.set("k", vec![1], Duration::from_secs(1)).await;
        cache.delete("k").await;

        assert_eq!(cache.get("k").await, None);
    }

    #[tokio::test]
    async fn undecodable_json_is_evicted() {
        let backend = Arc::new(MemoryCache::new());
        let cache = PermissionCache::new(backend.clone(), CacheTtls::default());
        cache.set("k", b"{not json".to_vec(), Duration::from_secs(60)).await;

        let value: Option<Vec<String>> = cache.get_json("k").await;
        assert!(value.is_none());
        assert!(!backend.contains_key("k"));
    }

    #[tokio::test]
    async fn disabled_cache_never_hits() {
        let cache = PermissionCache::disabled();
        cache.set_json("k", &vec!["a"], Duration::from_secs(60)).await;

        let value: Option<Vec<String>> = cache.get_json("k").await;
        assert!(value.is_none());
    }
}
