use async_trait::async_trait;
use redis::aio::ConnectionManager;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::core::params::SearchParams;
use crate::models::{PhotoId, UserId};
use crate::services::transport::{RawRecord, Transport, TransportResult};

/// Errors that can occur with cache operations
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Redis error: {0}")]
    RedisError(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Cache miss: {0}")]
    CacheMiss(String),
}

/// Two-tier cache manager
///
/// L1 is an in-process moka cache, L2 an optional Redis shared across
/// instances. Without Redis the manager runs on L1 alone.
pub struct CacheManager {
    redis: Option<Arc<tokio::sync::Mutex<ConnectionManager>>>,
    l1_cache: moka::future::Cache<String, Vec<u8>>,
    ttl_secs: u64,
}

impl CacheManager {
    /// Create a cache manager, connecting to Redis when a URL is given
    pub async fn new(
        redis_url: Option<&str>,
        l1_size: u64,
        ttl_secs: u64,
    ) -> Result<Self, CacheError> {
        let redis = match redis_url {
            Some(url) => {
                let client = redis::Client::open(url)?;
                let manager = ConnectionManager::new(client).await?;
                Some(Arc::new(tokio::sync::Mutex::new(manager)))
            }
            None => None,
        };

        Ok(Self {
            redis,
            l1_cache: Self::build_l1(l1_size, ttl_secs),
            ttl_secs,
        })
    }

    /// L1-only cache manager
    pub fn in_memory(l1_size: u64, ttl_secs: u64) -> Self {
        Self {
            redis: None,
            l1_cache: Self::build_l1(l1_size, ttl_secs),
            ttl_secs,
        }
    }

    fn build_l1(l1_size: u64, ttl_secs: u64) -> moka::future::Cache<String, Vec<u8>> {
        moka::future::CacheBuilder::new(l1_size)
            .time_to_live(Duration::from_secs(ttl_secs))
            .build()
    }

    /// Get a value from cache (L1 first, then L2)
    pub async fn get<T>(&self, key: &str) -> Result<T, CacheError>
    where
        T: for<'de> Deserialize<'de>,
    {
        if let Some(bytes) = self.l1_cache.get(key).await {
            tracing::trace!("L1 cache hit: {}", key);
            return Ok(serde_json::from_slice(&bytes)?);
        }

        if let Some(redis) = &self.redis {
            let mut conn = redis.lock().await;
            let value: Option<String> = redis::cmd("GET")
                .arg(key)
                .query_async(&mut *conn)
                .await?;
            drop(conn);

            if let Some(json) = value {
                tracing::trace!("L2 cache hit: {}", key);
                self.l1_cache
                    .insert(key.to_string(), json.as_bytes().to_vec())
                    .await;
                return Ok(serde_json::from_str(&json)?);
            }
        }

        tracing::trace!("Cache miss: {}", key);
        Err(CacheError::CacheMiss(key.to_string()))
    }

    /// Set a value in every configured tier
    pub async fn set<T>(&self, key: &str, value: &T) -> Result<(), CacheError>
    where
        T: Serialize,
    {
        let json = serde_json::to_string(value)?;

        self.l1_cache
            .insert(key.to_string(), json.as_bytes().to_vec())
            .await;

        if let Some(redis) = &self.redis {
            let mut conn = redis.lock().await;
            redis::cmd("SETEX")
                .arg(key)
                .arg(self.ttl_secs)
                .arg(json)
                .query_async::<()>(&mut *conn)
                .await?;
        }

        tracing::trace!("Cache set: {}", key);
        Ok(())
    }

    /// Delete a value from every tier
    pub async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.l1_cache.invalidate(key).await;
        if let Some(redis) = &self.redis {
            let mut conn = redis.lock().await;
            redis::cmd("DEL")
                .arg(key)
                .query_async::<()>(&mut *conn)
                .await?;
        }
        Ok(())
    }

    /// Number of L1 entries
    pub fn entry_count(&self) -> u64 {
        self.l1_cache.entry_count()
    }
}

/// Cache key builder
pub struct CacheKey;

impl CacheKey {
    /// Build a cache key for one page of search results
    pub fn search_page(criteria_hash: &str, offset: u32, count: u32) -> String {
        format!("search:{}:{}:{}", criteria_hash, offset, count)
    }

    /// Build a cache key for a user profile
    pub fn profile(user_id: UserId) -> String {
        format!("profile:{}", user_id)
    }
}

/// Transport decorator caching search pages and single-profile lookups
///
/// Photos and like calls always go to the remote platform so like state is
/// never stale.
pub struct CachingTransport<T> {
    inner: T,
    cache: Arc<CacheManager>,
}

impl<T: Transport> CachingTransport<T> {
    pub fn new(inner: T, cache: Arc<CacheManager>) -> Self {
        Self { inner, cache }
    }

    async fn cached<F>(&self, key: String, fetch: F) -> TransportResult<Vec<RawRecord>>
    where
        F: std::future::Future<Output = TransportResult<Vec<RawRecord>>> + Send,
    {
        match self.cache.get::<Vec<RawRecord>>(&key).await {
            Ok(records) => return Ok(records),
            Err(CacheError::CacheMiss(_)) => {}
            Err(e) => tracing::warn!("Cache read failed for {}: {}", key, e),
        }

        let records = fetch.await?;
        if let Err(e) = self.cache.set(&key, &records).await {
            tracing::warn!("Cache write failed for {}: {}", key, e);
        }
        Ok(records)
    }
}

#[async_trait]
impl<T: Transport> Transport for CachingTransport<T> {
    async fn search_candidates(&self, params: &SearchParams) -> TransportResult<Vec<RawRecord>> {
        let key = CacheKey::search_page(
            &params.criteria().fingerprint(),
            params.offset(),
            params.count(),
        );
        self.cached(key, self.inner.search_candidates(params)).await
    }

    async fn fetch_photos(&self, owner_id: UserId, count: u32) -> TransportResult<Vec<RawRecord>> {
        self.inner.fetch_photos(owner_id, count).await
    }

    async fn like_photo(&self, owner_id: UserId, photo_id: PhotoId) -> TransportResult<u64> {
        self.inner.like_photo(owner_id, photo_id).await
    }

    async fn unlike_photo(&self, owner_id: UserId, photo_id: PhotoId) -> TransportResult<u64> {
        self.inner.unlike_photo(owner_id, photo_id).await
    }

    async fn fetch_profiles(&self, ids: &[UserId]) -> TransportResult<Vec<RawRecord>> {
        match ids {
            [id] => {
                self.cached(CacheKey::profile(*id), self.inner.fetch_profiles(ids))
                    .await
            }
            _ => self.inner.fetch_profiles(ids).await,
        }
    }
}
