//! In-process TTL cache backed by `moka`.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;

use super::{AnalyticsCache, CacheError};

/// Bounded in-memory cache with a fixed time-to-live.
#[derive(Clone)]
pub struct MokaCache {
    inner: Cache<String, serde_json::Value>,
    ttl: Duration,
}

impl MokaCache {
    /// Creates a cache holding at most `max_entries` reports for `ttl`.
    #[must_use]
    pub fn new(max_entries: u64, ttl: Duration) -> Self {
        let inner = Cache::builder()
            .max_capacity(max_entries)
            .time_to_live(ttl)
            .build();
        Self { inner, ttl }
    }
}

impl fmt::Debug for MokaCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MokaCache")
            .field("entries", &self.inner.entry_count())
            .field("ttl", &self.ttl)
            .finish()
    }
}

#[async_trait]
impl AnalyticsCache for MokaCache {
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>, CacheError> {
        Ok(self.inner.get(key).await)
    }

    async fn set(&self, key: &str, value: serde_json::Value) -> Result<(), CacheError> {
        self.inner.insert(key.to_string(), value).await;
        Ok(())
    }

    fn ttl(&self) -> Duration {
        self.ttl
    }
}
