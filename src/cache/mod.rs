//! Report cache.
//!
//! Reports are cached as JSON values under a key derived from the tenant,
//! the report kind and the normalized filter, so semantically identical
//! requests share an entry however their query strings were spelled.
//! Entries expire after a fixed TTL; there is no other invalidation.
//!
//! The cache is injected as an [`AnalyticsCache`] trait object. Callers
//! treat every [`CacheError`] as a miss.

mod moka_cache;

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use sha2::{Digest, Sha256};

pub use moka_cache::MokaCache;

use crate::domain::{DashboardFilter, ReportKind, TenantId};

/// Prefix shared by every cache key.
pub const KEY_PREFIX: &str = "tenant-analytics";

/// Default lifetime of a cached report.
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// Cache backend failure. Never surfaced to clients.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// The backend could not be reached or refused the operation.
    #[error("cache backend unavailable: {0}")]
    Unavailable(String),
}

/// Key/value store for serialized reports.
///
/// # Errors
///
/// `get` and `set` return [`CacheError`] when the backend fails; callers
/// fall back to computing the report.
#[async_trait]
pub trait AnalyticsCache: Send + Sync + fmt::Debug {
    /// Cached value under `key`, if present and fresh.
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>, CacheError>;

    /// Stores `value` under `key` for [`AnalyticsCache::ttl`].
    async fn set(&self, key: &str, value: serde_json::Value) -> Result<(), CacheError>;

    /// Lifetime of stored entries.
    fn ttl(&self) -> Duration;
}

/// Cache that never stores anything, for `CACHE_ENABLED=false`.
#[derive(Debug, Clone, Copy)]
pub struct NoopCache {
    ttl: Duration,
}

impl NoopCache {
    /// Creates a no-op cache advertising `ttl` as its refresh interval.
    #[must_use]
    pub const fn new(ttl: Duration) -> Self {
        Self { ttl }
    }
}

impl Default for NoopCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

#[async_trait]
impl AnalyticsCache for NoopCache {
    async fn get(&self, _key: &str) -> Result<Option<serde_json::Value>, CacheError> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: serde_json::Value) -> Result<(), CacheError> {
        Ok(())
    }

    fn ttl(&self) -> Duration {
        self.ttl
    }
}

/// `tenant-analytics:{report}:{tenant}:{sha256(filter fingerprint)}`.
#[must_use]
pub fn cache_key(kind: ReportKind, tenant: TenantId, filter: &DashboardFilter) -> String {
    let mut hasher = Sha256::new();
    for (name, value) in filter.fingerprint() {
        hasher.update(name.as_bytes());
        hasher.update(b"=");
        hasher.update(value.as_bytes());
        hasher.update(b"\n");
    }
    let digest = hex::encode(hasher.finalize());
    format!("{KEY_PREFIX}:{}:{tenant}:{digest}", kind.as_str())
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::domain::filter::{FilterDefaults, RawFilters, normalize};

    fn filter(query: &str) -> DashboardFilter {
        let Some(now) = Utc.with_ymd_and_hms(2026, 10, 17, 4, 0, 0).single() else {
            panic!("invalid fixture instant");
        };
        normalize(
            &RawFilters::from_query(query),
            &FilterDefaults {
                timezone: chrono_tz::Asia::Manila,
                now,
            },
        )
    }

    #[test]
    fn key_ignores_spelling_and_order() {
        let tenant = TenantId::new(7);
        let a = cache_key(ReportKind::Summary, tenant, &filter("use_payments=1&year=2024&company_id=3"));
        let b = cache_key(ReportKind::Summary, tenant, &filter("company_id=3&year=2024&use_payments=true"));
        assert_eq!(a, b);
    }

    #[test]
    fn key_separates_tenants_reports_and_filters() {
        let f = filter("year=2024");
        let base = cache_key(ReportKind::Summary, TenantId::new(1), &f);
        assert_ne!(base, cache_key(ReportKind::Summary, TenantId::new(2), &f));
        assert_ne!(base, cache_key(ReportKind::MonthlySales, TenantId::new(1), &f));
        assert_ne!(
            base,
            cache_key(ReportKind::Summary, TenantId::new(1), &filter("year=2024&use_payments=1"))
        );
    }

    #[test]
    fn key_has_readable_prefix() {
        let key = cache_key(ReportKind::TopVehicles, TenantId::new(42), &filter(""));
        assert!(key.starts_with("tenant-analytics:top-vehicles:42:"));
        assert_eq!(key.len(), "tenant-analytics:top-vehicles:42:".len() + 64);
    }

    #[tokio::test]
    async fn noop_cache_never_hits() {
        let cache = NoopCache::default();
        let stored = cache.set("k", serde_json::json!({"a": 1})).await;
        assert!(stored.is_ok());
        let Ok(hit) = cache.get("k").await else {
            panic!("noop get failed");
        };
        assert!(hit.is_none());
        assert_eq!(cache.ttl(), DEFAULT_TTL);
    }
}
