//! Short-lived snapshot cache shared by several subscribers
//!
//! Without it every subscriber drives its own remote cycle. With a TTL, a
//! snapshot younger than the TTL is handed out again and concurrent misses
//! wait for a single refresh.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use tracing::debug;

use crate::error::MonitorResult;

use super::collector::{MetricsCollector, SnapshotSource};
use super::metrics::MetricsSnapshot;

/// Last snapshot and the instant it was stored
#[derive(Debug)]
pub struct SnapshotCache {
    ttl: Duration,
    entry: Mutex<Option<(Instant, Arc<MetricsSnapshot>)>>,
}

impl SnapshotCache {
    /// Creates an empty cache
    #[must_use]
    pub const fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entry: Mutex::new(None),
        }
    }

    /// Validity window of a stored snapshot
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the stored snapshot if it is younger than the TTL
    #[must_use]
    pub fn get(&self) -> Option<Arc<MetricsSnapshot>> {
        let entry = self.entry.lock().unwrap_or_else(PoisonError::into_inner);
        entry
            .as_ref()
            .filter(|(stored_at, _)| stored_at.elapsed() < self.ttl)
            .map(|(_, snapshot)| Arc::clone(snapshot))
    }

    /// Stores `snapshot`, replacing any previous one
    pub fn put(&self, snapshot: Arc<MetricsSnapshot>) {
        let mut entry = self.entry.lock().unwrap_or_else(PoisonError::into_inner);
        *entry = Some((Instant::now(), snapshot));
    }

    /// Drops the stored snapshot
    pub fn clear(&self) {
        let mut entry = self.entry.lock().unwrap_or_else(PoisonError::into_inner);
        *entry = None;
    }
}

/// [`MetricsCollector`] fronted by a [`SnapshotCache`]
#[derive(Debug)]
pub struct CachedCollector {
    collector: Arc<MetricsCollector>,
    cache: SnapshotCache,
    refresh: tokio::sync::Mutex<()>,
}

impl CachedCollector {
    /// Wraps `collector` with a cache of the given TTL
    #[must_use]
    pub fn new(collector: Arc<MetricsCollector>, ttl: Duration) -> Self {
        Self {
            collector,
            cache: SnapshotCache::new(ttl),
            refresh: tokio::sync::Mutex::new(()),
        }
    }

    /// The cache in front of the collector
    #[must_use]
    pub const fn cache(&self) -> &SnapshotCache {
        &self.cache
    }

    /// Returns a fresh enough snapshot, running at most one cycle for any
    /// number of concurrent callers.
    ///
    /// A failed cycle is not cached; every waiting caller gets its own
    /// attempt once the lock is released.
    ///
    /// # Errors
    ///
    /// Returns the error of the collection cycle run on a miss.
    pub async fn collect(&self) -> MonitorResult<Arc<MetricsSnapshot>> {
        if let Some(snapshot) = self.cache.get() {
            return Ok(snapshot);
        }

        let _refresh = self.refresh.lock().await;
        if let Some(snapshot) = self.cache.get() {
            debug!("Snapshot refreshed by a concurrent caller");
            return Ok(snapshot);
        }

        let snapshot = Arc::new(self.collector.collect().await?);
        self.cache.put(Arc::clone(&snapshot));
        Ok(snapshot)
    }
}

#[async_trait]
impl SnapshotSource for CachedCollector {
    async fn snapshot(&self) -> MonitorResult<Arc<MetricsSnapshot>> {
        self.collect().await
    }
}
