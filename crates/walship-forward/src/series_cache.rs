//! Series Cache
//!
//! Maps the producer-assigned numeric series ref to its labelled identity,
//! remembering the youngest segment each ref was observed in. The cache is
//! the sole resolver on the sample path; identity is never derived from
//! sample data.
//!
//! ## Memory Bound
//!
//! Entries whose youngest observation is older than the oldest surviving
//! segment can never be referenced again (the producer re-declares live
//! series when it truncates), so a garbage-collection pass evicts them.
//! This bounds the cache by "series live within the retained WAL window".
//!
//! ## Concurrency
//!
//! One writer (the decode stage) inserts and looks up; one background task
//! evicts. Lookups take a read lock, insertion a short write lock, and the
//! GC sweep a single short exclusive section.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use walship_core::{Labels, Result};
use walship_observability::metrics::{SERIES_CACHE_EVICTIONS_TOTAL, SERIES_CACHE_SIZE};
use walship_wal::segment::first_segment;

struct CacheEntry {
    labels: Arc<Labels>,

    /// Youngest segment this ref was observed in; monotonically
    /// non-decreasing.
    max_segment: u64,
}

/// ref → labelled identity, bounded by the retained WAL window.
pub struct SeriesCache {
    wal_dir: PathBuf,
    entries: RwLock<HashMap<u64, CacheEntry>>,
}

impl SeriesCache {
    pub fn new(wal_dir: impl Into<PathBuf>) -> Self {
        Self {
            wal_dir: wal_dir.into(),
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Insert or refresh a declaration. Labels of a live ref never change,
    /// so an existing entry only has its segment watermark bumped.
    pub fn set(&self, ref_id: u64, labels: Labels, observed_segment: u64) {
        let mut entries = self.entries.write().unwrap();
        entries
            .entry(ref_id)
            .and_modify(|e| e.max_segment = e.max_segment.max(observed_segment))
            .or_insert_with(|| CacheEntry {
                labels: Arc::new(labels),
                max_segment: observed_segment,
            });
        SERIES_CACHE_SIZE.set(entries.len() as i64);
    }

    /// Resolve a ref to its labels, if the declaration is still retained.
    pub fn get(&self, ref_id: u64) -> Option<Arc<Labels>> {
        self.entries
            .read()
            .unwrap()
            .get(&ref_id)
            .map(|e| Arc::clone(&e.labels))
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Evict every entry whose youngest observation predates the oldest
    /// surviving segment. Returns the number of evictions.
    pub async fn gc(&self) -> Result<usize> {
        // Segment directory scan happens outside the lock
        let Some((oldest, _)) = first_segment(&self.wal_dir).await? else {
            // No segments on disk: the retention window is unknowable, so
            // leave the cache untouched
            return Ok(0);
        };

        let evicted;
        {
            let mut entries = self.entries.write().unwrap();
            let before = entries.len();
            entries.retain(|_, e| e.max_segment >= oldest);
            evicted = before - entries.len();
            SERIES_CACHE_SIZE.set(entries.len() as i64);
        }

        if evicted > 0 {
            SERIES_CACHE_EVICTIONS_TOTAL.inc_by(evicted as u64);
            debug!(evicted, oldest_segment = oldest, "evicted stale series");
        }
        Ok(evicted)
    }

    /// Periodic GC loop; runs until the shutdown signal fires.
    pub async fn run(self: Arc<Self>, interval: Duration, mut shutdown: watch::Receiver<bool>) {
        info!(interval_ms = interval.as_millis() as u64, "series cache GC started");

        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                    continue;
                }
            }

            if let Err(e) = self.gc().await {
                // A transient directory error just delays eviction
                warn!(error = %e, "series cache GC pass failed");
            }
        }

        info!("series cache GC stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn labels(name: &str) -> Labels {
        Labels::from_pairs(&[("__name__", name)])
    }

    async fn touch_segment(dir: &std::path::Path, n: u64) {
        tokio::fs::write(dir.join(walship_wal::segment_file_name(n)), b"")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_set_and_get() {
        let dir = TempDir::new().unwrap();
        let cache = SeriesCache::new(dir.path());

        cache.set(7, labels("x"), 0);
        let got = cache.get(7).expect("entry present");
        assert_eq!(got.metric_name(), Some("x"));
        assert!(cache.get(8).is_none());
    }

    #[tokio::test]
    async fn test_labels_never_change_for_live_ref() {
        let dir = TempDir::new().unwrap();
        let cache = SeriesCache::new(dir.path());

        cache.set(7, labels("original"), 0);
        cache.set(7, labels("imposter"), 3);

        assert_eq!(cache.get(7).unwrap().metric_name(), Some("original"));
    }

    #[tokio::test]
    async fn test_max_segment_is_monotonic() {
        let dir = TempDir::new().unwrap();
        touch_segment(dir.path(), 2).await;

        let cache = SeriesCache::new(dir.path());
        cache.set(7, labels("x"), 5);
        // A re-declaration observed in an older segment must not roll the
        // watermark back below the eviction threshold
        cache.set(7, labels("x"), 1);

        cache.gc().await.unwrap();
        assert!(cache.get(7).is_some());
    }

    #[tokio::test]
    async fn test_gc_evicts_entries_behind_retention() {
        let dir = TempDir::new().unwrap();
        touch_segment(dir.path(), 2).await;

        let cache = SeriesCache::new(dir.path());
        cache.set(1, labels("old"), 0);
        cache.set(2, labels("edge"), 2);
        cache.set(3, labels("new"), 5);

        let evicted = cache.gc().await.unwrap();
        assert_eq!(evicted, 1);
        assert!(cache.get(1).is_none());
        assert!(cache.get(2).is_some());
        assert!(cache.get(3).is_some());
        assert_eq!(cache.len(), 2);
    }

    #[tokio::test]
    async fn test_gc_with_no_segments_keeps_everything() {
        let dir = TempDir::new().unwrap();
        let cache = SeriesCache::new(dir.path());
        cache.set(1, labels("x"), 0);

        assert_eq!(cache.gc().await.unwrap(), 0);
        assert!(cache.get(1).is_some());
    }

    #[tokio::test]
    async fn test_gc_loop_stops_on_shutdown() {
        let dir = TempDir::new().unwrap();
        let cache = Arc::new(SeriesCache::new(dir.path()));
        let (tx, rx) = watch::channel(false);

        let task = tokio::spawn(Arc::clone(&cache).run(Duration::from_millis(10), rx));
        tokio::time::sleep(Duration::from_millis(50)).await;
        tx.send(true).unwrap();

        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("GC loop must stop on shutdown")
            .unwrap();
    }

    #[tokio::test]
    async fn test_gc_loop_evicts_over_time() {
        let dir = TempDir::new().unwrap();
        touch_segment(dir.path(), 4).await;

        let cache = Arc::new(SeriesCache::new(dir.path()));
        cache.set(1, labels("stale"), 0);

        let (tx, rx) = watch::channel(false);
        let task = tokio::spawn(Arc::clone(&cache).run(Duration::from_millis(10), rx));

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(cache.get(1).is_none());

        tx.send(true).unwrap();
        task.await.unwrap();
    }
}
