use lazy_static::lazy_static;
use prometheus::{IntCounter, IntGauge, Registry};
use std::sync::Once;

static INIT: Once = Once::new();

lazy_static! {
    /// Global Prometheus metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // ============================================================================
    // WAL Reading Metrics
    // ============================================================================

    /// Total logical records read from the WAL
    pub static ref RECORDS_READ_TOTAL: IntCounter = IntCounter::new(
        "walship_records_read_total",
        "Total logical records read from the WAL"
    ).expect("metric can be created");

    /// Total corrupt records encountered (terminates the pipeline)
    pub static ref RECORDS_CORRUPT_TOTAL: IntCounter = IntCounter::new(
        "walship_records_corrupt_total",
        "Total corrupt WAL records encountered"
    ).expect("metric can be created");

    /// Segment number currently being read
    pub static ref WAL_SEGMENT_CURRENT: IntGauge = IntGauge::new(
        "walship_wal_segment_current",
        "WAL segment number currently being read"
    ).expect("metric can be created");

    // ============================================================================
    // Forwarding Metrics
    // ============================================================================

    /// Samples successfully translated and handed to the appender
    pub static ref SAMPLES_EMITTED_TOTAL: IntCounter = IntCounter::new(
        "walship_samples_emitted_total",
        "Samples handed to the downstream appender"
    ).expect("metric can be created");

    /// Samples dropped because their series ref was unknown
    pub static ref SAMPLES_DROPPED_UNKNOWN_REF_TOTAL: IntCounter = IntCounter::new(
        "walship_samples_dropped_unknown_ref_total",
        "Samples dropped because their series ref was not in the cache"
    ).expect("metric can be created");

    /// Samples dropped because no outbound metric could be built
    pub static ref SAMPLES_TRANSLATE_FAILED_TOTAL: IntCounter = IntCounter::new(
        "walship_samples_translate_failed_total",
        "Samples dropped because translation failed"
    ).expect("metric can be created");

    // ============================================================================
    // Series Cache Metrics
    // ============================================================================

    /// Number of series identities currently cached
    pub static ref SERIES_CACHE_SIZE: IntGauge = IntGauge::new(
        "walship_series_cache_size",
        "Series identities currently cached"
    ).expect("metric can be created");

    /// Total cache entries evicted by garbage collection
    pub static ref SERIES_CACHE_EVICTIONS_TOTAL: IntCounter = IntCounter::new(
        "walship_series_cache_evictions_total",
        "Series cache entries evicted by garbage collection"
    ).expect("metric can be created");
}

/// Initialize metrics registry
/// Can be called multiple times safely (idempotent)
pub fn init() {
    INIT.call_once(|| {
        REGISTRY
            .register(Box::new(RECORDS_READ_TOTAL.clone()))
            .expect("records_read_total can be registered");
        REGISTRY
            .register(Box::new(RECORDS_CORRUPT_TOTAL.clone()))
            .expect("records_corrupt_total can be registered");
        REGISTRY
            .register(Box::new(WAL_SEGMENT_CURRENT.clone()))
            .expect("wal_segment_current can be registered");
        REGISTRY
            .register(Box::new(SAMPLES_EMITTED_TOTAL.clone()))
            .expect("samples_emitted_total can be registered");
        REGISTRY
            .register(Box::new(SAMPLES_DROPPED_UNKNOWN_REF_TOTAL.clone()))
            .expect("samples_dropped_unknown_ref_total can be registered");
        REGISTRY
            .register(Box::new(SAMPLES_TRANSLATE_FAILED_TOTAL.clone()))
            .expect("samples_translate_failed_total can be registered");
        REGISTRY
            .register(Box::new(SERIES_CACHE_SIZE.clone()))
            .expect("series_cache_size can be registered");
        REGISTRY
            .register(Box::new(SERIES_CACHE_EVICTIONS_TOTAL.clone()))
            .expect("series_cache_evictions_total can be registered");
    });
}
