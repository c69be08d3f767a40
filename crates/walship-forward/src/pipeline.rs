//! Pipeline Orchestrator
//!
//! Wires the tailer, record reader, series cache, translator, and appender
//! into one long-running activity with a single exit signal.
//!
//! ```text
//! ┌──────────┐  bytes  ┌──────────────┐  records  ┌─────────────────────┐
//! │ tailer   │ ──────► │ record reader│ ────────► │ dispatch by kind    │
//! └──────────┘         └──────────────┘           │  series → cache     │
//!       ▲                                         │  sample → translate │
//!       │ polls WAL dir                           │           → append  │
//!       │                                         │  tombstone → skip   │
//! ┌───────────────┐   evicts stale refs           └─────────────────────┘
//! │ cache GC task │ ◄── segment rotation / timer
//! └───────────────┘
//! ```
//!
//! Decoding, cache updates, translation, and the appender call all run on
//! one task, so per-ref sample order is WAL order and appender
//! back-pressure flows upstream into the tailer. The GC task is the only
//! concurrent mutator.
//!
//! On shutdown the tailer unblocks first; the reader finishes the record
//! it already started; the GC task stops on the same signal. Framing
//! corruption and non-EOF I/O errors terminate the pipeline and fire the
//! shutdown signal so no task outlives the failure.

use crate::appender::Appender;
use crate::config::ForwarderConfig;
use crate::series_cache::SeriesCache;
use crate::shutdown::ShutdownHandle;
use crate::translate::translate;
use std::sync::Arc;
use tracing::{error, info, warn};
use walship_core::{Error, Result, Sample, WalRecord};
use walship_observability::metrics::{
    RECORDS_CORRUPT_TOTAL, RECORDS_READ_TOTAL, SAMPLES_DROPPED_UNKNOWN_REF_TOTAL,
    SAMPLES_EMITTED_TOTAL, SAMPLES_TRANSLATE_FAILED_TOTAL, WAL_SEGMENT_CURRENT,
};
use walship_wal::{RecordReader, SegmentPosition, WalTailer};

/// Tails the collector's WAL and forwards every sample to the appender.
pub struct WalForwarder {
    config: ForwarderConfig,
    appender: Arc<dyn Appender>,
    cache: Arc<SeriesCache>,
}

impl WalForwarder {
    pub fn new(config: ForwarderConfig, appender: Arc<dyn Appender>) -> Self {
        let cache = Arc::new(SeriesCache::new(&config.wal_dir));
        Self {
            config,
            appender,
            cache,
        }
    }

    /// Number of series identities currently cached.
    pub fn series_count(&self) -> usize {
        self.cache.len()
    }

    /// Run until cancelled or a fatal error occurs.
    ///
    /// Returns `Ok(())` on cancellation (after draining the record in
    /// flight); corruption and non-EOF I/O errors are returned as-is after
    /// firing the shutdown signal so peer tasks stop too.
    pub async fn run(&self, shutdown: ShutdownHandle) -> Result<()> {
        info!(
            wal_dir = %self.config.wal_dir.display(),
            appender = self.appender.name(),
            "starting WAL forwarder"
        );

        let tailer = match WalTailer::open_with_config(
            &self.config.wal_dir,
            self.config.tailer_config(),
            shutdown.subscribe(),
        )
        .await
        {
            Ok(tailer) => tailer,
            Err(Error::Cancelled) => {
                info!("WAL forwarder cancelled before the first segment appeared");
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        let position = tailer.position();
        let gc_task = tokio::spawn(
            Arc::clone(&self.cache).run(self.config.gc_interval, shutdown.subscribe()),
        );
        let mut reader = RecordReader::new(tailer);

        let result = self.decode_loop(&mut reader, &position).await;

        // Tear down peers before reporting: a fatal error must stop the GC
        // task, and a cancelled run just re-fires the handle.
        shutdown.shutdown();
        let _ = gc_task.await;

        match result {
            Err(Error::Cancelled) => {
                info!("WAL forwarder stopped");
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "WAL forwarder failed");
                Err(e)
            }
            Ok(()) => Ok(()),
        }
    }

    async fn decode_loop(
        &self,
        reader: &mut RecordReader,
        position: &SegmentPosition,
    ) -> Result<()> {
        let mut current_segment = position.current();
        WAL_SEGMENT_CURRENT.set(current_segment as i64);

        loop {
            let record = match reader.next_record().await {
                Ok(record) => record,
                Err(e) => {
                    if e.is_corrupt() {
                        RECORDS_CORRUPT_TOTAL.inc();
                    }
                    return Err(e);
                }
            };
            RECORDS_READ_TOTAL.inc();

            let segment = position.current();
            if segment != current_segment {
                current_segment = segment;
                WAL_SEGMENT_CURRENT.set(segment as i64);
                // Rotation: the producer may have truncated old segments
                if let Err(e) = self.cache.gc().await {
                    warn!(error = %e, "rotation GC pass failed");
                }
            }

            match WalRecord::decode(&record) {
                Ok(WalRecord::Series(decls)) => {
                    for decl in decls {
                        self.cache.set(decl.ref_id, decl.labels, segment);
                    }
                }
                Ok(WalRecord::Samples(samples)) => {
                    for sample in samples {
                        self.forward_sample(&sample).await?;
                    }
                }
                Ok(WalRecord::Tombstones(_)) => {}
                Err(e) => {
                    // The fragment checksums held, so the damage is confined
                    // to this record's payload; skip it and keep the stream
                    warn!(error = %e, "skipping undecodable record");
                }
            }
        }
    }

    async fn forward_sample(&self, sample: &Sample) -> Result<()> {
        let Some(labels) = self.cache.get(sample.ref_id) else {
            warn!(
                ref_id = sample.ref_id,
                timestamp_ms = sample.timestamp_ms,
                "unknown series ref in sample"
            );
            SAMPLES_DROPPED_UNKNOWN_REF_TOTAL.inc();
            return Ok(());
        };

        match translate(&labels, sample) {
            Ok(metric) => {
                self.appender.append(metric).await?;
                SAMPLES_EMITTED_TOTAL.inc();
                Ok(())
            }
            Err(e) => {
                warn!(ref_id = sample.ref_id, error = %e, "cannot build outbound metric");
                SAMPLES_TRANSLATE_FAILED_TOTAL.inc();
                Ok(())
            }
        }
    }
}
