//! Forwarding Pipeline Integration Tests
//!
//! End-to-end scenarios against a real WAL directory: declaration and
//! sample in one segment, declarations surviving rotation, declarations
//! truncated away, corruption, cancellation, and a multi-segment
//! round-trip that checks per-ref ordering.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tokio::task::JoinHandle;
use walship_core::{Labels, OutboundMetric, Result, Sample, SeriesDecl, METRIC_NAME_LABEL, NO_TIMESTAMP};
use walship_forward::{ForwarderConfig, ShutdownHandle, VecAppender, WalForwarder};
use walship_wal::{segment_file_name, WalWriter, PAGE_SIZE};

fn decl(ref_id: u64, name: &str, extra: &[(&str, &str)]) -> SeriesDecl {
    let mut pairs = vec![(METRIC_NAME_LABEL, name)];
    pairs.extend_from_slice(extra);
    SeriesDecl {
        ref_id,
        labels: Labels::from_pairs(&pairs),
    }
}

fn sample(ref_id: u64, timestamp_ms: i64, value: f64) -> Sample {
    Sample {
        ref_id,
        timestamp_ms,
        value,
    }
}

fn test_config(dir: &Path) -> ForwarderConfig {
    let mut config = ForwarderConfig::new(dir);
    config.poll_min = Duration::from_millis(10);
    config.poll_max = Duration::from_millis(50);
    config.gc_interval = Duration::from_millis(200);
    config
}

fn start_pipeline(
    dir: &Path,
) -> (
    Arc<WalForwarder>,
    Arc<VecAppender>,
    ShutdownHandle,
    JoinHandle<Result<()>>,
) {
    let appender = Arc::new(VecAppender::new());
    let forwarder = Arc::new(WalForwarder::new(
        test_config(dir),
        Arc::clone(&appender) as Arc<dyn walship_forward::Appender>,
    ));
    let shutdown = ShutdownHandle::new();

    let task = {
        let forwarder = Arc::clone(&forwarder);
        let shutdown = shutdown.clone();
        tokio::spawn(async move { forwarder.run(shutdown).await })
    };

    (forwarder, appender, shutdown, task)
}

async fn wait_for_appends(appender: &VecAppender, count: usize) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while appender.len() < count {
        assert!(
            Instant::now() < deadline,
            "timed out waiting for {} appends (got {})",
            count,
            appender.len()
        );
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

async fn stop_pipeline(shutdown: ShutdownHandle, task: JoinHandle<Result<()>>) {
    shutdown.shutdown();
    tokio::time::timeout(Duration::from_secs(2), task)
        .await
        .expect("pipeline must stop after shutdown")
        .unwrap()
        .unwrap();
}

// -------------------------------------------------------------------
// Scenario: one segment, one declaration, one sample
// -------------------------------------------------------------------

#[tokio::test]
async fn test_single_sample_forwarded_with_identity() {
    let dir = TempDir::new().unwrap();
    let mut writer = WalWriter::open(dir.path()).await.unwrap();
    writer
        .append_series(&[decl(7, "x", &[("a", "1")])])
        .await
        .unwrap();
    writer.append_samples(&[sample(7, 1000, 3.5)]).await.unwrap();
    writer.sync().await.unwrap();

    let (_forwarder, appender, shutdown, task) = start_pipeline(dir.path());
    wait_for_appends(&appender, 1).await;

    let expected = OutboundMetric {
        name: "x".to_string(),
        labels: Labels::from_pairs(&[("a", "1")]),
        value: 3.5,
        timestamp_ms: 1000,
        reset_timestamp_ms: NO_TIMESTAMP,
    };
    assert_eq!(appender.collected(), vec![expected]);

    stop_pipeline(shutdown, task).await;
    assert_eq!(appender.len(), 1);
}

// -------------------------------------------------------------------
// Scenario: declaration in segment 0, sample in segment 2, no truncation
// -------------------------------------------------------------------

#[tokio::test]
async fn test_declaration_survives_rotations() {
    let dir = TempDir::new().unwrap();
    let mut writer = WalWriter::open(dir.path()).await.unwrap();
    writer
        .append_series(&[decl(7, "crossing", &[("job", "api")])])
        .await
        .unwrap();
    writer.cut_segment().await.unwrap();
    writer.cut_segment().await.unwrap();
    writer.append_samples(&[sample(7, 9000, 1.25)]).await.unwrap();
    writer.sync().await.unwrap();

    let (_forwarder, appender, shutdown, task) = start_pipeline(dir.path());
    wait_for_appends(&appender, 1).await;

    let collected = appender.collected();
    assert_eq!(collected[0].name, "crossing");
    assert_eq!(collected[0].labels, Labels::from_pairs(&[("job", "api")]));
    assert_eq!(collected[0].timestamp_ms, 9000);

    stop_pipeline(shutdown, task).await;
}

// -------------------------------------------------------------------
// Scenario: declaring segment deleted before the sample arrives
// -------------------------------------------------------------------

#[tokio::test]
async fn test_sample_with_truncated_declaration_is_dropped() {
    let dir = TempDir::new().unwrap();
    let mut writer = WalWriter::open(dir.path()).await.unwrap();
    writer.append_series(&[decl(7, "doomed", &[])]).await.unwrap();
    writer.append_samples(&[sample(7, 1000, 1.0)]).await.unwrap();
    writer.sync().await.unwrap();

    let (_forwarder, appender, shutdown, task) = start_pipeline(dir.path());
    wait_for_appends(&appender, 1).await;

    // Rotate twice and truncate everything below segment 2
    writer.cut_segment().await.unwrap();
    writer.cut_segment().await.unwrap();
    for n in [0u64, 1] {
        tokio::fs::remove_file(dir.path().join(segment_file_name(n)))
            .await
            .unwrap();
    }

    // The doomed sample, then a sentinel series to mark stream progress
    writer.append_samples(&[sample(7, 2000, 2.0)]).await.unwrap();
    writer.append_series(&[decl(500, "sentinel", &[])]).await.unwrap();
    writer.append_samples(&[sample(500, 2001, 9.0)]).await.unwrap();
    writer.sync().await.unwrap();

    // The sentinel arrives, proving the doomed sample was processed
    wait_for_appends(&appender, 2).await;
    let names: Vec<String> = appender.collected().into_iter().map(|m| m.name).collect();
    assert_eq!(names, vec!["doomed".to_string(), "sentinel".to_string()]);

    stop_pipeline(shutdown, task).await;
}

// -------------------------------------------------------------------
// Scenario: sample with no declaration at all
// -------------------------------------------------------------------

#[tokio::test]
async fn test_sample_without_declaration_is_dropped() {
    let dir = TempDir::new().unwrap();
    let mut writer = WalWriter::open(dir.path()).await.unwrap();
    writer.append_samples(&[sample(404, 1000, 1.0)]).await.unwrap();
    writer.append_series(&[decl(1, "present", &[])]).await.unwrap();
    writer.append_samples(&[sample(1, 1001, 2.0)]).await.unwrap();
    writer.sync().await.unwrap();

    let (_forwarder, appender, shutdown, task) = start_pipeline(dir.path());
    wait_for_appends(&appender, 1).await;

    assert_eq!(appender.collected()[0].name, "present");

    stop_pipeline(shutdown, task).await;
    assert_eq!(appender.len(), 1);
}

// -------------------------------------------------------------------
// Scenario: corrupt fragment terminates the pipeline
// -------------------------------------------------------------------

#[tokio::test]
async fn test_corruption_stops_pipeline_after_prior_samples() {
    let dir = TempDir::new().unwrap();
    let mut writer = WalWriter::open(dir.path()).await.unwrap();
    writer.append_series(&[decl(7, "ok", &[])]).await.unwrap();
    writer.append_samples(&[sample(7, 1000, 1.0)]).await.unwrap();
    writer.sync().await.unwrap();

    let intact_len = tokio::fs::metadata(writer.segment_path())
        .await
        .unwrap()
        .len() as usize;

    writer.append_samples(&[sample(7, 2000, 2.0)]).await.unwrap();
    writer.sync().await.unwrap();

    // Flip the first payload byte of the third record's fragment
    let path = writer.segment_path();
    let mut data = tokio::fs::read(&path).await.unwrap();
    data[intact_len + 7] ^= 0xFF;
    tokio::fs::write(&path, &data).await.unwrap();

    let (_forwarder, appender, shutdown, task) = start_pipeline(dir.path());

    let result = tokio::time::timeout(Duration::from_secs(10), task)
        .await
        .expect("pipeline must terminate on corruption")
        .unwrap();
    let err = result.unwrap_err();
    assert!(err.is_corrupt());

    // The sample before the damage was appended
    assert_eq!(appender.len(), 1);
    assert_eq!(appender.collected()[0].timestamp_ms, 1000);

    // The handle was fired so peers stopped too
    assert!(shutdown.is_shutdown());
}

// -------------------------------------------------------------------
// Scenario: cancellation while blocked at the live tail
// -------------------------------------------------------------------

#[tokio::test]
async fn test_cancellation_is_clean_and_prompt() {
    let dir = TempDir::new().unwrap();
    let mut writer = WalWriter::open(dir.path()).await.unwrap();
    writer.append_series(&[decl(7, "x", &[])]).await.unwrap();
    writer.append_samples(&[sample(7, 1000, 1.0)]).await.unwrap();
    writer.sync().await.unwrap();

    let (_forwarder, appender, shutdown, task) = start_pipeline(dir.path());
    wait_for_appends(&appender, 1).await;

    // Pipeline is now idle at the tail
    tokio::time::sleep(Duration::from_millis(100)).await;

    let fired_at = Instant::now();
    shutdown.shutdown();
    let result = tokio::time::timeout(Duration::from_secs(1), task)
        .await
        .expect("pipeline must stop within a second of cancellation")
        .unwrap();

    assert!(result.is_ok(), "cancellation is a clean exit");
    assert!(fired_at.elapsed() < Duration::from_secs(1));
    assert_eq!(appender.len(), 1, "no appends after cancellation");
}

// -------------------------------------------------------------------
// Round-trip: K series × M samples across segment and page boundaries
// -------------------------------------------------------------------

#[tokio::test]
async fn test_round_trip_across_segments_in_per_ref_order() {
    const K: u64 = 4;
    const M: i64 = 25;
    const BULK_REF: u64 = 99;
    const BULK_COUNT: i64 = 3000;

    let dir = TempDir::new().unwrap();
    let mut writer = WalWriter::open(dir.path()).await.unwrap();

    let decls: Vec<SeriesDecl> = (0..K)
        .map(|r| decl(r, &format!("metric_{}", r), &[("shard", "a")]))
        .collect();
    writer.append_series(&decls).await.unwrap();
    writer.append_series(&[decl(BULK_REF, "bulk", &[])]).await.unwrap();

    // K·M samples interleaved across refs, cut into three segments
    for tick in 0..M {
        let batch: Vec<Sample> = (0..K)
            .map(|r| sample(r, tick * 100, tick as f64 + r as f64 / 10.0))
            .collect();
        writer.append_samples(&batch).await.unwrap();
        if tick == 9 || tick == 19 {
            writer.cut_segment().await.unwrap();
        }
    }

    // One record big enough to straddle page boundaries
    let bulk: Vec<Sample> = (0..BULK_COUNT)
        .map(|i| sample(BULK_REF, 10_000 + i, i as f64))
        .collect();
    let encoded = walship_core::record::encode_samples(&bulk);
    assert!(encoded.len() > PAGE_SIZE, "bulk record must span pages");
    writer.append_samples(&bulk).await.unwrap();
    writer.sync().await.unwrap();

    let (forwarder, appender, shutdown, task) = start_pipeline(dir.path());
    let expected_total = (K as usize) * (M as usize) + BULK_COUNT as usize;
    wait_for_appends(&appender, expected_total).await;

    let collected = appender.collected();
    assert_eq!(collected.len(), expected_total);

    // Per-ref delivery follows WAL order (timestamps strictly increase)
    for r in 0..K {
        let name = format!("metric_{}", r);
        let times: Vec<i64> = collected
            .iter()
            .filter(|m| m.name == name)
            .map(|m| m.timestamp_ms)
            .collect();
        assert_eq!(times.len(), M as usize);
        assert!(times.windows(2).all(|w| w[0] < w[1]), "ref {} out of order", r);
    }
    let bulk_times: Vec<i64> = collected
        .iter()
        .filter(|m| m.name == "bulk")
        .map(|m| m.timestamp_ms)
        .collect();
    assert_eq!(bulk_times.len(), BULK_COUNT as usize);
    assert!(bulk_times.windows(2).all(|w| w[0] < w[1]));

    // The cache holds exactly the declared refs
    assert_eq!(forwarder.series_count(), K as usize + 1);

    stop_pipeline(shutdown, task).await;
}

// -------------------------------------------------------------------
// NaN and infinities survive the whole pipeline bit-identically
// -------------------------------------------------------------------

#[tokio::test]
async fn test_special_values_forwarded_bit_identical() {
    let dir = TempDir::new().unwrap();
    let mut writer = WalWriter::open(dir.path()).await.unwrap();
    writer.append_series(&[decl(7, "odd", &[])]).await.unwrap();
    writer
        .append_samples(&[
            sample(7, 1, f64::NAN),
            sample(7, 2, f64::INFINITY),
            sample(7, 3, f64::NEG_INFINITY),
        ])
        .await
        .unwrap();
    writer.sync().await.unwrap();

    let (_forwarder, appender, shutdown, task) = start_pipeline(dir.path());
    wait_for_appends(&appender, 3).await;

    let collected = appender.collected();
    assert_eq!(collected[0].value.to_bits(), f64::NAN.to_bits());
    assert_eq!(collected[1].value.to_bits(), f64::INFINITY.to_bits());
    assert_eq!(collected[2].value.to_bits(), f64::NEG_INFINITY.to_bits());

    stop_pipeline(shutdown, task).await;
}
