//! walship Sidecar
//!
//! Main entry point: tails the co-resident collector's WAL and forwards
//! every sample as a JSON line on stdout. The production deployment swaps
//! the JSON-lines appender for the remote queue manager behind the same
//! `Appender` trait; this binary is the local/debugging rendition of the
//! pipeline.
//!
//! ## Configuration
//! All configuration is done via environment variables:
//!
//! - `WALSHIP_WAL_DIR`: WAL directory to tail (default: ./data/wal)
//! - `WALSHIP_GC_INTERVAL_MS`: series cache GC cadence (default: 1000)
//! - `WALSHIP_POLL_MIN_MS`: initial tail poll delay (default: 50)
//! - `WALSHIP_POLL_MAX_MS`: tail poll ceiling and rotation scan cadence
//!   (default: 500)
//!
//! ## Logging
//! Logging goes to stderr (stdout carries the metric stream) and is
//! controlled via `RUST_LOG`:
//! ```bash
//! RUST_LOG=debug WALSHIP_WAL_DIR=/var/lib/collector/wal walship-sidecar
//! ```
//!
//! ## Exit Status
//! Zero after a clean shutdown (SIGINT/SIGTERM, drained); non-zero on
//! fatal I/O errors or WAL corruption.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{error, info};
use walship_core::{Error, OutboundMetric, Result};
use walship_forward::{Appender, ForwarderConfig, ShutdownHandle, WalForwarder};

/// Emits every forwarded metric as one JSON object per line on stdout.
struct JsonLinesAppender {
    stdout: tokio::sync::Mutex<tokio::io::Stdout>,
}

impl JsonLinesAppender {
    fn new() -> Self {
        Self {
            stdout: tokio::sync::Mutex::new(tokio::io::stdout()),
        }
    }
}

#[async_trait]
impl Appender for JsonLinesAppender {
    async fn append(&self, metric: OutboundMetric) -> Result<()> {
        let mut line =
            serde_json::to_vec(&metric).map_err(|e| Error::Appender(e.to_string()))?;
        line.push(b'\n');

        let mut stdout = self.stdout.lock().await;
        stdout.write_all(&line).await?;
        Ok(())
    }

    fn name(&self) -> &str {
        "json-lines"
    }
}

fn env_duration_ms(name: &str, default_ms: u64) -> Duration {
    let ms = std::env::var(name)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(default_ms);
    Duration::from_millis(ms)
}

fn spawn_signal_listener(shutdown: ShutdownHandle) {
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            let mut sigterm =
                tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                    .expect("SIGTERM handler can be installed");
            tokio::select! {
                _ = tokio::signal::ctrl_c() => info!("received SIGINT"),
                _ = sigterm.recv() => info!("received SIGTERM"),
            }
        }
        #[cfg(not(unix))]
        {
            let _ = tokio::signal::ctrl_c().await;
            info!("received interrupt");
        }
        shutdown.shutdown();
    });
}

#[tokio::main]
async fn main() {
    // Logging goes to stderr; stdout is the metric stream
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let wal_dir = std::env::var("WALSHIP_WAL_DIR").unwrap_or_else(|_| "./data/wal".to_string());

    let mut config = ForwarderConfig::new(&wal_dir);
    config.gc_interval = env_duration_ms("WALSHIP_GC_INTERVAL_MS", 1000);
    config.poll_min = env_duration_ms("WALSHIP_POLL_MIN_MS", 50);
    config.poll_max = env_duration_ms("WALSHIP_POLL_MAX_MS", 500);

    walship_observability::init_metrics();

    let shutdown = ShutdownHandle::new();
    spawn_signal_listener(shutdown.clone());

    let forwarder = WalForwarder::new(config, Arc::new(JsonLinesAppender::new()));
    if let Err(e) = forwarder.run(shutdown).await {
        error!(error = %e, "sidecar exiting after pipeline failure");
        std::process::exit(1);
    }
}
