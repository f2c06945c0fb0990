// Ingestion tasks: one periodic task per probe feeding the queue, one log writer draining it.
// Probes never wait on the writer; the writer sleeps only while the queue is empty.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::time::{Duration, interval};
use tracing::{debug, error, info, warn};

use crate::daily_log::DailyLogWriter;
use crate::probes::{Probe, ScheduledProbe};
use crate::queue::IngestQueue;

/// Counters for the periodic "pipeline stats" line.
#[derive(Debug, Default)]
pub struct PipelineStats {
    pub written_total: AtomicU64,
    pub skipped_total: AtomicU64,
    pub probe_failures_total: AtomicU64,
    pub batches_total: AtomicU64,
}

impl PipelineStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn written(&self) -> u64 {
        self.written_total.load(Ordering::Relaxed)
    }

    pub fn skipped(&self) -> u64 {
        self.skipped_total.load(Ordering::Relaxed)
    }

    pub fn probe_failures(&self) -> u64 {
        self.probe_failures_total.load(Ordering::Relaxed)
    }
}

/// Runs `probe.poll()` on the blocking pool every `interval` and enqueues the result.
/// A failed poll is logged and skipped; the next tick tries again.
pub fn spawn_probe(
    scheduled: ScheduledProbe,
    queue: Arc<IngestQueue>,
    stats: Arc<PipelineStats>,
) -> tokio::task::JoinHandle<()> {
    let ScheduledProbe { probe, interval: every } = scheduled;
    let name = probe.name().to_string();
    let probe: Arc<Mutex<Box<dyn Probe>>> = Arc::new(Mutex::new(probe));

    tokio::spawn(async move {
        let mut tick = interval(every);
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            tick.tick().await;
            let probe = probe.clone();
            let result = tokio::task::spawn_blocking(move || {
                probe.lock().unwrap_or_else(PoisonError::into_inner).poll()
            })
            .await;
            match result {
                Ok(Ok(samples)) => queue.enqueue_all(samples),
                Ok(Err(e)) => {
                    stats.probe_failures_total.fetch_add(1, Ordering::Relaxed);
                    warn!(error = %e, probe = %name, operation = "poll", "probe failed");
                }
                Err(e) => {
                    stats.probe_failures_total.fetch_add(1, Ordering::Relaxed);
                    warn!(error = %e, probe = %name, operation = "poll", "probe task join failed");
                }
            }
        }
    })
}

/// Spawns the single daily-log writer. Each wakeup drains everything queued and appends
/// it as one batch. Returns `Err` on the first I/O failure; on `shutdown` it writes what
/// is still queued and returns `Ok`.
pub fn spawn_log_writer(
    queue: Arc<IngestQueue>,
    mut writer: DailyLogWriter,
    stats: Arc<PipelineStats>,
    mut shutdown_rx: tokio::sync::oneshot::Receiver<()>,
) -> tokio::task::JoinHandle<anyhow::Result<()>> {
    tokio::spawn(async move {
        loop {
            let batch = tokio::select! {
                batch = queue.wait_and_drain() => batch,
                _ = &mut shutdown_rx => {
                    let rest = queue.drain_all();
                    write_batch(&mut writer, &rest, &stats).await?;
                    debug!(samples_count = rest.len(), "log writer shutting down");
                    return Ok(());
                }
            };
            write_batch(&mut writer, &batch, &stats).await?;
        }
    })
}

async fn write_batch(
    writer: &mut DailyLogWriter,
    batch: &[crate::models::Sample],
    stats: &PipelineStats,
) -> anyhow::Result<()> {
    if batch.is_empty() {
        return Ok(());
    }
    match writer.append_batch(batch).await {
        Ok(report) => {
            stats
                .written_total
                .fetch_add(report.written as u64, Ordering::Relaxed);
            stats
                .skipped_total
                .fetch_add(report.skipped as u64, Ordering::Relaxed);
            stats.batches_total.fetch_add(1, Ordering::Relaxed);
            Ok(())
        }
        Err(e) => {
            error!(
                error = %e,
                path = %writer.path().display(),
                operation = "append_batch",
                "daily log write failed; stopping ingestion"
            );
            Err(e)
        }
    }
}

/// Logs queue and writer counters at INFO every `every`.
pub fn spawn_stats_logger(
    queue: Arc<IngestQueue>,
    stats: Arc<PipelineStats>,
    every: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut tick = interval(every);
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // First tick fires immediately; nothing to report yet.
        tick.tick().await;
        loop {
            tick.tick().await;
            info!(
                samples_enqueued_total = queue.enqueued_total(),
                samples_written_total = stats.written(),
                samples_skipped_total = stats.skipped(),
                probe_failures_total = stats.probe_failures(),
                batches_total = stats.batches_total.load(Ordering::Relaxed),
                queue_len = queue.len(),
                "pipeline stats"
            );
        }
    })
}
