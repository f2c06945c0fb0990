use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use hwlog::*;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_timer(LocalTimer)
        .with_env_filter(filter)
        .init();

    let app_config = config::AppConfig::load()?;
    tracing::info!(version = version::VERSION, "{} starting", version::banner());

    match std::env::args().nth(1).as_deref() {
        None => run_daemon(app_config).await,
        Some("rollover") => {
            // One-shot pass, e.g. from a system timer when the daemon is not running.
            let report = rollover_worker::run_rollover(
                &app_config.logs.paths(),
                app_config.rollover.day_bucketing,
                None,
                &chrono::Local::now(),
            )
            .await?;
            tracing::info!(
                samples_read = report.samples_read,
                aggregates_written = report.aggregates_written,
                "one-shot rollover done"
            );
            Ok(())
        }
        Some(other) => anyhow::bail!("unknown command {:?}; expected no argument or \"rollover\"", other),
    }
}

async fn run_daemon(app_config: config::AppConfig) -> Result<()> {
    let paths = app_config.logs.paths();
    let writer = daily_log::DailyLogWriter::open(&paths.daily).await?;
    let write_lock = writer.write_lock();
    tracing::info!(
        daily = %paths.daily.display(),
        bulk = %paths.bulk.display(),
        backup = %paths.backup.display(),
        "logging to"
    );

    let queue = Arc::new(queue::IngestQueue::new());
    let stats = Arc::new(worker::PipelineStats::new());
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();

    let mut writer_handle =
        worker::spawn_log_writer(queue.clone(), writer, stats.clone(), shutdown_rx);

    let probes = probes::from_config(&app_config);
    if probes.is_empty() {
        tracing::warn!("no probes enabled; the daily log will stay empty");
    }
    let probe_handles: Vec<_> = probes
        .into_iter()
        .map(|p| worker::spawn_probe(p, queue.clone(), stats.clone()))
        .collect();

    let rollover_handle = rollover_worker::spawn(
        rollover_worker::RolloverWorkerConfig {
            paths,
            schedule: app_config.rollover_schedule()?,
            day_bucketing: app_config.rollover.day_bucketing,
        },
        write_lock,
    );
    let stats_handle = worker::spawn_stats_logger(
        queue.clone(),
        stats.clone(),
        Duration::from_secs(app_config.monitoring.stats_log_interval_secs),
    );

    let outcome = tokio::select! {
        result = &mut writer_handle => {
            // The writer only returns on an I/O failure; ingestion cannot continue.
            match result {
                Ok(Ok(())) => Err(anyhow::anyhow!("log writer stopped unexpectedly")),
                Ok(Err(e)) => Err(e),
                Err(e) => Err(anyhow::anyhow!("log writer task: {}", e)),
            }
        }
        _ = shutdown_signal() => {
            tracing::info!("Received shutdown signal");
            for handle in &probe_handles {
                handle.abort();
            }
            rollover_handle.abort();
            let _ = shutdown_tx.send(());
            match writer_handle.await {
                Ok(result) => result,
                Err(e) => Err(anyhow::anyhow!("log writer task: {}", e)),
            }
        }
    };
    stats_handle.abort();
    tracing::info!(
        samples_enqueued_total = queue.enqueued_total(),
        samples_written_total = stats.written(),
        "stopped"
    );
    outcome
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        let mut sigterm =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(s) => s,
                Err(_) => {
                    let _ = tokio::signal::ctrl_c().await;
                    return;
                }
            };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
