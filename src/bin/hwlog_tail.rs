// Live viewer: follows the daemon's files from a second process.
//
// Usage: hwlog-tail [--once]
//   --once  refresh a single time, print per-series counts as JSON and exit
//
// Reads the same config.toml as the daemon (CONFIG_FILE overrides the path).

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use hwlog::config::AppConfig;
use hwlog::store::{self, SharedStore, TelemetryStore};
use hwlog::version;
use tracing_subscriber::EnvFilter;

fn sizes<T>(series: &BTreeMap<String, Vec<T>>) -> serde_json::Value {
    series
        .iter()
        .map(|(key, items)| (key.clone(), items.len().into()))
        .collect::<serde_json::Map<String, serde_json::Value>>()
        .into()
}

fn summary(store: &TelemetryStore) -> serde_json::Value {
    let samples = store.sample_series();
    let aggregates = store.aggregate_series(None);
    serde_json::json!({
        "samples": {
            "cpu": samples.cpu.len(),
            "gpu": sizes(&samples.gpu),
            "network": sizes(&samples.network),
            "ups": sizes(&samples.ups),
        },
        "aggregates": {
            "cpu": aggregates.cpu.len(),
            "gpu": sizes(&aggregates.gpu),
            "network": sizes(&aggregates.network),
            "ups": sizes(&aggregates.ups),
        },
        "skipped_lines": store.live().skipped_lines(),
        "resets": store.live().resets(),
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let once = std::env::args().any(|a| a == "--once");
    let app_config = AppConfig::load()?;
    let mut telemetry = TelemetryStore::new(app_config.logs.paths());

    if once {
        telemetry.refresh()?;
        println!("{}", serde_json::to_string_pretty(&summary(&telemetry))?);
        return Ok(());
    }

    tracing::info!("{} tail viewer", version::banner());
    let shared: SharedStore = Arc::new(Mutex::new(telemetry));
    let _refresher = store::spawn_refresher(
        shared.clone(),
        Duration::from_millis(app_config.monitoring.tail_poll_interval_ms),
    );

    let mut tick = tokio::time::interval(Duration::from_secs(
        app_config.monitoring.stats_log_interval_secs,
    ));
    tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            _ = tick.tick() => {
                let snapshot = summary(&shared.lock().unwrap_or_else(PoisonError::into_inner));
                tracing::info!(series = %snapshot, "telemetry");
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }
    Ok(())
}
