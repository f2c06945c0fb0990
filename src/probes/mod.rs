// Probe adapters: each one turns a hardware or network source into Samples.
// poll() is blocking; the worker calls it on the blocking pool, one task per probe.

mod cpu;
mod gpu;
mod linux;
mod network;
mod ups;

use std::time::Duration;

use tracing::{info, warn};

use crate::config::AppConfig;
use crate::models::Sample;

pub use cpu::CpuProbe;
pub use gpu::{GpuProbe, parse_gpu_line};
pub use linux::parse_default_gateway;
pub use network::{PingProbe, parse_ping_ms};
pub use ups::{UpsHealth, UpsProbe, check_ups_health, parse_apcaccess};

pub trait Probe: Send + 'static {
    fn name(&self) -> &str;

    /// Zero or more samples for this cycle. `Ok(vec![])` is a normal outcome (nothing
    /// to report, or a reading discarded by a health check); `Err` is a transient
    /// failure that is logged and retried next cycle.
    fn poll(&mut self) -> anyhow::Result<Vec<Sample>>;
}

/// A probe with its own cadence.
pub struct ScheduledProbe {
    pub probe: Box<dyn Probe>,
    pub interval: Duration,
}

impl ScheduledProbe {
    pub fn new(probe: impl Probe, interval: Duration) -> Self {
        Self {
            probe: Box::new(probe),
            interval,
        }
    }
}

pub(crate) fn now_timestamp() -> f64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or_else(|e| {
            warn!(error = %e, operation = "get_timestamp", "system time error");
            0.0
        })
}

/// Builds the enabled probes from config. The network probe gets one instance per
/// destination so a dead host cannot stall the others.
pub fn from_config(config: &AppConfig) -> Vec<ScheduledProbe> {
    let p = &config.probes;
    let mut out = Vec::new();

    if p.cpu_enabled {
        out.push(ScheduledProbe::new(
            CpuProbe::new(),
            Duration::from_millis(p.cpu_interval_ms),
        ));
    }
    if p.gpu_enabled {
        out.push(ScheduledProbe::new(
            GpuProbe::new(),
            Duration::from_millis(p.gpu_interval_ms),
        ));
    }
    if p.network_enabled {
        let mut destinations = config.network.destinations.clone();
        if config.network.include_default_gateway {
            match linux::read_default_gateway() {
                Some(gw) => destinations.insert(0, gw.to_string()),
                None => warn!("no default gateway found; not pinging it"),
            }
        }
        for destination in destinations {
            out.push(ScheduledProbe::new(
                PingProbe::new(destination, config.network.ping_timeout_secs),
                Duration::from_millis(p.network_interval_ms),
            ));
        }
    }
    if p.ups_enabled {
        out.push(ScheduledProbe::new(
            UpsProbe::new(config.ups.clone()),
            Duration::from_millis(p.ups_interval_ms),
        ));
    }

    info!(
        probes = ?out.iter().map(|s| s.probe.name().to_string()).collect::<Vec<_>>(),
        "probes configured"
    );
    out
}
