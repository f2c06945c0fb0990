// CPU utilization, memory and temperature via sysinfo

use sysinfo::{Components, System};

use super::{Probe, now_timestamp};
use crate::models::{CpuSample, Sample};

const MIB: f64 = 1024.0 * 1024.0;

/// Sensor labels that belong to the CPU package or its cores.
const CPU_SENSOR_HINTS: [&str; 6] = ["coretemp", "package", "core", "cpu", "k10temp", "tctl"];

pub struct CpuProbe {
    sys: System,
    components: Components,
}

impl Default for CpuProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl CpuProbe {
    pub fn new() -> Self {
        let mut sys = System::new();
        // First usage reading needs a baseline refresh.
        sys.refresh_cpu_usage();
        Self {
            sys,
            components: Components::new_with_refreshed_list(),
        }
    }

    /// Mean over CPU sensors; NaN when the host exposes none.
    fn temperature(&mut self) -> f64 {
        self.components.refresh(false);
        let temps: Vec<f64> = self
            .components
            .iter()
            .filter(|c| {
                let label = c.label().to_lowercase();
                CPU_SENSOR_HINTS.iter().any(|h| label.contains(h))
            })
            .filter_map(|c| c.temperature())
            .map(f64::from)
            .filter(|t| *t > 0.0)
            .collect();
        if temps.is_empty() {
            return f64::NAN;
        }
        temps.iter().sum::<f64>() / temps.len() as f64
    }
}

impl Probe for CpuProbe {
    fn name(&self) -> &str {
        "cpu"
    }

    fn poll(&mut self) -> anyhow::Result<Vec<Sample>> {
        self.sys.refresh_cpu_usage();
        self.sys.refresh_memory();
        let utilization = (self.sys.global_cpu_usage() as f64).clamp(0.0, 100.0);
        let sample = CpuSample {
            timestamp: now_timestamp(),
            utilization,
            memory_free: self.sys.free_memory() as f64 / MIB,
            memory_used: self.sys.used_memory() as f64 / MIB,
            temperature: self.temperature(),
        };
        Ok(vec![sample.into()])
    }
}
