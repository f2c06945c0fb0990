// Shared test helpers
#![allow(dead_code)]

use hwlog::models::*;

pub fn cpu(timestamp: f64, utilization: f64) -> Sample {
    CpuSample {
        timestamp,
        utilization,
        memory_free: 8000.0,
        memory_used: 4000.0,
        temperature: 45.0,
    }
    .into()
}

pub fn gpu(timestamp: f64, uuid: &str, utilization: f64) -> Sample {
    GpuSample {
        timestamp,
        name: "NVIDIA GeForce RTX 3090".into(),
        serial: "1324020012345".into(),
        uuid: uuid.into(),
        utilization_gpu: utilization,
        utilization_memory: 10.0,
        memory_free: 20_000,
        memory_used: 4_000,
        temperature_gpu: 55.0,
        power_draw: 120.0,
    }
    .into()
}

pub fn ping(timestamp: f64, destination: &str, ping_ms: f64) -> Sample {
    NetworkSample {
        timestamp,
        destination: destination.into(),
        ping_ms,
    }
    .into()
}

pub fn ups(timestamp: f64, serial: &str, status: &str, line_voltage: f64) -> Sample {
    UpsSample {
        timestamp,
        serial: serial.into(),
        line_voltage,
        status: status.into(),
        load_percent: 12.0,
        battery_voltage: 27.1,
        battery_percent: 100.0,
        output_current: 0.4,
        output_voltage: 230.0,
    }
    .into()
}

/// Newline-terminated log text for `samples`.
pub fn lines(samples: &[Sample]) -> String {
    samples
        .iter()
        .map(|s| format!("{}\n", s.to_line().unwrap()))
        .collect()
}
