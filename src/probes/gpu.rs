// NVIDIA GPUs via nvidia-smi CSV queries, one sample per GPU per poll.

use std::process::Command;

use anyhow::Context;
use chrono::{Local, NaiveDateTime, TimeZone};

use super::Probe;
use crate::models::{GpuSample, Sample};

const QUERY: &str = "--query-gpu=timestamp,name,serial,uuid,utilization.gpu,utilization.memory,\
memory.free,memory.used,temperature.gpu,power.draw";

const TIMESTAMP_FORMAT: &str = "%Y/%m/%d %H:%M:%S%.3f";

pub struct GpuProbe {
    program: String,
}

impl Default for GpuProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl GpuProbe {
    pub fn new() -> Self {
        Self {
            program: "nvidia-smi".into(),
        }
    }
}

/// Float field; `[N/A]`, `[Not Supported]` and the like read as NaN.
fn parse_float(value: &str) -> f64 {
    value.trim().parse().unwrap_or(f64::NAN)
}

/// One line of `--format=csv,noheader,nounits` output for [`QUERY`].
/// The timestamp column is host-local time.
pub fn parse_gpu_line(line: &str) -> anyhow::Result<GpuSample> {
    let values: Vec<&str> = line.split(',').map(str::trim).collect();
    anyhow::ensure!(
        values.len() == 10,
        "expected 10 columns, got {}: {:?}",
        values.len(),
        line
    );
    let naive = NaiveDateTime::parse_from_str(values[0], TIMESTAMP_FORMAT)
        .with_context(|| format!("gpu timestamp {:?}", values[0]))?;
    let timestamp = Local
        .from_local_datetime(&naive)
        .earliest()
        .with_context(|| format!("gpu timestamp {:?} is not a valid local time", values[0]))?;
    Ok(GpuSample {
        timestamp: timestamp.timestamp_micros() as f64 / 1e6,
        name: values[1].to_string(),
        serial: values[2].to_string(),
        uuid: values[3].to_string(),
        utilization_gpu: parse_float(values[4]),
        utilization_memory: parse_float(values[5]),
        memory_free: values[6]
            .parse()
            .with_context(|| format!("memory.free {:?}", values[6]))?,
        memory_used: values[7]
            .parse()
            .with_context(|| format!("memory.used {:?}", values[7]))?,
        temperature_gpu: parse_float(values[8]),
        power_draw: parse_float(values[9]),
    })
}

impl Probe for GpuProbe {
    fn name(&self) -> &str {
        "gpu"
    }

    fn poll(&mut self) -> anyhow::Result<Vec<Sample>> {
        let output = Command::new(&self.program)
            .args([QUERY, "--format=csv,noheader,nounits"])
            .output()
            .with_context(|| format!("spawn {}", self.program))?;
        anyhow::ensure!(
            output.status.success(),
            "{} exited with {}: {}",
            self.program,
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        );
        String::from_utf8_lossy(&output.stdout)
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(|l| parse_gpu_line(l).map(Sample::from))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_line() {
        let line = "2024/05/01 12:00:00.250, NVIDIA GeForce RTX 3090, 1324020012345, \
                    GPU-abc, 37, 12, 20000, 4576, 55, 120.50";
        let s = parse_gpu_line(line).unwrap();
        assert_eq!(s.name, "NVIDIA GeForce RTX 3090");
        assert_eq!(s.uuid, "GPU-abc");
        assert_eq!(s.utilization_gpu, 37.0);
        assert_eq!(s.memory_free, 20000);
        assert_eq!(s.memory_used, 4576);
        assert_eq!(s.power_draw, 120.5);
        let expected = Local
            .with_ymd_and_hms(2024, 5, 1, 12, 0, 0)
            .earliest()
            .unwrap()
            .timestamp() as f64
            + 0.25;
        assert!((s.timestamp - expected).abs() < 1e-6);
    }

    #[test]
    fn not_available_reads_as_nan() {
        let line = "2024/05/01 12:00:00.000, GPU, [N/A], GPU-x, [N/A], 0, 100, 1, 40, [N/A]";
        let s = parse_gpu_line(line).unwrap();
        assert_eq!(s.serial, "[N/A]");
        assert!(s.utilization_gpu.is_nan());
        assert!(s.power_draw.is_nan());
        assert_eq!(s.temperature_gpu, 40.0);
    }

    #[test]
    fn rejects_short_line() {
        assert!(parse_gpu_line("2024/05/01 12:00:00.000, GPU").is_err());
    }
}
