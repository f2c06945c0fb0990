// UPS status via apcupsd's `apcaccess status` (`KEY : VALUE` lines, values carry units).

use std::collections::HashMap;
use std::process::Command;

use anyhow::Context;
use chrono::DateTime;
use tracing::warn;

use super::{Probe, now_timestamp};
use crate::config::UpsConfig;
use crate::models::{Sample, UpsSample};

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S %z";

/// Outcome of the plausibility checks on one reading.
#[derive(Debug, Clone, PartialEq)]
pub enum UpsHealth {
    Healthy,
    /// apcupsd stopped refreshing its report.
    Stale { age_secs: f64 },
    /// Mains reading outside the configured band while the UPS claims to be online.
    LineVoltageOutOfRange { line_voltage: f64 },
}

pub fn check_ups_health(sample: &UpsSample, now: f64, config: &UpsConfig) -> UpsHealth {
    let age_secs = now - sample.timestamp;
    if age_secs > config.max_staleness_secs as f64 {
        return UpsHealth::Stale { age_secs };
    }
    // On battery the mains reading is legitimately near zero.
    if sample.is_online()
        && !(config.min_line_voltage..=config.max_line_voltage).contains(&sample.line_voltage)
    {
        return UpsHealth::LineVoltageOutOfRange {
            line_voltage: sample.line_voltage,
        };
    }
    UpsHealth::Healthy
}

fn fields(output: &str) -> HashMap<&str, &str> {
    output
        .lines()
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim(), v.trim()))
        .collect()
}

/// Leading number of a value such as `230.0 Volts`.
fn number(fields: &HashMap<&str, &str>, key: &str) -> anyhow::Result<f64> {
    let raw = fields
        .get(key)
        .with_context(|| format!("apcaccess output has no {}", key))?;
    let value = raw.split_whitespace().next().unwrap_or_default();
    value
        .parse()
        .with_context(|| format!("{} {:?} is not a number", key, raw))
}

/// Parses one `apcaccess status` report. OUTPUTV is optional (NaN when absent);
/// the serial falls back to the APC header when SERIALNO is missing.
pub fn parse_apcaccess(output: &str) -> anyhow::Result<UpsSample> {
    let f = fields(output);
    // DATE contains ':' itself; take everything after the key's separator.
    let date = output
        .lines()
        .find_map(|line| {
            let (k, v) = line.split_once(':')?;
            (k.trim() == "DATE").then(|| v.trim())
        })
        .context("apcaccess output has no DATE")?;
    let timestamp = DateTime::parse_from_str(date, DATE_FORMAT)
        .with_context(|| format!("DATE {:?}", date))?;
    let serial = f
        .get("SERIALNO")
        .or_else(|| f.get("APC"))
        .copied()
        .unwrap_or_default()
        .to_string();
    let status = f
        .get("STATUS")
        .context("apcaccess output has no STATUS")?
        .to_string();
    Ok(UpsSample {
        timestamp: timestamp.timestamp() as f64,
        serial,
        line_voltage: number(&f, "LINEV")?,
        status,
        load_percent: number(&f, "LOADPCT")?,
        battery_voltage: number(&f, "BATTV")?,
        battery_percent: number(&f, "BCHARGE")?,
        output_current: number(&f, "OUTCURNT")?,
        output_voltage: number(&f, "OUTPUTV").unwrap_or(f64::NAN),
    })
}

pub struct UpsProbe {
    config: UpsConfig,
}

impl UpsProbe {
    pub fn new(config: UpsConfig) -> Self {
        Self { config }
    }
}

impl Probe for UpsProbe {
    fn name(&self) -> &str {
        "ups"
    }

    fn poll(&mut self) -> anyhow::Result<Vec<Sample>> {
        let (program, args) = self
            .config
            .command
            .split_first()
            .context("ups.command is empty")?;
        let output = Command::new(program)
            .args(args)
            .output()
            .with_context(|| format!("spawn {}", program))?;
        anyhow::ensure!(
            output.status.success(),
            "{} exited with {}: {}",
            program,
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        );
        let sample = parse_apcaccess(&String::from_utf8_lossy(&output.stdout))?;
        match check_ups_health(&sample, now_timestamp(), &self.config) {
            UpsHealth::Healthy => Ok(vec![sample.into()]),
            health => {
                warn!(
                    serial = %sample.serial,
                    health = ?health,
                    operation = "ups_health",
                    "discarding implausible ups reading"
                );
                Ok(Vec::new())
            }
        }
    }
}
