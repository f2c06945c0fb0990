use std::str::FromStr;

use serde::Deserialize;

use crate::aggregation::DayBucketing;
use crate::daily_log::LogPaths;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub logs: LogsConfig,
    #[serde(default)]
    pub probes: ProbesConfig,
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub ups: UpsConfig,
    #[serde(default)]
    pub rollover: RolloverConfig,
    #[serde(default)]
    pub monitoring: MonitoringConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogsConfig {
    /// Raw samples for the current day, one JSON object per line.
    pub daily_path: String,
    /// Aggregated history, one JSON object per line.
    pub bulk_path: String,
    /// Defaults to `<daily_path>.bak`.
    #[serde(default)]
    pub backup_path: Option<String>,
}

impl LogsConfig {
    pub fn paths(&self) -> LogPaths {
        let paths = LogPaths::new(&self.daily_path, &self.bulk_path);
        match &self.backup_path {
            Some(backup) => paths.with_backup(backup),
            None => paths,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProbesConfig {
    #[serde(default = "default_true")]
    pub cpu_enabled: bool,
    #[serde(default = "default_fast_interval_ms")]
    pub cpu_interval_ms: u64,
    #[serde(default)]
    pub gpu_enabled: bool,
    #[serde(default = "default_fast_interval_ms")]
    pub gpu_interval_ms: u64,
    #[serde(default = "default_true")]
    pub network_enabled: bool,
    #[serde(default = "default_fast_interval_ms")]
    pub network_interval_ms: u64,
    #[serde(default)]
    pub ups_enabled: bool,
    #[serde(default = "default_ups_interval_ms")]
    pub ups_interval_ms: u64,
}

impl Default for ProbesConfig {
    fn default() -> Self {
        Self {
            cpu_enabled: true,
            cpu_interval_ms: default_fast_interval_ms(),
            gpu_enabled: false,
            gpu_interval_ms: default_fast_interval_ms(),
            network_enabled: true,
            network_interval_ms: default_fast_interval_ms(),
            ups_enabled: false,
            ups_interval_ms: default_ups_interval_ms(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_fast_interval_ms() -> u64 {
    1000
}

fn default_ups_interval_ms() -> u64 {
    60_000
}

#[derive(Debug, Clone, Deserialize)]
pub struct NetworkConfig {
    /// Hosts pinged every cycle, one sample per host.
    #[serde(default = "default_destinations")]
    pub destinations: Vec<String>,
    /// Also ping the default IPv4 gateway (Linux only).
    #[serde(default = "default_true")]
    pub include_default_gateway: bool,
    #[serde(default = "default_ping_timeout_secs")]
    pub ping_timeout_secs: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            destinations: default_destinations(),
            include_default_gateway: true,
            ping_timeout_secs: default_ping_timeout_secs(),
        }
    }
}

fn default_destinations() -> Vec<String> {
    vec!["www.google.com".into()]
}

fn default_ping_timeout_secs() -> u64 {
    5
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpsConfig {
    /// apcupsd status command; its stdout is `KEY : VALUE` lines.
    #[serde(default = "default_ups_command")]
    pub command: Vec<String>,
    /// Reports whose DATE is older than this are discarded.
    #[serde(default = "default_max_staleness_secs")]
    pub max_staleness_secs: u64,
    #[serde(default = "default_min_line_voltage")]
    pub min_line_voltage: f64,
    #[serde(default = "default_max_line_voltage")]
    pub max_line_voltage: f64,
}

impl Default for UpsConfig {
    fn default() -> Self {
        Self {
            command: default_ups_command(),
            max_staleness_secs: default_max_staleness_secs(),
            min_line_voltage: default_min_line_voltage(),
            max_line_voltage: default_max_line_voltage(),
        }
    }
}

fn default_ups_command() -> Vec<String> {
    vec!["apcaccess".into(), "status".into()]
}

fn default_max_staleness_secs() -> u64 {
    300
}

fn default_min_line_voltage() -> f64 {
    80.0
}

fn default_max_line_voltage() -> f64 {
    280.0
}

#[derive(Debug, Clone, Deserialize)]
pub struct RolloverConfig {
    /// Six-field cron expression (sec min hour day month weekday), local time.
    #[serde(default = "default_rollover_schedule")]
    pub schedule: String,
    #[serde(default)]
    pub day_bucketing: DayBucketing,
}

impl Default for RolloverConfig {
    fn default() -> Self {
        Self {
            schedule: default_rollover_schedule(),
            day_bucketing: DayBucketing::default(),
        }
    }
}

fn default_rollover_schedule() -> String {
    "0 0 0 * * *".into()
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonitoringConfig {
    /// How often to log pipeline stats (enqueued/written/skipped) at INFO level.
    #[serde(default = "default_stats_log_interval_secs")]
    pub stats_log_interval_secs: u64,
    /// How often live viewers re-read the daily log.
    #[serde(default = "default_tail_poll_interval_ms")]
    pub tail_poll_interval_ms: u64,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            stats_log_interval_secs: default_stats_log_interval_secs(),
            tail_poll_interval_ms: default_tail_poll_interval_ms(),
        }
    }
}

fn default_stats_log_interval_secs() -> u64 {
    60
}

fn default_tail_poll_interval_ms() -> u64 {
    500
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".into());
        let s = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("read config {}: {}", path, e))?;
        Self::load_from_str(&s)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn rollover_schedule(&self) -> anyhow::Result<cron::Schedule> {
        cron::Schedule::from_str(&self.rollover.schedule).map_err(|e| {
            anyhow::anyhow!(
                "rollover.schedule {:?} is not a valid cron expression: {}",
                self.rollover.schedule,
                e
            )
        })
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            !self.logs.daily_path.is_empty(),
            "logs.daily_path must be non-empty"
        );
        anyhow::ensure!(
            !self.logs.bulk_path.is_empty(),
            "logs.bulk_path must be non-empty"
        );
        let paths = self.logs.paths();
        anyhow::ensure!(
            paths.daily != paths.bulk && paths.daily != paths.backup && paths.bulk != paths.backup,
            "logs.daily_path, logs.bulk_path and logs.backup_path must all differ"
        );
        anyhow::ensure!(
            self.probes.cpu_interval_ms > 0,
            "probes.cpu_interval_ms must be > 0, got {}",
            self.probes.cpu_interval_ms
        );
        anyhow::ensure!(
            self.probes.gpu_interval_ms > 0,
            "probes.gpu_interval_ms must be > 0, got {}",
            self.probes.gpu_interval_ms
        );
        anyhow::ensure!(
            self.probes.network_interval_ms > 0,
            "probes.network_interval_ms must be > 0, got {}",
            self.probes.network_interval_ms
        );
        anyhow::ensure!(
            self.probes.ups_interval_ms > 0,
            "probes.ups_interval_ms must be > 0, got {}",
            self.probes.ups_interval_ms
        );
        anyhow::ensure!(
            self.network.ping_timeout_secs > 0,
            "network.ping_timeout_secs must be > 0, got {}",
            self.network.ping_timeout_secs
        );
        anyhow::ensure!(
            !self.probes.network_enabled
                || self.network.include_default_gateway
                || !self.network.destinations.is_empty(),
            "network.destinations must be non-empty when the network probe is enabled without the default gateway"
        );
        anyhow::ensure!(
            !self.ups.command.is_empty(),
            "ups.command must be non-empty"
        );
        anyhow::ensure!(
            self.ups.min_line_voltage < self.ups.max_line_voltage,
            "ups.min_line_voltage must be < ups.max_line_voltage, got {} >= {}",
            self.ups.min_line_voltage,
            self.ups.max_line_voltage
        );
        self.rollover_schedule()?;
        anyhow::ensure!(
            self.monitoring.stats_log_interval_secs > 0,
            "monitoring.stats_log_interval_secs must be > 0, got {}",
            self.monitoring.stats_log_interval_secs
        );
        anyhow::ensure!(
            self.monitoring.tail_poll_interval_ms > 0,
            "monitoring.tail_poll_interval_ms must be > 0, got {}",
            self.monitoring.tail_poll_interval_ms
        );
        Ok(())
    }
}
