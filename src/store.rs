// Read side for live viewers: today's samples (rollover backup + tailed daily log) and
// the aggregate history from the bulk log, grouped the way charts consume them.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tracing::{debug, warn};

use crate::aggregation::{group_by_key, group_by_type};
use crate::cache::HashGuarded;
use crate::daily_log::{self, LogPaths, TailState};
use crate::models::{
    AggregateRecord, CpuAggregate, CpuSample, GpuAggregate, GpuSample, NetworkAggregate,
    NetworkSample, Sample, SampleKind, UpsAggregate, UpsSample,
};

/// Inclusive window in epoch seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeRange {
    pub start: f64,
    pub end: f64,
}

impl TimeRange {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, timestamp: f64) -> bool {
        timestamp >= self.start && timestamp <= self.end
    }
}

/// Samples split by type and entity.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SampleSeries {
    pub cpu: Vec<CpuSample>,
    pub gpu: BTreeMap<String, Vec<GpuSample>>,
    pub network: BTreeMap<String, Vec<NetworkSample>>,
    pub ups: BTreeMap<String, Vec<UpsSample>>,
}

impl SampleSeries {
    pub fn from_samples(samples: impl IntoIterator<Item = Sample>) -> Self {
        let mut series = SampleSeries::default();
        for (_, items) in group_by_type(samples) {
            for (key, group) in group_by_key(items) {
                for sample in group {
                    match sample {
                        Sample::Cpu(s) => series.cpu.push(s),
                        Sample::Gpu(s) => series.gpu.entry(key.clone()).or_default().push(s),
                        Sample::Network(s) => {
                            series.network.entry(key.clone()).or_default().push(s)
                        }
                        Sample::Ups(s) => series.ups.entry(key.clone()).or_default().push(s),
                    }
                }
            }
        }
        series
    }
}

/// Aggregates split by type and entity.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct AggregateSeries {
    pub cpu: Vec<CpuAggregate>,
    pub gpu: BTreeMap<String, Vec<GpuAggregate>>,
    pub network: BTreeMap<String, Vec<NetworkAggregate>>,
    pub ups: BTreeMap<String, Vec<UpsAggregate>>,
}

impl AggregateSeries {
    pub fn from_records(records: impl IntoIterator<Item = AggregateRecord>) -> Self {
        let mut series = AggregateSeries::default();
        for (_, items) in group_by_type(records) {
            for (key, group) in group_by_key(items) {
                for record in group {
                    match record {
                        AggregateRecord::Cpu(a) => series.cpu.push(a),
                        AggregateRecord::Gpu(a) => {
                            series.gpu.entry(key.clone()).or_default().push(a)
                        }
                        AggregateRecord::Network(a) => {
                            series.network.entry(key.clone()).or_default().push(a)
                        }
                        AggregateRecord::Ups(a) => {
                            series.ups.entry(key.clone()).or_default().push(a)
                        }
                    }
                }
            }
        }
        series
    }
}

/// Drops repeated `(type, key, timestamp)` rows, which a re-run rollover can append.
/// First occurrence wins; order is otherwise kept.
pub fn dedup_aggregates(
    records: impl IntoIterator<Item = AggregateRecord>,
) -> Vec<AggregateRecord> {
    let mut seen: HashSet<(SampleKind, String, u64)> = HashSet::new();
    records
        .into_iter()
        .filter(|r| {
            seen.insert((r.kind(), r.group_key().to_string(), r.timestamp().to_bits()))
        })
        .collect()
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RefreshReport {
    pub new_samples: usize,
    pub backup_reloaded: bool,
    pub bulk_reloaded: bool,
    /// The daily log still starts with every backup line (rollover not yet truncated).
    pub backup_shadowed: bool,
}

/// One viewer's cached view of a pipeline's files.
pub struct TelemetryStore {
    paths: LogPaths,
    live: TailState,
    backup: HashGuarded<Vec<Sample>>,
    bulk: HashGuarded<Vec<AggregateRecord>>,
    backup_shadowed: bool,
    /// False while the live log is a strict prefix of the backup and could still grow
    /// into a full copy of it.
    overlap_settled: bool,
    live_resets_seen: u64,
}

fn same_line(a: &Sample, b: &Sample) -> bool {
    matches!((a.to_line(), b.to_line()), (Ok(x), Ok(y)) if x == y)
}

fn is_not_found(e: &anyhow::Error) -> bool {
    e.chain()
        .filter_map(|c| c.downcast_ref::<std::io::Error>())
        .any(|io| io.kind() == std::io::ErrorKind::NotFound)
}

/// Reloads a closed file through its hash guard. A missing file reads as empty.
fn refresh_closed<T>(
    guard: &mut HashGuarded<Vec<T>>,
    load: impl FnOnce(&std::path::Path) -> anyhow::Result<Vec<T>>,
) -> anyhow::Result<bool> {
    match guard.get_or_load(load) {
        Ok((_, reloaded)) => Ok(reloaded),
        Err(e) if is_not_found(&e) => {
            let had_value = guard.value().is_some();
            guard.invalidate();
            Ok(had_value)
        }
        Err(e) => Err(e),
    }
}

impl TelemetryStore {
    pub fn new(paths: LogPaths) -> Self {
        let backup = HashGuarded::new(paths.backup.clone());
        let bulk = HashGuarded::new(paths.bulk.clone());
        Self {
            paths,
            live: TailState::new(),
            backup,
            bulk,
            backup_shadowed: false,
            overlap_settled: false,
            live_resets_seen: 0,
        }
    }

    pub fn paths(&self) -> &LogPaths {
        &self.paths
    }

    pub fn live(&self) -> &TailState {
        &self.live
    }

    /// Tails the daily log and reloads the backup and bulk log if their content changed.
    pub fn refresh(&mut self) -> anyhow::Result<RefreshReport> {
        let new_samples = daily_log::read_new(&self.paths.daily, &mut self.live)?;
        let backup_reloaded = refresh_closed(&mut self.backup, |p| {
            daily_log::read_samples(p).map(|(samples, _)| samples)
        })?;
        let bulk_reloaded = refresh_closed(&mut self.bulk, |p| {
            daily_log::read_aggregates(p).map(|(records, _)| records)
        })?;

        if backup_reloaded || self.live.resets() != self.live_resets_seen {
            self.live_resets_seen = self.live.resets();
            self.overlap_settled = false;
        }
        if !self.overlap_settled {
            self.check_backup_overlap();
        }

        Ok(RefreshReport {
            new_samples,
            backup_reloaded,
            bulk_reloaded,
            backup_shadowed: self.backup_shadowed,
        })
    }

    /// The daily log is only ever appended to or truncated to zero, so it either starts
    /// with the whole backup (copied, not yet truncated) or shares nothing with it.
    fn check_backup_overlap(&mut self) {
        let backup = self.backup.value().map(Vec::as_slice).unwrap_or_default();
        let live = self.live.records();
        if backup.is_empty() {
            self.backup_shadowed = false;
            self.overlap_settled = true;
            return;
        }
        let n = backup.len().min(live.len());
        let prefix_matches = backup[..n]
            .iter()
            .zip(&live[..n])
            .all(|(a, b)| same_line(a, b));
        let covered = live.len() >= backup.len();
        self.backup_shadowed = prefix_matches && covered;
        self.overlap_settled = !prefix_matches || covered;
        if self.backup_shadowed {
            debug!(
                backup_samples = backup.len(),
                "daily log still holds the backup; serving it from the live log only"
            );
        }
    }

    fn today(&self) -> impl Iterator<Item = &Sample> {
        self.backup
            .value()
            .filter(|_| !self.backup_shadowed)
            .into_iter()
            .flatten()
            .chain(self.live.records())
    }

    /// Samples of one type, backup first then the live log, each in file order. A backup
    /// the daily log still contains is not counted twice.
    pub fn get_samples(&self, kind: SampleKind) -> Vec<Sample> {
        self.today().filter(|s| s.kind() == kind).cloned().collect()
    }

    pub fn sample_series(&self) -> SampleSeries {
        SampleSeries::from_samples(self.today().cloned())
    }

    /// Aggregates of one type ordered by timestamp, deduplicated; `None` = all history.
    pub fn get_aggregates(
        &self,
        kind: SampleKind,
        range: Option<TimeRange>,
    ) -> Vec<AggregateRecord> {
        let mut out = dedup_aggregates(
            self.bulk
                .value()
                .into_iter()
                .flatten()
                .filter(|r| r.kind() == kind)
                .filter(|r| range.is_none_or(|tr| tr.contains(r.timestamp())))
                .cloned(),
        );
        out.sort_by(|a, b| a.timestamp().total_cmp(&b.timestamp()));
        out
    }

    pub fn aggregate_series(&self, range: Option<TimeRange>) -> AggregateSeries {
        AggregateSeries::from_records(
            SampleKind::ALL
                .into_iter()
                .flat_map(|kind| self.get_aggregates(kind, range)),
        )
    }
}

/// Shared store for in-process viewers; the mutex guards the accumulated caches.
pub type SharedStore = Arc<Mutex<TelemetryStore>>;

/// Refreshes `store` every `interval` on the blocking pool. Errors are logged and retried.
pub fn spawn_refresher(store: SharedStore, interval: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(interval);
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            tick.tick().await;
            let store = store.clone();
            let result = tokio::task::spawn_blocking(move || {
                store
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .refresh()
            })
            .await;
            match result {
                Ok(Ok(report)) => {
                    if report.new_samples > 0 || report.backup_reloaded || report.bulk_reloaded {
                        debug!(
                            new_samples = report.new_samples,
                            backup_reloaded = report.backup_reloaded,
                            bulk_reloaded = report.bulk_reloaded,
                            "store refreshed"
                        );
                    }
                }
                Ok(Err(e)) => warn!(error = %e, operation = "refresh_store", "store refresh failed"),
                Err(e) => warn!(error = %e, operation = "refresh_store", "refresh task join failed"),
            }
        }
    })
}
