// Daily rollover: daily log -> backup -> aggregates appended to the bulk log -> truncate.
// Runs on a cron schedule in local time; the next wakeup is recomputed from the wall clock
// after every cycle.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::{DateTime, Local, TimeZone};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{error, info, instrument};

use crate::aggregation::{self, DayBucketing};
use crate::daily_log::{self, LogPaths};

/// Upper bound on one sleep, so a wall-clock jump is noticed within a minute.
const MAX_SLEEP: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RolloverState {
    Idle { next_wakeup: DateTime<Local> },
    RollingOver,
}

pub struct RolloverScheduler {
    schedule: cron::Schedule,
    state: RolloverState,
}

impl RolloverScheduler {
    pub fn new(schedule: cron::Schedule, now: DateTime<Local>) -> Self {
        let next_wakeup = next_after(&schedule, &now);
        Self {
            schedule,
            state: RolloverState::Idle { next_wakeup },
        }
    }

    pub fn state(&self) -> &RolloverState {
        &self.state
    }

    pub fn is_due(&self, now: &DateTime<Local>) -> bool {
        matches!(&self.state, RolloverState::Idle { next_wakeup } if now >= next_wakeup)
    }

    /// Idle -> RollingOver. Returns false if already rolling over.
    pub fn begin(&mut self) -> bool {
        if self.state == RolloverState::RollingOver {
            return false;
        }
        self.state = RolloverState::RollingOver;
        true
    }

    /// RollingOver -> Idle, with the next wakeup taken from `now`, not from the previous one.
    pub fn finish(&mut self, now: DateTime<Local>) -> DateTime<Local> {
        let next_wakeup = next_after(&self.schedule, &now);
        self.state = RolloverState::Idle { next_wakeup };
        next_wakeup
    }

    /// Time left until the next wakeup; zero when due or rolling over.
    pub fn delay_until_due(&self, now: &DateTime<Local>) -> Duration {
        match &self.state {
            RolloverState::Idle { next_wakeup } => {
                (*next_wakeup - *now).to_std().unwrap_or(Duration::ZERO)
            }
            RolloverState::RollingOver => Duration::ZERO,
        }
    }
}

/// A schedule with no future occurrence (e.g. a fixed past year) falls back to a day out.
fn next_after(schedule: &cron::Schedule, now: &DateTime<Local>) -> DateTime<Local> {
    schedule
        .after(now)
        .next()
        .unwrap_or_else(|| *now + chrono::Duration::hours(24))
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RolloverReport {
    pub samples_read: usize,
    pub lines_skipped: usize,
    pub aggregates_written: usize,
}

/// One rollover pass. Every step must succeed or the pass stops, leaving the daily log
/// untouched for the next attempt. A crash after the bulk append re-appends the same
/// aggregates on the next pass; readers drop those rows by (type, key, timestamp).
///
/// `write_lock` is the daily log writer's lock when running inside the daemon; holding it
/// keeps appends out of the window between the backup copy and the truncate.
#[instrument(skip(paths, write_lock, now), fields(daily = %paths.daily.display(), bulk = %paths.bulk.display()))]
pub async fn run_rollover<Tz: TimeZone>(
    paths: &LogPaths,
    policy: DayBucketing,
    write_lock: Option<Arc<Mutex<()>>>,
    now: &DateTime<Tz>,
) -> anyhow::Result<RolloverReport> {
    let _guard = match &write_lock {
        Some(lock) => Some(lock.lock().await),
        None => None,
    };

    if !tokio::fs::try_exists(&paths.daily)
        .await
        .with_context(|| format!("stat {}", paths.daily.display()))?
    {
        info!("no daily log yet; nothing to roll over");
        return Ok(RolloverReport::default());
    }

    // 1. backup
    tokio::fs::copy(&paths.daily, &paths.backup)
        .await
        .with_context(|| {
            format!(
                "copy {} to {}",
                paths.daily.display(),
                paths.backup.display()
            )
        })?;

    // 2. read + parse
    let bytes = tokio::fs::read(&paths.backup)
        .await
        .with_context(|| format!("read {}", paths.backup.display()))?;
    let (samples, parse) = daily_log::parse_samples(&String::from_utf8_lossy(&bytes));

    // 3. aggregate
    let samples_read = samples.len();
    let records = aggregation::bulk(samples, now, policy);

    // 4. append to bulk
    if !records.is_empty() {
        let mut buf = String::new();
        for record in &records {
            buf.push_str(&record.to_line()?);
            buf.push('\n');
        }
        if let Some(parent) = paths.bulk.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("create {}", parent.display()))?;
        }
        daily_log::trim_torn_line(&paths.bulk).await?;
        let mut bulk = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&paths.bulk)
            .await
            .with_context(|| format!("open bulk log {}", paths.bulk.display()))?;
        bulk.write_all(buf.as_bytes())
            .await
            .with_context(|| format!("append to {}", paths.bulk.display()))?;
        bulk.sync_all()
            .await
            .with_context(|| format!("sync {}", paths.bulk.display()))?;
    }

    // 5. truncate
    OpenOptions::new()
        .write(true)
        .truncate(true)
        .open(&paths.daily)
        .await
        .with_context(|| format!("truncate {}", paths.daily.display()))?;

    let report = RolloverReport {
        samples_read,
        lines_skipped: parse.skipped,
        aggregates_written: records.len(),
    };
    info!(
        samples_read = report.samples_read,
        lines_skipped = report.lines_skipped,
        aggregates_written = report.aggregates_written,
        "rollover complete"
    );
    Ok(report)
}

/// Config for the rollover task.
#[derive(Debug, Clone)]
pub struct RolloverWorkerConfig {
    pub paths: LogPaths,
    pub schedule: cron::Schedule,
    pub day_bucketing: DayBucketing,
}

/// Spawns the rollover task. A failed pass is logged and retried at the next wakeup.
pub fn spawn(
    config: RolloverWorkerConfig,
    write_lock: Arc<Mutex<()>>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut scheduler = RolloverScheduler::new(config.schedule.clone(), Local::now());
        if let RolloverState::Idle { next_wakeup } = scheduler.state() {
            info!(next_wakeup = %next_wakeup, "rollover scheduled");
        }
        loop {
            let now = Local::now();
            if !scheduler.is_due(&now) {
                tokio::time::sleep(scheduler.delay_until_due(&now).min(MAX_SLEEP)).await;
                continue;
            }

            scheduler.begin();
            if let Err(e) = run_rollover(
                &config.paths,
                config.day_bucketing,
                Some(write_lock.clone()),
                &now,
            )
            .await
            {
                error!(
                    error = %format!("{:#}", e),
                    operation = "rollover",
                    "rollover failed; daily log kept for the next cycle"
                );
            }
            let next_wakeup = scheduler.finish(Local::now());
            info!(next_wakeup = %next_wakeup, "next rollover scheduled");
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn midnight() -> cron::Schedule {
        cron::Schedule::from_str("0 0 0 * * *").unwrap()
    }

    #[test]
    fn next_wakeup_is_after_now() {
        let now = Local::now();
        let s = RolloverScheduler::new(midnight(), now);
        match s.state() {
            RolloverState::Idle { next_wakeup } => {
                assert!(*next_wakeup > now);
                assert!(*next_wakeup - now <= chrono::Duration::hours(25));
            }
            other => panic!("unexpected state {:?}", other),
        }
        assert!(!s.is_due(&now));
    }

    #[test]
    fn state_machine_cycles() {
        let now = Local::now();
        let mut s = RolloverScheduler::new(midnight(), now);
        let later = now + chrono::Duration::days(2);
        assert!(s.is_due(&later));
        assert_eq!(s.delay_until_due(&later), Duration::ZERO);

        assert!(s.begin());
        assert_eq!(s.state(), &RolloverState::RollingOver);
        assert!(!s.begin());
        assert!(!s.is_due(&later));

        let next = s.finish(later);
        assert!(next > later);
        assert!(!s.is_due(&later));
    }
}
