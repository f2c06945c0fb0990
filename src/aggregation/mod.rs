// Grouping + aggregation: daily log samples -> bulk log aggregates.
// Pure functions; file access lives in daily_log and rollover_worker.

mod reduce;

use std::borrow::Borrow;
use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::Deserialize;
use tracing::warn;

use crate::models::{AggregateRecord, Sample, SampleKind};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AggregateError {
    #[error("cannot aggregate an empty group")]
    Empty,
    #[error("group mixes {first} and {other} samples")]
    MixedKinds { first: SampleKind, other: SampleKind },
    #[error("group mixes keys {first:?} and {other:?}")]
    MixedKeys { first: String, other: String },
}

/// How samples from earlier calendar days are bucketed during rollover.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayBucketing {
    /// One bucket per calendar day.
    #[default]
    Strict,
    /// Yesterday's samples are folded into today's bucket.
    CarryForward,
}

/// Anything that can be partitioned by type and by group key.
pub trait Grouped {
    fn kind(&self) -> SampleKind;
    fn group_key(&self) -> &str;
    fn timestamp(&self) -> f64;
}

impl Grouped for Sample {
    fn kind(&self) -> SampleKind {
        Sample::kind(self)
    }
    fn group_key(&self) -> &str {
        Sample::group_key(self)
    }
    fn timestamp(&self) -> f64 {
        Sample::timestamp(self)
    }
}

impl Grouped for AggregateRecord {
    fn kind(&self) -> SampleKind {
        AggregateRecord::kind(self)
    }
    fn group_key(&self) -> &str {
        AggregateRecord::group_key(self)
    }
    fn timestamp(&self) -> f64 {
        AggregateRecord::timestamp(self)
    }
}

impl<T: Grouped> Grouped for &T {
    fn kind(&self) -> SampleKind {
        T::kind(*self)
    }
    fn group_key(&self) -> &str {
        T::group_key(*self)
    }
    fn timestamp(&self) -> f64 {
        T::timestamp(*self)
    }
}

/// Partitions by discriminator; input order is kept within each partition.
pub fn group_by_type<T: Grouped>(
    items: impl IntoIterator<Item = T>,
) -> BTreeMap<SampleKind, Vec<T>> {
    let mut groups: BTreeMap<SampleKind, Vec<T>> = BTreeMap::new();
    for item in items {
        groups.entry(item.kind()).or_default().push(item);
    }
    groups
}

/// Partitions by group key (uuid, destination, serial; constant for CPU).
pub fn group_by_key<T: Grouped>(
    items: impl IntoIterator<Item = T>,
) -> BTreeMap<String, Vec<T>> {
    let mut groups: BTreeMap<String, Vec<T>> = BTreeMap::new();
    for item in items {
        match groups.get_mut(item.group_key()) {
            Some(group) => group.push(item),
            None => {
                groups.insert(item.group_key().to_string(), vec![item]);
            }
        }
    }
    groups
}

fn calendar_date<Tz: TimeZone>(timestamp: f64, tz: &Tz) -> Option<NaiveDate> {
    if !timestamp.is_finite() {
        return None;
    }
    let secs = timestamp.floor();
    let nanos = ((timestamp - secs) * 1e9) as u32;
    DateTime::<Utc>::from_timestamp(secs as i64, nanos)
        .map(|utc| utc.with_timezone(tz).date_naive())
}

/// Buckets by calendar-day distance from `now` (0 = today), oldest bucket first.
/// Samples dated in the future or with unusable timestamps land in today's bucket.
pub fn group_by_day<T: Grouped, Tz: TimeZone>(
    items: impl IntoIterator<Item = T>,
    now: &DateTime<Tz>,
    policy: DayBucketing,
) -> Vec<(i64, Vec<T>)> {
    let today = now.date_naive();
    let tz = now.timezone();
    let mut buckets: BTreeMap<i64, Vec<T>> = BTreeMap::new();
    for item in items {
        let mut distance = calendar_date(item.timestamp(), &tz)
            .map(|d| (today - d).num_days().max(0))
            .unwrap_or(0);
        if policy == DayBucketing::CarryForward && distance == 1 {
            distance = 0;
        }
        buckets.entry(distance).or_default().push(item);
    }
    buckets.into_iter().rev().collect()
}

/// Reduces a non-empty group of one kind and one key into its aggregate.
pub fn aggregate<S: Borrow<Sample>>(group: &[S]) -> Result<AggregateRecord, AggregateError> {
    let samples: Vec<&Sample> = group.iter().map(<S as Borrow<Sample>>::borrow).collect();
    let Some(&first) = samples.first() else {
        return Err(AggregateError::Empty);
    };
    for s in &samples {
        if s.kind() != first.kind() {
            return Err(AggregateError::MixedKinds {
                first: first.kind(),
                other: s.kind(),
            });
        }
        if s.group_key() != first.group_key() {
            return Err(AggregateError::MixedKeys {
                first: first.group_key().to_string(),
                other: s.group_key().to_string(),
            });
        }
    }

    let samples = samples.into_iter();
    let record = match first.kind() {
        SampleKind::Cpu => {
            let v: Vec<_> = samples
                .filter_map(|s| match s {
                    Sample::Cpu(c) => Some(c),
                    _ => None,
                })
                .collect();
            AggregateRecord::Cpu(reduce::aggregate_cpu(&v))
        }
        SampleKind::Gpu => {
            let v: Vec<_> = samples
                .filter_map(|s| match s {
                    Sample::Gpu(g) => Some(g),
                    _ => None,
                })
                .collect();
            AggregateRecord::Gpu(reduce::aggregate_gpu(&v))
        }
        SampleKind::Network => {
            let v: Vec<_> = samples
                .filter_map(|s| match s {
                    Sample::Network(n) => Some(n),
                    _ => None,
                })
                .collect();
            AggregateRecord::Network(reduce::aggregate_network(&v))
        }
        SampleKind::Ups => {
            let v: Vec<_> = samples
                .filter_map(|s| match s {
                    Sample::Ups(u) => Some(u),
                    _ => None,
                })
                .collect();
            AggregateRecord::Ups(reduce::aggregate_ups(&v))
        }
    };
    Ok(record)
}

/// Full rollover reduction: day -> type -> key -> aggregate.
/// Output is ordered oldest day first, then Cpu, Gpu, Network, Ups, then by key.
pub fn bulk<Tz: TimeZone>(
    samples: Vec<Sample>,
    now: &DateTime<Tz>,
    policy: DayBucketing,
) -> Vec<AggregateRecord> {
    let mut out = Vec::new();
    for (distance, day) in group_by_day(samples, now, policy) {
        for (kind, items) in group_by_type(day) {
            for (key, group) in group_by_key(items) {
                match aggregate(&group) {
                    Ok(record) => out.push(record),
                    Err(e) => warn!(
                        error = %e,
                        kind = %kind,
                        key = %key,
                        day_distance = distance,
                        "skipping group"
                    ),
                }
            }
        }
    }
    out
}
