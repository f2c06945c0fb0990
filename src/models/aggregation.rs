// Aggregate record: one row per (day, type, key) group in the bulk log.
// Same wire shape as samples; `type` carries the *AggregatedData tag.

use serde::{Deserialize, Serialize};

use super::sample::{CPU_GROUP_KEY, RecordError, SampleKind, UPS_GROUP_KEY};
use super::{CpuAggregate, GpuAggregate, NetworkAggregate, UpsAggregate};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AggregateRecord {
    #[serde(rename = "CpuAggregatedData")]
    Cpu(CpuAggregate),
    #[serde(rename = "GpuAggregatedData")]
    Gpu(GpuAggregate),
    #[serde(rename = "NetworkAggregatedData")]
    Network(NetworkAggregate),
    #[serde(rename = "UpsAggregatedData")]
    Ups(UpsAggregate),
}

impl AggregateRecord {
    pub fn kind(&self) -> SampleKind {
        match self {
            AggregateRecord::Cpu(_) => SampleKind::Cpu,
            AggregateRecord::Gpu(_) => SampleKind::Gpu,
            AggregateRecord::Network(_) => SampleKind::Network,
            AggregateRecord::Ups(_) => SampleKind::Ups,
        }
    }

    /// End of the aggregated window.
    pub fn timestamp(&self) -> f64 {
        match self {
            AggregateRecord::Cpu(a) => a.timestamp,
            AggregateRecord::Gpu(a) => a.timestamp,
            AggregateRecord::Network(a) => a.timestamp,
            AggregateRecord::Ups(a) => a.timestamp,
        }
    }

    pub fn time_span(&self) -> f64 {
        match self {
            AggregateRecord::Cpu(a) => a.time_span,
            AggregateRecord::Gpu(a) => a.time_span,
            AggregateRecord::Network(a) => a.time_span,
            AggregateRecord::Ups(a) => a.time_span,
        }
    }

    pub fn group_key(&self) -> &str {
        match self {
            AggregateRecord::Cpu(_) => CPU_GROUP_KEY,
            AggregateRecord::Gpu(a) => &a.uuid,
            AggregateRecord::Network(a) => &a.destination,
            AggregateRecord::Ups(a) if a.serial.is_empty() => UPS_GROUP_KEY,
            AggregateRecord::Ups(a) => &a.serial,
        }
    }

    pub fn to_line(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_line(line: &str) -> Result<Self, RecordError> {
        let line = line.trim();
        if line.is_empty() {
            return Err(RecordError::Blank);
        }
        Ok(serde_json::from_str(line)?)
    }
}
