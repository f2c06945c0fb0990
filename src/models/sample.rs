// Sample: closed set of probe readings, tagged on the wire by `type`.

use serde::{Deserialize, Serialize};

use super::{CpuSample, GpuSample, NetworkSample, UpsSample};

/// Group key for CPU samples (one logical CPU per host).
pub const CPU_GROUP_KEY: &str = "cpu";
/// Group key for UPS samples that carry no serial.
pub const UPS_GROUP_KEY: &str = "ups";

/// A line that could not be turned into a record.
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("blank line")]
    Blank,
    #[error("malformed record: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Discriminator shared by samples and their aggregates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SampleKind {
    Cpu,
    Gpu,
    Network,
    Ups,
}

impl SampleKind {
    pub const ALL: [SampleKind; 4] = [
        SampleKind::Cpu,
        SampleKind::Gpu,
        SampleKind::Network,
        SampleKind::Ups,
    ];

    /// `type` tag of raw samples in the daily log.
    pub fn sample_tag(self) -> &'static str {
        match self {
            SampleKind::Cpu => "CpuData",
            SampleKind::Gpu => "GpuData",
            SampleKind::Network => "NetworkData",
            SampleKind::Ups => "UpsData",
        }
    }

    /// `type` tag of aggregates in the bulk log.
    pub fn aggregate_tag(self) -> &'static str {
        match self {
            SampleKind::Cpu => "CpuAggregatedData",
            SampleKind::Gpu => "GpuAggregatedData",
            SampleKind::Network => "NetworkAggregatedData",
            SampleKind::Ups => "UpsAggregatedData",
        }
    }
}

impl std::fmt::Display for SampleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.sample_tag())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Sample {
    #[serde(rename = "CpuData")]
    Cpu(CpuSample),
    #[serde(rename = "GpuData")]
    Gpu(GpuSample),
    #[serde(rename = "NetworkData")]
    Network(NetworkSample),
    #[serde(rename = "UpsData")]
    Ups(UpsSample),
}

impl Sample {
    pub fn kind(&self) -> SampleKind {
        match self {
            Sample::Cpu(_) => SampleKind::Cpu,
            Sample::Gpu(_) => SampleKind::Gpu,
            Sample::Network(_) => SampleKind::Network,
            Sample::Ups(_) => SampleKind::Ups,
        }
    }

    pub fn timestamp(&self) -> f64 {
        match self {
            Sample::Cpu(s) => s.timestamp,
            Sample::Gpu(s) => s.timestamp,
            Sample::Network(s) => s.timestamp,
            Sample::Ups(s) => s.timestamp,
        }
    }

    /// Identifies the physical entity: GPU uuid, ping destination, UPS serial.
    pub fn group_key(&self) -> &str {
        match self {
            Sample::Cpu(_) => CPU_GROUP_KEY,
            Sample::Gpu(s) => &s.uuid,
            Sample::Network(s) => &s.destination,
            Sample::Ups(s) if s.serial.is_empty() => UPS_GROUP_KEY,
            Sample::Ups(s) => &s.serial,
        }
    }

    /// One log line, without the trailing newline.
    pub fn to_line(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parses one log line. Unknown `type` tags are rejected.
    pub fn from_line(line: &str) -> Result<Self, RecordError> {
        let line = line.trim();
        if line.is_empty() {
            return Err(RecordError::Blank);
        }
        Ok(serde_json::from_str(line)?)
    }
}

impl From<CpuSample> for Sample {
    fn from(s: CpuSample) -> Self {
        Sample::Cpu(s)
    }
}

impl From<GpuSample> for Sample {
    fn from(s: GpuSample) -> Self {
        Sample::Gpu(s)
    }
}

impl From<NetworkSample> for Sample {
    fn from(s: NetworkSample) -> Self {
        Sample::Network(s)
    }
}

impl From<UpsSample> for Sample {
    fn from(s: UpsSample) -> Self {
        Sample::Ups(s)
    }
}
