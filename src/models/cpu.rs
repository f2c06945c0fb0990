// CPU + system memory models

use serde::{Deserialize, Serialize};

use super::float::nan_as_null;

/// One CPU reading. Memory in MiB; temperature is NaN when no sensor reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CpuSample {
    pub timestamp: f64,
    pub utilization: f64,
    pub memory_free: f64,
    pub memory_used: f64,
    #[serde(deserialize_with = "nan_as_null")]
    pub temperature: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CpuAggregate {
    pub timestamp: f64,
    pub time_span: f64,
    pub peak_utilization: f64,
    pub peak_memory_used: f64,
    /// Lowest free memory seen in the window.
    pub peak_memory_free: f64,
    #[serde(deserialize_with = "nan_as_null")]
    pub peak_temperature: f64,
    pub average_utilization: f64,
    pub average_memory_used: f64,
    pub average_memory_free: f64,
    #[serde(deserialize_with = "nan_as_null")]
    pub average_temperature: f64,
}
