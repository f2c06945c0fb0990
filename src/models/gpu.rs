// GPU models (one sample per device per poll, keyed by uuid)

use serde::{Deserialize, Serialize};

use super::float::nan_as_null;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GpuSample {
    pub timestamp: f64,
    pub name: String,
    /// Board serial as printed on the label.
    pub serial: String,
    pub uuid: String,
    #[serde(deserialize_with = "nan_as_null")]
    pub utilization_gpu: f64,
    #[serde(deserialize_with = "nan_as_null")]
    pub utilization_memory: f64,
    /// MiB
    pub memory_free: u64,
    /// MiB
    pub memory_used: u64,
    #[serde(deserialize_with = "nan_as_null")]
    pub temperature_gpu: f64,
    /// Watts
    #[serde(deserialize_with = "nan_as_null")]
    pub power_draw: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GpuAggregate {
    pub timestamp: f64,
    pub time_span: f64,
    pub name: String,
    pub serial: String,
    pub uuid: String,
    #[serde(deserialize_with = "nan_as_null")]
    pub peak_utilization_gpu: f64,
    #[serde(deserialize_with = "nan_as_null")]
    pub peak_utilization_memory: f64,
    /// Lowest free memory seen in the window.
    pub peak_memory_free: u64,
    pub peak_memory_used: u64,
    #[serde(deserialize_with = "nan_as_null")]
    pub peak_temperature_gpu: f64,
    #[serde(deserialize_with = "nan_as_null")]
    pub peak_power_draw: f64,
    #[serde(deserialize_with = "nan_as_null")]
    pub average_utilization_gpu: f64,
    #[serde(deserialize_with = "nan_as_null")]
    pub average_utilization_memory: f64,
    pub average_memory_free: f64,
    pub average_memory_used: f64,
    #[serde(deserialize_with = "nan_as_null")]
    pub average_temperature_gpu: f64,
    #[serde(deserialize_with = "nan_as_null")]
    pub average_power_draw: f64,
}
