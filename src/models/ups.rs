// UPS models (apcupsd status, keyed by serial)

use serde::{Deserialize, Serialize};

use super::float::{missing_reading, nan_as_null};

/// apcupsd STATUS value for a UPS running from mains.
pub const UPS_STATUS_ONLINE: &str = "ONLINE";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpsSample {
    pub timestamp: f64,
    pub serial: String,
    pub line_voltage: f64,
    /// e.g. "ONLINE", "ON BATTERY", "BAD DATA"
    pub status: String,
    pub load_percent: f64,
    pub battery_voltage: f64,
    pub battery_percent: f64,
    pub output_current: f64,
    /// Older logs predate this field; absent reads as NaN.
    #[serde(default = "missing_reading", deserialize_with = "nan_as_null")]
    pub output_voltage: f64,
}

impl UpsSample {
    pub fn is_online(&self) -> bool {
        self.status == UPS_STATUS_ONLINE
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpsAggregate {
    pub timestamp: f64,
    pub time_span: f64,
    pub serial: String,
    /// Share of samples reporting ONLINE, 0..100.
    pub up_percentage: f64,
    pub peak_line_voltage: f64,
    pub peak_load_percent: f64,
    pub peak_battery_voltage: f64,
    pub peak_battery_percent: f64,
    pub peak_output_current: f64,
    #[serde(deserialize_with = "nan_as_null")]
    pub peak_output_voltage: f64,
    pub average_line_voltage: f64,
    pub average_load_percent: f64,
    pub average_battery_voltage: f64,
    pub average_battery_percent: f64,
    pub average_output_current: f64,
    #[serde(deserialize_with = "nan_as_null")]
    pub average_output_voltage: f64,
}
