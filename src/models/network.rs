// Network reachability models (one sample per destination per ping)

use serde::{Deserialize, Serialize};

use super::float::nan_as_null;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkSample {
    pub timestamp: f64,
    pub destination: String,
    /// Round trip in milliseconds; NaN when the ping timed out.
    #[serde(deserialize_with = "nan_as_null")]
    pub ping_ms: f64,
}

impl NetworkSample {
    pub fn is_hit(&self) -> bool {
        !self.ping_ms.is_nan()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkAggregate {
    pub timestamp: f64,
    pub time_span: f64,
    pub destination: String,
    /// Slowest answered ping; NaN when nothing answered.
    #[serde(deserialize_with = "nan_as_null")]
    pub peak_ping: f64,
    #[serde(deserialize_with = "nan_as_null")]
    pub average_ping: f64,
    /// misses / hits * 100
    pub percent_packet_loss: f64,
    pub num_pings: u64,
    pub num_hits: u64,
}
