// Domain models: one raw sample per probe reading, one aggregate per (day, type, key) group.

mod aggregation;
mod cpu;
mod float;
mod gpu;
mod network;
mod sample;
mod ups;

pub use aggregation::AggregateRecord;
pub use cpu::{CpuAggregate, CpuSample};
pub use gpu::{GpuAggregate, GpuSample};
pub use network::{NetworkAggregate, NetworkSample};
pub use sample::{CPU_GROUP_KEY, RecordError, Sample, SampleKind, UPS_GROUP_KEY};
pub use ups::{UPS_STATUS_ONLINE, UpsAggregate, UpsSample};
