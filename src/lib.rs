// Library for the daemon, the tail viewer and tests

pub mod aggregation;
pub mod cache;
pub mod config;
pub mod daily_log;
pub mod models;
pub mod probes;
pub mod queue;
pub mod rollover_worker;
pub mod store;
pub mod version;
pub mod worker;
