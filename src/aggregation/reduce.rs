// Per-type reductions: a homogeneous group of samples -> one aggregate.
// Callers (aggregation::aggregate) guarantee the group is non-empty, one kind, one key.

use crate::models::{
    CpuAggregate, CpuSample, GpuAggregate, GpuSample, NetworkAggregate, NetworkSample,
    UpsAggregate, UpsSample,
};

/// (end, span) of the window covered by `timestamps`.
fn window(timestamps: impl Iterator<Item = f64>) -> (f64, f64) {
    let (start, end) = timestamps.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), t| {
        (lo.min(t), hi.max(t))
    });
    (end, end - start)
}

/// Largest non-NaN value, NaN when there is none.
pub(super) fn peak_max(v: &[f64]) -> f64 {
    v.iter()
        .copied()
        .filter(|x| !x.is_nan())
        .reduce(f64::max)
        .unwrap_or(f64::NAN)
}

/// Smallest non-NaN value, NaN when there is none.
pub(super) fn peak_min(v: &[f64]) -> f64 {
    v.iter()
        .copied()
        .filter(|x| !x.is_nan())
        .reduce(f64::min)
        .unwrap_or(f64::NAN)
}

/// Mean over non-NaN values, NaN when there is none.
pub(super) fn mean_f64(v: &[f64]) -> f64 {
    let (sum, n) = v
        .iter()
        .filter(|x| !x.is_nan())
        .fold((0.0, 0usize), |(sum, n), x| (sum + x, n + 1));
    if n == 0 {
        return f64::NAN;
    }
    sum / (n as f64)
}

fn mean_u64(v: &[u64]) -> f64 {
    if v.is_empty() {
        return 0.0;
    }
    v.iter().map(|&x| x as f64).sum::<f64>() / (v.len() as f64)
}

pub(super) fn aggregate_cpu(samples: &[&CpuSample]) -> CpuAggregate {
    let (timestamp, time_span) = window(samples.iter().map(|s| s.timestamp));
    let utilization: Vec<f64> = samples.iter().map(|s| s.utilization).collect();
    let memory_used: Vec<f64> = samples.iter().map(|s| s.memory_used).collect();
    let memory_free: Vec<f64> = samples.iter().map(|s| s.memory_free).collect();
    let temperature: Vec<f64> = samples.iter().map(|s| s.temperature).collect();

    CpuAggregate {
        timestamp,
        time_span,
        peak_utilization: peak_max(&utilization),
        peak_memory_used: peak_max(&memory_used),
        peak_memory_free: peak_min(&memory_free),
        peak_temperature: peak_max(&temperature),
        average_utilization: mean_f64(&utilization),
        average_memory_used: mean_f64(&memory_used),
        average_memory_free: mean_f64(&memory_free),
        average_temperature: mean_f64(&temperature),
    }
}

pub(super) fn aggregate_gpu(samples: &[&GpuSample]) -> GpuAggregate {
    let first = samples[0];
    let (timestamp, time_span) = window(samples.iter().map(|s| s.timestamp));
    let utilization_gpu: Vec<f64> = samples.iter().map(|s| s.utilization_gpu).collect();
    let utilization_memory: Vec<f64> = samples.iter().map(|s| s.utilization_memory).collect();
    let memory_free: Vec<u64> = samples.iter().map(|s| s.memory_free).collect();
    let memory_used: Vec<u64> = samples.iter().map(|s| s.memory_used).collect();
    let temperature_gpu: Vec<f64> = samples.iter().map(|s| s.temperature_gpu).collect();
    let power_draw: Vec<f64> = samples.iter().map(|s| s.power_draw).collect();

    GpuAggregate {
        timestamp,
        time_span,
        name: first.name.clone(),
        serial: first.serial.clone(),
        uuid: first.uuid.clone(),
        peak_utilization_gpu: peak_max(&utilization_gpu),
        peak_utilization_memory: peak_max(&utilization_memory),
        peak_memory_free: memory_free.iter().copied().min().unwrap_or(0),
        peak_memory_used: memory_used.iter().copied().max().unwrap_or(0),
        peak_temperature_gpu: peak_max(&temperature_gpu),
        peak_power_draw: peak_max(&power_draw),
        average_utilization_gpu: mean_f64(&utilization_gpu),
        average_utilization_memory: mean_f64(&utilization_memory),
        average_memory_free: mean_u64(&memory_free),
        average_memory_used: mean_u64(&memory_used),
        average_temperature_gpu: mean_f64(&temperature_gpu),
        average_power_draw: mean_f64(&power_draw),
    }
}

pub(super) fn aggregate_network(samples: &[&NetworkSample]) -> NetworkAggregate {
    let (timestamp, time_span) = window(samples.iter().map(|s| s.timestamp));
    let pings: Vec<f64> = samples.iter().map(|s| s.ping_ms).collect();
    let num_pings = samples.len() as u64;
    let num_hits = samples.iter().filter(|s| s.is_hit()).count() as u64;
    let num_misses = num_pings - num_hits;
    // Nothing answered: report total loss rather than dividing by zero.
    let percent_packet_loss = if num_hits == 0 {
        100.0
    } else {
        num_misses as f64 / num_hits as f64 * 100.0
    };

    NetworkAggregate {
        timestamp,
        time_span,
        destination: samples[0].destination.clone(),
        peak_ping: peak_max(&pings),
        average_ping: mean_f64(&pings),
        percent_packet_loss,
        num_pings,
        num_hits,
    }
}

pub(super) fn aggregate_ups(samples: &[&UpsSample]) -> UpsAggregate {
    let (timestamp, time_span) = window(samples.iter().map(|s| s.timestamp));
    let line_voltage: Vec<f64> = samples.iter().map(|s| s.line_voltage).collect();
    let load_percent: Vec<f64> = samples.iter().map(|s| s.load_percent).collect();
    let battery_voltage: Vec<f64> = samples.iter().map(|s| s.battery_voltage).collect();
    let battery_percent: Vec<f64> = samples.iter().map(|s| s.battery_percent).collect();
    let output_current: Vec<f64> = samples.iter().map(|s| s.output_current).collect();
    let output_voltage: Vec<f64> = samples.iter().map(|s| s.output_voltage).collect();
    let online = samples.iter().filter(|s| s.is_online()).count();

    UpsAggregate {
        timestamp,
        time_span,
        serial: samples[0].serial.clone(),
        up_percentage: online as f64 / samples.len() as f64 * 100.0,
        peak_line_voltage: peak_max(&line_voltage),
        peak_load_percent: peak_max(&load_percent),
        peak_battery_voltage: peak_max(&battery_voltage),
        peak_battery_percent: peak_max(&battery_percent),
        peak_output_current: peak_max(&output_current),
        peak_output_voltage: peak_max(&output_voltage),
        average_line_voltage: mean_f64(&line_voltage),
        average_load_percent: mean_f64(&load_percent),
        average_battery_voltage: mean_f64(&battery_voltage),
        average_battery_percent: mean_f64(&battery_percent),
        average_output_current: mean_f64(&output_current),
        average_output_voltage: mean_f64(&output_voltage),
    }
}
